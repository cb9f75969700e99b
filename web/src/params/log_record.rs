use domain::log_record::NewRecord;
use domain::{Filter, Id};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters shared by the snapshot and stream endpoints. Absent or empty
/// values match every record.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct IndexParams {
    /// Only records with exactly this level, e.g. `ERROR`
    pub(crate) level: Option<String>,
    /// Only records with exactly this type, e.g. `DATABASE`
    #[serde(rename = "type")]
    pub(crate) category: Option<String>,
}

impl IndexParams {
    pub(crate) fn into_filter(self) -> Filter {
        Filter::new(self.level, self.category)
    }
}

/// Request body for appending a log record.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct CreateParams {
    #[schema(example = "ERROR")]
    pub(crate) level: String,
    #[serde(rename = "type")]
    #[schema(example = "DATABASE")]
    pub(crate) category: String,
    #[schema(example = "Connection failed")]
    pub(crate) message: String,
}

impl From<CreateParams> for NewRecord {
    fn from(params: CreateParams) -> Self {
        NewRecord {
            level: params.level,
            category: params.category,
            message: params.message,
        }
    }
}

/// Response body for a newly appended record.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CreatedResponse {
    pub(crate) id: Id,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_query_parameter_maps_to_category() {
        let params: IndexParams =
            serde_json::from_value(serde_json::json!({"level": "ERROR", "type": "API"})).unwrap();

        let filter = params.into_filter();
        assert_eq!(filter.level(), Some("ERROR"));
        assert_eq!(filter.category(), Some("API"));
    }

    #[test]
    fn empty_query_parameters_match_everything() {
        let params: IndexParams =
            serde_json::from_value(serde_json::json!({"level": "", "type": ""})).unwrap();

        assert!(params.into_filter().is_empty());
        assert!(IndexParams::default().into_filter().is_empty());
    }
}
