//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field holds the original error that caused
/// the domain error. Ex. `domain` is dependent on `entity_api`, and `web` is dependent on `domain`,
/// but `web` should not be dependent, directly, on `entity_api`. Ultimately the various
/// `error_kind`s are used by `web` to return appropriate HTTP status codes to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
}

/// Entity errors bubbling up from `entity_api` and `entity`, reduced to the
/// subset of kinds the `domain` layer cares about.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid(String),
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The log store could not be reached
    Network,
}

impl Error {
    /// A request that failed validation before reaching the store.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::Invalid(reason.into()),
            )),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

fn entity_error(entity_error_kind: EntityErrorKind) -> DomainErrorKind {
    DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind))
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let error_kind = match err.error_kind {
            EntityApiErrorKind::SystemError => {
                DomainErrorKind::External(ExternalErrorKind::Network)
            }
            EntityApiErrorKind::RecordNotFound => entity_error(EntityErrorKind::NotFound),
            EntityApiErrorKind::InvalidQueryTerm => {
                entity_error(EntityErrorKind::Invalid(err.to_string()))
            }
            EntityApiErrorKind::Other => entity_error(EntityErrorKind::Other(err.to_string())),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_translates_to_entity_not_found() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
        .into();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
        );
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn unreachable_store_translates_to_network_error() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::SystemError,
        }
        .into();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Network)
        );
    }

    #[test]
    fn invalid_constructor_carries_the_reason() {
        let err = Error::invalid("level must not be empty");

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid(
                "level must not be empty".to_string()
            )))
        );
    }
}
