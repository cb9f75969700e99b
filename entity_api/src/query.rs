use crate::error::Error;
use sea_orm::strum::IntoEnumIterator;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
    Value,
};
use std::collections::HashMap;

/// `QueryFilterMap` is a data structure that serves as a bridge for translating filter parameters
/// between different layers of the application. It is essentially a wrapper around a `HashMap`
/// where the keys are column names (as `String`) and the values are optional `Value` types
/// from `sea_orm`.
///
/// # Example
///
/// ```
/// use sea_orm::Value;
/// use entity_api::query::QueryFilterMap;
///
/// let mut query_filter_map = QueryFilterMap::new();
/// query_filter_map.insert("level".to_string(), Some(Value::String(Some(Box::new("ERROR".to_string())))));
/// let filter_value = query_filter_map.get("level");
/// assert!(filter_value.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct QueryFilterMap {
    map: HashMap<String, Option<Value>>,
}

impl QueryFilterMap {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        // HashMap.get returns an Option and so we need to "flatten" this to a single Option
        self.map
            .get(key)
            .and_then(|inner_option| inner_option.clone())
    }

    pub fn insert(&mut self, key: String, value: Option<Value>) {
        self.map.insert(key, value);
    }

    pub fn is_empty(&self) -> bool {
        self.map.values().all(Option::is_none)
    }
}

impl Default for QueryFilterMap {
    fn default() -> Self {
        Self::new()
    }
}

/// `IntoQueryFilterMap` is a trait that provides a method for converting a struct into a `QueryFilterMap`.
/// Implementing this trait for a struct allows you to define how the fields of the struct should be
/// mapped to column names and values.
///
/// # Example
///
/// ```
/// use entity_api::query::{IntoQueryFilterMap, QueryFilterMap};
///
/// struct LevelOnly {
///     level: String,
/// }
///
/// impl IntoQueryFilterMap for LevelOnly {
///     fn into_query_filter_map(self) -> QueryFilterMap {
///         let mut query_filter_map = QueryFilterMap::new();
///         query_filter_map.insert(
///             "level".to_string(),
///             Some(sea_orm::Value::String(Some(Box::new(self.level)))),
///         );
///         query_filter_map
///     }
/// }
/// ```
pub trait IntoQueryFilterMap {
    fn into_query_filter_map(self) -> QueryFilterMap;
}

/// Find at most `limit` records of an entity matching the given query filter map,
/// ordered by `order_column` descending (newest first).
pub async fn find_latest_by<E, C>(
    db: &DatabaseConnection,
    query_filter_map: QueryFilterMap,
    order_column: C,
    limit: u64,
) -> Result<Vec<E::Model>, Error>
where
    E: EntityTrait<Column = C>,
    C: ColumnTrait + IntoEnumIterator,
{
    let mut query = E::find();

    // We iterate through the entity's defined columns so that we only attempt
    // to filter by columns that exist.
    for column in C::iter() {
        if let Some(value) = query_filter_map.get(&column.to_string()) {
            query = query.filter(column.eq(value));
        }
    }

    Ok(query
        .order_by(order_column, Order::Desc)
        .limit(limit)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_flattens_missing_and_empty_entries() {
        let mut query_filter_map = QueryFilterMap::new();
        query_filter_map.insert("level".to_string(), None);

        assert_eq!(query_filter_map.get("level"), None);
        assert_eq!(query_filter_map.get("type"), None);
        assert!(query_filter_map.is_empty());
    }

    #[test]
    fn is_empty_is_false_once_a_value_is_present() {
        let mut query_filter_map = QueryFilterMap::new();
        query_filter_map.insert(
            "type".to_string(),
            Some(Value::String(Some(Box::new("AUTH".to_string())))),
        );

        assert!(!query_filter_map.is_empty());
        assert!(query_filter_map.get("type").is_some());
    }
}
