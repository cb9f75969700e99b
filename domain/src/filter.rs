//! Exact-match predicate on a record's level and category.

use crate::{IntoQueryFilterMap, QueryFilterMap, Record};
use sea_orm::Value;
use std::fmt;

/// An absent field matches every record. Empty strings are treated as absent,
/// so query strings like `?level=&type=AUTH` behave as expected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    level: Option<String>,
    category: Option<String>,
}

impl Filter {
    pub fn new(level: Option<String>, category: Option<String>) -> Self {
        Self {
            level: level.filter(|l| !l.is_empty()),
            category: category.filter(|c| !c.is_empty()),
        }
    }

    /// The identity filter.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.category.is_none()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.level.as_deref().map_or(true, |l| l == record.level)
            && self
                .category
                .as_deref()
                .map_or(true, |c| c == record.category)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "level={}, type={}",
            self.level().unwrap_or("*"),
            self.category().unwrap_or("*")
        )
    }
}

impl IntoQueryFilterMap for &Filter {
    fn into_query_filter_map(self) -> QueryFilterMap {
        let mut query_filter_map = QueryFilterMap::new();
        query_filter_map.insert(
            "level".to_string(),
            self.level
                .clone()
                .map(|level| Value::String(Some(Box::new(level)))),
        );
        query_filter_map.insert(
            "type".to_string(),
            self.category
                .clone()
                .map(|category| Value::String(Some(Box::new(category)))),
        );

        query_filter_map
    }
}
