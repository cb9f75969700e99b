pub mod prelude;

pub mod log_records;

/// A type alias that represents the store-assigned id of a log record.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = i64;
