pub use super::log_records::Entity as LogRecords;
