pub(crate) mod health_check_controller;
pub(crate) mod log_record_controller;
