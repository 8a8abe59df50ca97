pub mod cors;
pub mod panic;
pub mod request_log;
