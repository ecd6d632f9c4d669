pub mod chain;
pub mod encoding;
pub mod interceptor;
pub mod ports;
pub mod transaction;
pub mod use_cases;
