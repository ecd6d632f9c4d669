pub mod audit;

// Re-export use cases
pub use audit::AuditHandler;
