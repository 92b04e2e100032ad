use thiserror::Error;

/// Synchronous rejection of configuration or manual-count input, naming the
/// violated field. No partial mutation has happened when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

#[derive(Debug, Error, Clone)]
pub enum ServiceError {
    #[error("monitor service is no longer running")]
    Stopped,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
