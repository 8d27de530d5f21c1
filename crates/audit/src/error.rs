//! Typed error type for the audit crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink error: {0}")]
    Sink(String),

    #[error("audit backpressure: {attempts} consecutive flush failures")]
    Backpressure { attempts: u32 },
}
