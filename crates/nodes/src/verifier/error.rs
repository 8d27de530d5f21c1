//! Error type for the AI Verifier.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiVerificationError {
    #[error("verification service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("verification service returned an unexpected response: {0}")]
    Protocol(String),

    #[error("verification failed in strict mode: {mode} rejected the payload ({reason})")]
    Rejected { mode: String, reason: String },
}
