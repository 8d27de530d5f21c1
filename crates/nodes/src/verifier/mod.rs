//! C4 — the AI Verifier: VAMN/Luca remote verification plus three local,
//! deterministic verification modes (`anomaly_detect`, `format_validate`,
//! `threshold_check`) that do not require a network round-trip.

mod client;
mod error;
mod modes;

pub use client::{AiVerifier, VerifierConfig};
pub use error::AiVerificationError;
pub use modes::{
    anomaly_detect_local, format_validate_local, threshold_check_local, AnomalyDetectConfig, ExpectedRange, ThresholdRange,
    VerificationMode, VerificationOutcome,
};
