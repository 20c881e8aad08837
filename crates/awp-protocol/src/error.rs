//! Decode warnings for AWP reports.

use thiserror::Error;

/// A query fragment that could not be decoded.
///
/// These are never fatal: the decoder drops the offending pair and keeps
/// everything else it could recover.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid percent escape in '{segment}'")]
    InvalidEscape { segment: String },

    #[error("invalid semicolon separator in '{segment}'")]
    Semicolon { segment: String },
}
