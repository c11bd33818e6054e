//! Error types for the content codec.

use thiserror::Error;

/// Errors that can occur while encoding a message for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A voice segment still carries an unuploaded payload.
    ///
    /// Callers must resolve every voice segment before encoding.
    #[error("voice segment has not been uploaded yet")]
    UnresolvedVoice,
}
