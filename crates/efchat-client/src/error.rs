//! Unified error types for the EFChat client.
//!
//! Transport failures never cross the session boundary: the session
//! recovers them internally by reconnecting. The types here exist for the
//! seams where a caller must react — sending while disconnected, a bot
//! without credentials, a failed voice upload.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed or reset mid-stream.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Frame write failed.
    #[error("failed to send frame: {0}")]
    SendFailed(String),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The bot has neither a token nor a password configured.
    #[error("no credential configured for '{identity}'")]
    MissingCredential {
        /// Identity key of the misconfigured bot.
        identity: String,
    },

    /// A session with the same identity key is already registered.
    #[error("session '{identity}' already exists")]
    DuplicateIdentity {
        /// The duplicate identity key.
        identity: String,
    },

    /// The transport is not currently open.
    ///
    /// Sends are not buffered across reconnects; callers must tolerate
    /// transient failure while the session reconnects.
    #[error("transport is not connected")]
    NotConnected,

    /// The target event is not a message and cannot be replied to.
    #[error("event cannot be replied to")]
    NotReplyable,

    /// Frame serialization failed.
    #[error("failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A message body could not be encoded.
    #[error(transparent)]
    Encode(#[from] efchat_model::EncodeError),

    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// Upload Errors
// =============================================================================

/// Errors that can occur while hosting a voice attachment.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload request failed at the network level.
    #[error("voice upload failed: {0}")]
    Network(String),

    /// The server response lacked the expected reference field.
    #[error("upload response missing 'src' reference")]
    MissingReference,

    /// The local payload could not be read.
    #[error("failed to read voice payload: {0}")]
    Payload(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
