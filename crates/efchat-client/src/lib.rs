//! EFChat session engine - lifecycle and protocol translation.
//!
//! This crate provides:
//! - Session lifecycle management ([`Session`], [`SessionRegistry`])
//! - Frame-to-event decoding ([`decode_frame`], [`Event`])
//! - The captcha challenge sub-protocol ([`ChallengeResolver`])
//! - Transport abstraction with a WebSocket implementation ([`WsConnector`])
//! - Voice attachment hosting ([`VoiceUploader`])
//!
//! # Sessions
//!
//! Each configured bot identity gets one [`Session`] running its own
//! connect → authenticate → receive loop. Sessions are fully independent:
//! a transport failure in one reconnects that session after a fixed
//! backoff and never affects another. The [`SessionRegistry`] owns the set
//! of active sessions keyed by `nick@channel` and re-keys entries in place
//! when a session renames.
//!
//! ```ignore
//! use std::sync::Arc;
//! use efchat_client::{BridgeConfig, SessionRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     efchat_client::logging::init("info");
//!
//!     let config: BridgeConfig = load_config();
//!     let registry = SessionRegistry::from_config(&config, Arc::new(MyHandler));
//!     registry.start(config.bots);
//!
//!     tokio::signal::ctrl_c().await.unwrap();
//!     registry.shutdown_all().await;
//! }
//! ```
//!
//! # Event flow
//!
//! Inbound frames are parsed as JSON, decoded into typed [`Event`]s
//! (message bodies run through the `efchat-model` content codec), filtered
//! by the self-message suppression policy, and handed to the registered
//! [`EventHandler`]. Outbound intents go the other way through
//! [`Session::send`] and the higher-level chat/whisper/reply helpers.

pub mod challenge;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod registry;
pub mod session;
pub mod transport;
pub mod upload;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports
pub use challenge::{CHALLENGE_TIMEOUT, ChallengeResolver, StdinResolver};
pub use config::{BotConfig, BridgeConfig, Credential, DEFAULT_SERVER_URL};
pub use error::{SessionError, SessionResult, TransportError, TransportResult, UploadError};
pub use event::{Decoded, DecodeContext, Event, decode_frame};
pub use registry::SessionRegistry;
pub use session::{
    EventHandler, HEARTBEAT_INTERVAL, Identity, RECONNECT_DELAY, ReplyOptions, Session,
    SessionState,
};
pub use transport::{Connector, FrameSink, FrameStream, WsConnector};
pub use upload::{UPLOAD_URL, VoiceUploader};
