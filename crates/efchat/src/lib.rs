//! # EFChat bridge
//!
//! A client-side protocol bridge for the EFChat real-time chat service:
//! persistent bot sessions over WebSocket, typed events in, wire frames
//! out, and a codec for the inline markup used in message bodies.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────────────────────────────┐
//! │ SessionRegistry  │────▶│ Session "Marvin@lobby" (own task)       │──▶ EventHandler
//! │                  │────▶│ Session "Eddie@bridge" (own task)       │──▶ EventHandler
//! └──────────────────┘     └─────────────────────────────────────────┘
//! ```
//!
//! - **SessionRegistry**: owns the sessions, keyed `nick@channel`
//! - **Session**: one authenticated connection; reconnects on its own
//! - **Event decoder**: frames → typed [`Event`](prelude::Event)s
//! - **Message codec**: inline markup ↔ typed content segments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use efchat::prelude::*;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl EventHandler for Echo {
//!     async fn handle_event(&self, identity: &str, event: Event) {
//!         if let Event::ChannelMessage(msg) = event {
//!             println!("[{identity}] {}: {}", msg.nick, msg.text);
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BridgeConfig::default();
//!     let registry = SessionRegistry::from_config(&config, Arc::new(Echo));
//!     registry.start(config.bots);
//!     tokio::signal::ctrl_c().await.unwrap();
//!     registry.shutdown_all().await;
//! }
//! ```

pub use efchat_client as client;
pub use efchat_model as model;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use efchat::prelude::*;
/// ```
pub mod prelude {
    // Registry and sessions - main entry points
    pub use efchat_client::{
        BotConfig, BridgeConfig, Session, SessionRegistry, SessionState,
    };

    // Event system - for writing handlers
    pub use efchat_client::{Event, EventHandler, ReplyOptions};

    // Challenge and upload seams
    pub use efchat_client::{ChallengeResolver, VoiceUploader};

    // Content model - for composing outbound messages
    pub use efchat_model::{Message, Segment};
}
