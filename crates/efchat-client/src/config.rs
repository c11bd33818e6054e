//! Configuration surface for the bridge.
//!
//! The bridge consumes these types; loading them from a file and
//! validating the result is the host application's concern.
//!
//! # Example Configuration
//!
//! ```yaml
//! server_url: wss://efchat.melon.fish/ws
//! ignore_self: true
//! bots:
//!   - nick: Marvin
//!     channel: lobby
//!     token: ${BOT_TOKEN}
//!   - nick: Eddie
//!     channel: bridge
//!     password: hunter2
//! ```

use serde::{Deserialize, Serialize};

/// Default WebSocket endpoint of the EFChat server.
pub const DEFAULT_SERVER_URL: &str = "wss://efchat.melon.fish/ws";

/// Default avatar URL.
pub const DEFAULT_HEAD: &str = "https://efchat.melon.fish/imgs/ava.png";

/// Default channel.
pub const DEFAULT_CHANNEL: &str = "default";

/// Process-wide bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// WebSocket URL of the chat server.
    pub server_url: String,

    /// Whether to drop messages sent by the bot itself before dispatch.
    pub ignore_self: bool,

    /// One entry per bot identity.
    pub bots: Vec<BotConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ignore_self: true,
            bots: Vec::new(),
        }
    }
}

/// Configuration for a single bot identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Nickname to join with.
    pub nick: String,

    /// Channel to join.
    pub channel: String,

    /// Avatar URL sent with login and chat frames.
    pub head: String,

    /// Account password.
    pub password: Option<String>,

    /// Account token. Takes precedence over `password` when both are set.
    pub token: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nick: "EFChatBot".to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            head: DEFAULT_HEAD.to_string(),
            password: None,
            token: None,
        }
    }
}

impl BotConfig {
    /// Resolves the credential for this bot.
    ///
    /// A token wins over a password when both are configured; `None` means
    /// the bot cannot authenticate and must not start.
    pub fn credential(&self) -> Option<Credential> {
        if let Some(token) = &self.token {
            return Some(Credential::Token(token.clone()));
        }
        self.password
            .as_ref()
            .map(|password| Credential::Password(password.clone()))
    }
}

/// An authentication credential; exactly one is used per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Account token.
    Token(String),
    /// Account password.
    Password(String),
}
