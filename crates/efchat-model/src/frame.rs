//! Outbound wire frame types.
//!
//! Every frame exchanged with the EFChat server is a flat JSON object with
//! a string `cmd` field. Outbound frames are modelled as a tagged enum so
//! that serialization produces the command field automatically:
//!
//! ```rust,ignore
//! use efchat_model::ClientFrame;
//!
//! let frame = ClientFrame::Ping;
//! assert_eq!(serde_json::to_string(&frame).unwrap(), r#"{"cmd":"ping"}"#);
//! ```

use serde::Serialize;

/// Client identification sent with every login frame.
pub const CLIENT_KEY: &str = "EFChat_Bot";

/// An outbound frame, tagged by its `cmd` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Login handshake. Exactly one of `password`/`token` is present.
    Join {
        nick: String,
        head: String,
        channel: String,
        client_key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    /// Keep-alive.
    Ping,
    /// Channel chat message.
    Chat {
        text: String,
        /// `"1"` to display, `"0"` to hide from the room history.
        show: String,
        head: String,
    },
    /// Private message to one user.
    Whisper { nick: String, text: String },
    /// Move to another channel.
    Move { channel: String },
    /// Change nickname.
    #[serde(rename = "changenick")]
    ChangeNick { nick: String },
    /// Request `num` entries of channel history.
    #[serde(rename = "get_old")]
    GetOld { num: u32 },
}

impl ClientFrame {
    /// Builds a chat frame.
    pub fn chat(text: impl Into<String>, show: bool, head: impl Into<String>) -> Self {
        ClientFrame::Chat {
            text: text.into(),
            show: if show { "1" } else { "0" }.to_string(),
            head: head.into(),
        }
    }

    /// Builds a whisper frame.
    pub fn whisper(nick: impl Into<String>, text: impl Into<String>) -> Self {
        ClientFrame::Whisper {
            nick: nick.into(),
            text: text.into(),
        }
    }

    /// Returns the command tag of this frame.
    pub fn cmd(&self) -> &'static str {
        match self {
            ClientFrame::Join { .. } => "join",
            ClientFrame::Ping => "ping",
            ClientFrame::Chat { .. } => "chat",
            ClientFrame::Whisper { .. } => "whisper",
            ClientFrame::Move { .. } => "move",
            ClientFrame::ChangeNick { .. } => "changenick",
            ClientFrame::GetOld { .. } => "get_old",
        }
    }
}
