//! # EFChat content model
//!
//! Pure data layer of the EFChat bridge: the typed message content model,
//! the bidirectional inline markup codec, and the outbound wire frame
//! types. This crate performs no I/O; the session engine lives in
//! `efchat-client`.
//!
//! ## Overview
//!
//! - [`Segment`] / [`Message`]: typed content (text, mentions, images,
//!   voice clips) and the plain-text wire encoding used inside message
//!   bodies.
//! - [`ClientFrame`]: outbound JSON frames (`join`, `ping`, `chat`, …).
//!
//! ## Example
//!
//! ```rust,ignore
//! use efchat_model::Message;
//!
//! let msg = Message::decode("hi @alice ![image](https://example.com/cat.png)");
//! assert_eq!(msg.len(), 4);
//! ```

pub mod error;
pub mod frame;
pub mod message;
pub mod segment;

pub use error::EncodeError;
pub use frame::{CLIENT_KEY, ClientFrame};
pub use message::{Message, sanitize};
pub use segment::{
    ImageData, MentionData, OSS_BASE, Segment, TextData, VOICE_PREFIX, Voice, VoicePayload,
};
