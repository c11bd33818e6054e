//! EFChat message segment types.
//!
//! A message body on the wire is plain text with an inline markup scheme;
//! each segment type corresponds to one token grammar:
//!
//! - `text` → literal content (no markup)
//! - `mention` → `@nick`
//! - `image` → `![image](url)`
//! - `voice` → a `USERSENDVOICE_<name>` reference
//!
//! There is no escaping mechanism in the wire format: a literal `@` or
//! `![…](` inside prose is always read back as a token.
//!
//! # Example
//!
//! ```rust,ignore
//! use efchat_model::Segment;
//!
//! let text = Segment::text("Hello, ");
//! let at = Segment::mention("alice");
//! let img = Segment::image("https://example.com/cat.png");
//! ```

use std::path::PathBuf;

use crate::error::EncodeError;

/// Literal prefix identifying a voice reference token on the wire.
pub const VOICE_PREFIX: &str = "USERSENDVOICE_";

/// Base URL of the object store hosting uploaded voice clips.
pub const OSS_BASE: &str = "https://efchat.melon.fish/oss/";

// ============================================================================
// Segment Enum - The main message segment type
// ============================================================================

/// One typed unit of message content.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Plain text content.
    Text(TextData),
    /// Inline image.
    Image(ImageData),
    /// @mention of another user.
    Mention(MentionData),
    /// Voice clip reference or pending upload.
    Voice(Voice),
}

impl Segment {
    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text(TextData { text: text.into() })
    }

    /// Creates an image segment from a URL.
    pub fn image(url: impl Into<String>) -> Self {
        Segment::Image(ImageData { url: url.into() })
    }

    /// Creates an @mention segment.
    pub fn mention(target: impl Into<String>) -> Self {
        Segment::Mention(MentionData {
            target: target.into(),
        })
    }

    /// Creates a resolved voice segment from a reference name.
    ///
    /// Accepts either a bare object name or a full `USERSENDVOICE_…`
    /// reference; the stored `src` is always prefixed.
    pub fn voice_src(name: impl AsRef<str>) -> Self {
        Segment::Voice(Voice::resolved(name))
    }

    /// Creates a voice segment from a URL.
    ///
    /// URLs under the EFChat object store resolve immediately to their
    /// reference; any other URL becomes a pending upload.
    pub fn voice_url(url: impl Into<String>) -> Self {
        let url = url.into();
        match url.strip_prefix(OSS_BASE) {
            Some(name) if !name.is_empty() => Segment::Voice(Voice::resolved(name)),
            _ => Segment::Voice(Voice::Pending(VoicePayload::Url(url))),
        }
    }

    /// Creates a pending voice segment from raw audio bytes.
    pub fn voice_raw(bytes: impl Into<Vec<u8>>) -> Self {
        Segment::Voice(Voice::Pending(VoicePayload::Raw(bytes.into())))
    }

    /// Creates a pending voice segment from a local file path.
    pub fn voice_path(path: impl Into<PathBuf>) -> Self {
        Segment::Voice(Voice::Pending(VoicePayload::Path(path.into())))
    }

    /// Returns the segment type name.
    pub fn segment_type(&self) -> &'static str {
        match self {
            Segment::Text(_) => "text",
            Segment::Image(_) => "image",
            Segment::Mention(_) => "mention",
            Segment::Voice(_) => "voice",
        }
    }

    /// Returns the text content if this is a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    /// Checks whether this is a text segment.
    pub fn is_text(&self) -> bool {
        matches!(self, Segment::Text(_))
    }

    /// Renders this segment into the wire encoding.
    ///
    /// Fails only for a voice segment that has not been uploaded yet;
    /// callers must resolve pending voices before encoding.
    pub fn render_into(&self, out: &mut String) -> Result<(), EncodeError> {
        match self {
            Segment::Text(data) => out.push_str(&data.text),
            Segment::Image(data) => {
                out.push_str("![image](");
                out.push_str(&data.url);
                out.push(')');
            }
            Segment::Mention(data) => {
                out.push('@');
                out.push_str(&data.target);
            }
            Segment::Voice(voice) => match voice {
                Voice::Resolved { src } => out.push_str(src),
                Voice::Pending(_) => return Err(EncodeError::UnresolvedVoice),
            },
        }
        Ok(())
    }
}

// ============================================================================
// Segment Data Types
// ============================================================================

/// Plain text segment data.
#[derive(Debug, Clone, PartialEq)]
pub struct TextData {
    /// The text content.
    pub text: String,
}

/// Image segment data.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Image URL.
    pub url: String,
}

/// @mention segment data.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionData {
    /// Nickname of the mentioned user. May be empty.
    pub target: String,
}

/// Voice clip content.
///
/// A voice is either already hosted on the server (`Resolved`, carrying the
/// `USERSENDVOICE_…` reference) or still local to the client (`Pending`,
/// carrying the payload that must be uploaded first).
#[derive(Debug, Clone, PartialEq)]
pub enum Voice {
    /// Hosted clip, identified by its wire reference.
    Resolved {
        /// Full reference string, including [`VOICE_PREFIX`].
        src: String,
    },
    /// Not yet uploaded.
    Pending(VoicePayload),
}

impl Voice {
    /// Builds a resolved voice from a bare or prefixed reference name.
    pub fn resolved(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let name = name.strip_prefix(VOICE_PREFIX).unwrap_or(name);
        Voice::Resolved {
            src: format!("{VOICE_PREFIX}{name}"),
        }
    }

    /// Returns the wire reference if resolved.
    pub fn src(&self) -> Option<&str> {
        match self {
            Voice::Resolved { src } => Some(src),
            Voice::Pending(_) => None,
        }
    }

    /// Returns the object name (reference without prefix) if resolved.
    pub fn name(&self) -> Option<&str> {
        self.src().and_then(|src| src.strip_prefix(VOICE_PREFIX))
    }

    /// Returns the hosted URL of the clip if resolved.
    pub fn url(&self) -> Option<String> {
        self.name().map(|name| format!("{OSS_BASE}{name}"))
    }

    /// Checks whether this voice still needs an upload.
    pub fn is_pending(&self) -> bool {
        matches!(self, Voice::Pending(_))
    }
}

/// Local payload backing a voice clip before upload.
#[derive(Debug, Clone, PartialEq)]
pub enum VoicePayload {
    /// Raw audio bytes.
    Raw(Vec<u8>),
    /// Path to a local audio file.
    Path(PathBuf),
    /// Remote audio URL to fetch and re-host.
    Url(String),
}

// ============================================================================
// Tests
// ============================================================================
