//! EFChat message type and the inline markup codec.
//!
//! A [`Message`] is an ordered sequence of [`Segment`]s. On the wire a
//! message body is plain text; [`Message::encode`] concatenates segment
//! renderings and [`Message::decode`] recovers segments with a single
//! left-to-right scan.
//!
//! # Decoding
//!
//! At each scan position the first matching token wins, in this order:
//!
//! 1. image token `![alt](url)`, consumed through the closing parenthesis
//! 2. voice reference, recognized by the `USERSENDVOICE_` prefix, consumed
//!    up to the next whitespace
//! 3. `@` mention, consumed up to the next whitespace (target may be empty)
//! 4. otherwise a text run, up to the next position where one of the above
//!    matches
//!
//! The grammar has no escaping: a literal `@` in prose always reads back as
//! a mention token.
//!
//! # Example
//!
//! ```rust,ignore
//! use efchat_model::Message;
//!
//! let msg = Message::new()
//!     .text("ping ")
//!     .mention("alice")
//!     .text(" see ")
//!     .image("https://example.com/cat.png");
//! let wire = msg.encode().unwrap();
//! assert_eq!(Message::decode(&wire), msg);
//! ```

use crate::error::EncodeError;
use crate::segment::{Segment, VOICE_PREFIX};

// ============================================================================
// Message - ordered segment sequence
// ============================================================================

/// A message composed of typed content segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    segments: Vec<Segment>,
}

// ============================================================================
// Constructors and Builders
// ============================================================================

impl Message {
    /// Creates a new empty message.
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Creates a message from a vector of segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Creates a message containing only plain text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::text(text)],
        }
    }

    /// Adds a text segment.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::text(text));
        self
    }

    /// Adds an @mention segment.
    pub fn mention(mut self, target: impl Into<String>) -> Self {
        self.segments.push(Segment::mention(target));
        self
    }

    /// Adds an image segment.
    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.segments.push(Segment::image(url));
        self
    }

    /// Adds a resolved voice segment.
    pub fn voice_src(mut self, name: impl AsRef<str>) -> Self {
        self.segments.push(Segment::voice_src(name));
        self
    }

    /// Adds a raw segment.
    pub fn segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Adds a segment (mutable).
    pub fn push(&mut self, segment: Segment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    /// Extends with multiple segments (mutable).
    pub fn extend(&mut self, segments: impl IntoIterator<Item = Segment>) -> &mut Self {
        self.segments.extend(segments);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Message {
    /// Returns the segments as a slice.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the segments as a mutable vector.
    pub fn segments_mut(&mut self) -> &mut Vec<Segment> {
        &mut self.segments
    }

    /// Converts the message into its segments.
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Checks whether the message has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenates the content of all text segments.
    pub fn extract_plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(Segment::as_text)
            .collect()
    }
}

// ============================================================================
// Codec
// ============================================================================

impl Message {
    /// Encodes the message into its wire text form.
    ///
    /// Total except for pending voice segments, which must be uploaded and
    /// resolved first.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let mut out = String::new();
        for segment in &self.segments {
            segment.render_into(&mut out)?;
        }
        Ok(out)
    }

    /// Decodes wire text into a message. Never fails.
    pub fn decode(input: &str) -> Self {
        let mut segments = Vec::new();
        let mut i = 0;

        while i < input.len() {
            if let Some((segment, next)) = token_at(input, i) {
                segments.push(segment);
                i = next;
                continue;
            }

            // Text run: everything up to the next position where a token
            // matches, or end of input.
            let mut j = advance(input, i);
            while j < input.len() && token_at(input, j).is_none() {
                j = advance(input, j);
            }
            segments.push(Segment::text(&input[i..j]));
            i = j;
        }

        Self { segments }
    }

    /// Merges consecutive text segments in place. Idempotent.
    pub fn reduce(&mut self) {
        let mut index = 1;
        while index < self.segments.len() {
            if self.segments[index - 1].is_text() && self.segments[index].is_text() {
                let Segment::Text(tail) = self.segments.remove(index) else {
                    unreachable!()
                };
                let Segment::Text(head) = &mut self.segments[index - 1] else {
                    unreachable!()
                };
                head.text.push_str(&tail.text);
            } else {
                index += 1;
            }
        }
    }
}

/// Advances `i` past one character.
fn advance(input: &str, i: usize) -> usize {
    i + input[i..].chars().next().map_or(1, char::len_utf8)
}

/// Tries to read a markup token at byte offset `i`.
///
/// Returns the decoded segment and the offset just past it. Priority order
/// is image, voice, mention; plain text is handled by the caller.
fn token_at(input: &str, i: usize) -> Option<(Segment, usize)> {
    let rest = &input[i..];

    if rest.starts_with("![") {
        if let Some(alt_end) = rest.find("](") {
            let url_start = alt_end + 2;
            if let Some(url_len) = rest[url_start..].find(')') {
                let url = &rest[url_start..url_start + url_len];
                return Some((Segment::image(url), i + url_start + url_len + 1));
            }
        }
    }

    if rest.starts_with(VOICE_PREFIX) {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        return Some((Segment::voice_src(&rest[..end]), i + end));
    }

    if rest.starts_with('@') {
        let end = rest[1..]
            .find(char::is_whitespace)
            .map_or(rest.len(), |pos| pos + 1);
        return Some((Segment::mention(&rest[1..end]), i + end));
    }

    None
}

// ============================================================================
// Self-reference stripping
// ============================================================================

impl Message {
    /// Removes a leading mention of `nick` (case-sensitive exact match).
    ///
    /// When the mention is removed, a following text segment is left-trimmed
    /// and dropped entirely if it becomes empty. Returns whether the message
    /// addressed `nick`.
    pub fn strip_self_mention(&mut self, nick: &str) -> bool {
        match self.segments.first() {
            Some(Segment::Mention(data)) if data.target == nick => {}
            _ => return false,
        }
        self.segments.remove(0);

        let mut drop_first = false;
        if let Some(Segment::Text(data)) = self.segments.first_mut() {
            let trimmed = data.text.trim_start().to_string();
            if trimmed.is_empty() {
                drop_first = true;
            } else {
                data.text = trimmed;
            }
        }
        if drop_first {
            self.segments.remove(0);
        }
        true
    }

    /// Strips a leading `nick` prefix from the first text segment.
    ///
    /// The match is case-insensitive and requires the nickname to be
    /// followed by whitespace, a comma, or the end of the text. The
    /// remainder is left-trimmed of whitespace and commas; an emptied
    /// segment is dropped. Returns whether the message addressed `nick`.
    pub fn strip_nickname_prefix(&mut self, nick: &str) -> bool {
        if nick.is_empty() {
            return false;
        }

        let mut drop_first = false;
        {
            let Some(Segment::Text(data)) = self.segments.first_mut() else {
                return false;
            };
            let Some(head) = data.text.get(..nick.len()) else {
                return false;
            };
            if !head.eq_ignore_ascii_case(nick) {
                return false;
            }
            let rest = &data.text[nick.len()..];
            if !(rest.is_empty() || rest.starts_with(is_address_delimiter)) {
                return false;
            }
            let remainder = rest.trim_start_matches(is_address_delimiter).to_string();
            if remainder.is_empty() {
                drop_first = true;
            } else {
                data.text = remainder;
            }
        }
        if drop_first {
            self.segments.remove(0);
        }
        true
    }
}

fn is_address_delimiter(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == '，'
}

/// Escapes `<` and `>` to HTML entities for outbound text.
pub fn sanitize(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

// ============================================================================
// From implementations
// ============================================================================

impl From<Segment> for Message {
    fn from(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl From<Vec<Segment>> for Message {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::from_text(text)
    }
}

impl FromIterator<Segment> for Message {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Message {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
