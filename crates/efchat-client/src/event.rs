//! Typed events decoded from server frames.
//!
//! Every inbound frame is a flat JSON object with a string `cmd` field.
//! [`decode_frame`] maps a parsed frame to one variant of the closed
//! [`Event`] enum, injecting the owning session's identity key and
//! defaulting the channel for frames that omit it (whispers and some
//! system frames carry none).
//!
//! Decoding never propagates an error past this boundary: a frame with an
//! unrecognized command becomes [`Event::Unknown`], a frame whose fields do
//! not fit its command shape becomes [`Decoded::Malformed`], and the
//! captcha command is routed out-of-band as [`Decoded::Challenge`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use efchat_model::Message;

// ============================================================================
// Event enum
// ============================================================================

/// A decoded server event.
///
/// One variant per server command; `Unknown` is the internal catch-all for
/// commands outside the vocabulary.
#[derive(Debug, Clone)]
pub enum Event {
    /// A user joined the channel (`onlineAdd`).
    Join(JoinEvent),
    /// A user left the channel (`onlineRemove`).
    Leave(LeaveEvent),
    /// A channel chat message (`chat`).
    ChannelMessage(ChannelMessageEvent),
    /// A private message (`whisper`, or legacy `info` with a whisper type).
    Whisper(WhisperMessageEvent),
    /// A server notice (`info`, `warn`, `shout`).
    System(SystemEvent),
    /// The full roster sent on join (`onlineSet`).
    OnlineSet(OnlineSetEvent),
    /// A raw HTML message (`html`).
    Html(HtmlMessageEvent),
    /// A user was killed or unkilled (`kill` / `unkill`).
    Kill(KillEvent),
    /// A user went away (`onafkAdd`).
    AwayAdd(AwayAddEvent),
    /// A user came back (`onafkRemove` / `onafkRemoveOnly`).
    AwayRemove(AwayRemoveEvent),
    /// A user changed nickname (`changenick`).
    NickChange(NickChangeEvent),
    /// Channel history requested with `get_old` (`list`).
    History(HistoryEvent),
    /// Password/registration notice (`onpass`).
    PassNotice(PassNoticeEvent),
    /// An invitation to another channel (`invite`).
    Invite(InviteEvent),
    /// Catch-all for unrecognized commands. Logged, never dispatched.
    Unknown(UnknownEvent),
}

impl Event {
    /// Returns the event name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Join(_) => "join",
            Event::Leave(_) => "leave",
            Event::ChannelMessage(_) => "channel_message",
            Event::Whisper(_) => "whisper_message",
            Event::System(_) => "system",
            Event::OnlineSet(_) => "online_set",
            Event::Html(_) => "html_message",
            Event::Kill(_) => "kill",
            Event::AwayAdd(_) => "away_add",
            Event::AwayRemove(_) => "away_remove",
            Event::NickChange(_) => "nick_change",
            Event::History(_) => "history",
            Event::PassNotice(_) => "pass_notice",
            Event::Invite(_) => "invite",
            Event::Unknown(_) => "unknown",
        }
    }

    /// Returns the identity key of the session that produced this event.
    pub fn self_id(&self) -> &str {
        match self {
            Event::Join(ev) => &ev.self_id,
            Event::Leave(ev) => &ev.self_id,
            Event::ChannelMessage(ev) => &ev.self_id,
            Event::Whisper(ev) => &ev.self_id,
            Event::System(ev) => &ev.self_id,
            Event::OnlineSet(ev) => &ev.self_id,
            Event::Html(ev) => &ev.self_id,
            Event::Kill(ev) => &ev.self_id,
            Event::AwayAdd(ev) => &ev.self_id,
            Event::AwayRemove(ev) => &ev.self_id,
            Event::NickChange(ev) => &ev.self_id,
            Event::History(ev) => &ev.self_id,
            Event::PassNotice(ev) => &ev.self_id,
            Event::Invite(ev) => &ev.self_id,
            Event::Unknown(ev) => &ev.self_id,
        }
    }

    fn set_self_id(&mut self, id: &str) {
        let slot = match self {
            Event::Join(ev) => &mut ev.self_id,
            Event::Leave(ev) => &mut ev.self_id,
            Event::ChannelMessage(ev) => &mut ev.self_id,
            Event::Whisper(ev) => &mut ev.self_id,
            Event::System(ev) => &mut ev.self_id,
            Event::OnlineSet(ev) => &mut ev.self_id,
            Event::Html(ev) => &mut ev.self_id,
            Event::Kill(ev) => &mut ev.self_id,
            Event::AwayAdd(ev) => &mut ev.self_id,
            Event::AwayRemove(ev) => &mut ev.self_id,
            Event::NickChange(ev) => &mut ev.self_id,
            Event::History(ev) => &mut ev.self_id,
            Event::PassNotice(ev) => &mut ev.self_id,
            Event::Invite(ev) => &mut ev.self_id,
            Event::Unknown(ev) => &mut ev.self_id,
        };
        *slot = id.to_string();
    }
}

// ============================================================================
// Event payloads
// ============================================================================

/// Kind discriminator for server notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemKind {
    /// Plain informational notice.
    #[default]
    Info,
    /// Warning notice.
    Warn,
    /// Server-wide shout.
    Shout,
}

/// A user joined the channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JoinEvent {
    pub nick: String,
    pub trip: String,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// A user left the channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeaveEvent {
    pub nick: String,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// A chat message in the session's channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelMessageEvent {
    pub nick: String,
    pub trip: String,
    pub channel: String,
    /// Raw wire body.
    pub text: String,
    /// Decoded content segments.
    #[serde(skip)]
    pub message: Message,
    /// Whether the message addresses this bot.
    #[serde(skip)]
    pub to_me: bool,
    #[serde(skip)]
    pub self_id: String,
}

/// A private message to this bot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhisperMessageEvent {
    #[serde(alias = "from")]
    pub nick: String,
    pub trip: String,
    pub channel: String,
    /// Raw wire body.
    pub text: String,
    /// Decoded content segments.
    #[serde(skip)]
    pub message: Message,
    /// Always true: whispers are directed at the bot by definition.
    #[serde(skip)]
    pub to_me: bool,
    #[serde(skip)]
    pub self_id: String,
}

/// A server notice.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SystemEvent {
    pub text: String,
    pub channel: String,
    #[serde(skip)]
    pub kind: SystemKind,
    #[serde(skip)]
    pub self_id: String,
}

/// Roster snapshot sent when joining a channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OnlineSetEvent {
    pub nicks: Vec<String>,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// A raw HTML message. The body is not run through the content codec.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HtmlMessageEvent {
    pub nick: String,
    pub text: String,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// A user was killed, or a kill was lifted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KillEvent {
    pub nick: String,
    pub channel: String,
    /// True for `unkill`.
    #[serde(skip)]
    pub lifted: bool,
    #[serde(skip)]
    pub self_id: String,
}

/// A user went away.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AwayAddEvent {
    pub nick: String,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// A user came back from away.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AwayRemoveEvent {
    pub nick: String,
    pub channel: String,
    /// True for `onafkRemoveOnly`: status cleared without announcement.
    #[serde(skip)]
    pub silent: bool,
    #[serde(skip)]
    pub self_id: String,
}

/// A user changed nickname.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NickChangeEvent {
    pub nick: String,
    #[serde(alias = "newNick")]
    pub new_nick: String,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// Channel history returned for a `get_old` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryEvent {
    /// One raw record per historic message.
    #[serde(alias = "list")]
    pub history: Vec<Value>,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// Password/registration notice.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PassNoticeEvent {
    pub text: String,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// An invitation to another channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InviteEvent {
    #[serde(alias = "from")]
    pub nick: String,
    pub channel: String,
    #[serde(skip)]
    pub self_id: String,
}

/// A frame with a command outside the known vocabulary.
#[derive(Debug, Clone, Default)]
pub struct UnknownEvent {
    /// The unrecognized command tag.
    pub cmd: String,
    /// The full raw frame.
    pub raw: Value,
    pub self_id: String,
}

// ============================================================================
// Decoder
// ============================================================================

/// Per-session context the decoder needs.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Identity key (`nick@channel`) of the owning session.
    pub self_id: &'a str,
    /// Current nickname, for self-message suppression.
    pub nick: &'a str,
    /// Current channel, used when a frame omits its channel.
    pub channel: &'a str,
    /// Whether self-originated messages are suppressed.
    pub ignore_self: bool,
}

/// Outcome of decoding one inbound frame.
#[derive(Debug)]
pub enum Decoded {
    /// A typed event to dispatch (or log-and-drop for `Unknown`).
    Event(Event),
    /// A captcha challenge; handled out-of-band, no event produced.
    Challenge {
        /// Raw text body of the challenge frame.
        text: String,
    },
    /// A self-originated message dropped by the suppression policy.
    Suppressed,
    /// The frame's fields did not fit its command shape.
    Malformed {
        /// The command tag, when present.
        cmd: String,
        /// Deserialization failure detail.
        reason: String,
    },
}

/// Decodes one parsed frame into an event outcome.
pub fn decode_frame(mut value: Value, ctx: &DecodeContext<'_>) -> Decoded {
    let Some(cmd) = value.get("cmd").and_then(Value::as_str).map(str::to_string) else {
        return Decoded::Malformed {
            cmd: String::new(),
            reason: "missing cmd field".to_string(),
        };
    };

    // The captcha sub-protocol bypasses the event table entirely.
    if cmd == "cap" {
        let text = value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Decoded::Challenge { text };
    }

    // Frames omitting the channel inherit the session's current channel.
    if matches!(value.get("channel"), None | Some(Value::Null))
        && let Some(object) = value.as_object_mut()
    {
        object.insert(
            "channel".to_string(),
            Value::String(ctx.channel.to_string()),
        );
    }

    let parsed = match cmd.as_str() {
        "onlineAdd" => parse::<JoinEvent>(&value).map(Event::Join),
        "onlineRemove" => parse::<LeaveEvent>(&value).map(Event::Leave),
        "chat" => parse::<ChannelMessageEvent>(&value).map(Event::ChannelMessage),
        // Legacy servers deliver whispers as info frames with a nested
        // type discriminator; newer ones use a dedicated command.
        "info" if value.get("type").and_then(Value::as_str) == Some("whisper") => {
            parse::<WhisperMessageEvent>(&value).map(Event::Whisper)
        }
        "whisper" => parse::<WhisperMessageEvent>(&value).map(Event::Whisper),
        "info" => parse::<SystemEvent>(&value).map(Event::System),
        "warn" => parse::<SystemEvent>(&value).map(|mut ev| {
            ev.kind = SystemKind::Warn;
            Event::System(ev)
        }),
        "shout" => parse::<SystemEvent>(&value).map(|mut ev| {
            ev.kind = SystemKind::Shout;
            Event::System(ev)
        }),
        "onlineSet" => parse::<OnlineSetEvent>(&value).map(Event::OnlineSet),
        "html" => parse::<HtmlMessageEvent>(&value).map(Event::Html),
        "kill" => parse::<KillEvent>(&value).map(Event::Kill),
        "unkill" => parse::<KillEvent>(&value).map(|mut ev| {
            ev.lifted = true;
            Event::Kill(ev)
        }),
        "onafkAdd" => parse::<AwayAddEvent>(&value).map(Event::AwayAdd),
        "onafkRemove" => parse::<AwayRemoveEvent>(&value).map(Event::AwayRemove),
        "onafkRemoveOnly" => parse::<AwayRemoveEvent>(&value).map(|mut ev| {
            ev.silent = true;
            Event::AwayRemove(ev)
        }),
        "changenick" => parse::<NickChangeEvent>(&value).map(Event::NickChange),
        "list" => parse::<HistoryEvent>(&value).map(Event::History),
        "onpass" => parse::<PassNoticeEvent>(&value).map(Event::PassNotice),
        "invite" => parse::<InviteEvent>(&value).map(Event::Invite),
        _ => Ok(Event::Unknown(UnknownEvent {
            cmd: cmd.clone(),
            raw: value.clone(),
            self_id: String::new(),
        })),
    };

    let mut event = match parsed {
        Ok(event) => event,
        Err(err) => {
            return Decoded::Malformed {
                cmd,
                reason: err.to_string(),
            };
        }
    };

    event.set_self_id(ctx.self_id);
    match &mut event {
        Event::ChannelMessage(ev) => ev.message = Message::decode(&ev.text),
        Event::Whisper(ev) => {
            ev.message = Message::decode(&ev.text);
            ev.to_me = true;
        }
        _ => {}
    }

    // Suppression is a pure policy gate, applied after construction.
    let sender = match &event {
        Event::ChannelMessage(ev) => Some(ev.nick.as_str()),
        Event::Whisper(ev) => Some(ev.nick.as_str()),
        _ => None,
    };
    if ctx.ignore_self && sender == Some(ctx.nick) {
        return Decoded::Suppressed;
    }

    Decoded::Event(event)
}

fn parse<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(value.clone())
}

// ============================================================================
// Direct-address detection
// ============================================================================

/// Marks a message event as directed at `nick`, stripping the address.
///
/// A leading mention of `nick` or a nickname prefix in the first text
/// segment is removed; whispers are always directed at the bot. Events
/// other than messages are untouched.
pub fn apply_direct_address(event: &mut Event, nick: &str) {
    match event {
        Event::ChannelMessage(ev) => {
            let mentioned = ev.message.strip_self_mention(nick);
            let named = ev.message.strip_nickname_prefix(nick);
            if mentioned || named {
                ev.to_me = true;
            }
        }
        Event::Whisper(ev) => ev.to_me = true,
        _ => {}
    }
}

// ============================================================================
// Tests
// ============================================================================
