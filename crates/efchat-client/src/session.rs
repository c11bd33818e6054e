//! One authenticated connection for one bot identity.
//!
//! A [`Session`] owns the connect → authenticate → receive loop state
//! machine for a single `nick@channel` identity. Transport failures never
//! escape it: the loop tears the connection down, waits a fixed backoff
//! and retries the whole handshake until the session is shut down. Each
//! connection epoch spawns its own heartbeat task, cancelled strictly
//! before the transport is torn down so a stale heartbeat can never write
//! to a superseded connection.
//!
//! ```text
//! Disconnected → Connecting → Authenticating → Active
//!                    ▲                           │ transport failure
//!                    └──────── Reconnecting ◀────┘
//!                          (ShuttingDown is terminal)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use efchat_model::{CLIENT_KEY, ClientFrame, Message, Segment, sanitize};

use crate::challenge::{self, ChallengeResolver};
use crate::config::{BotConfig, Credential};
use crate::error::{SessionError, SessionResult};
use crate::event::{Decoded, DecodeContext, Event, apply_direct_address, decode_frame};
use crate::transport::{Connector, FrameSink, FrameStream};

/// Interval between keep-alive pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Fixed backoff between reconnection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

// =============================================================================
// Identity
// =============================================================================

/// The `(nick, channel)` pair identifying a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Current nickname.
    pub nick: String,
    /// Current channel.
    pub channel: String,
}

impl Identity {
    /// Returns the registry key, `nick@channel`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.nick, self.channel)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.nick, self.channel)
    }
}

// =============================================================================
// Session state
// =============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, run loop not started yet.
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Transport open, login frame not confirmed sent yet.
    Authenticating,
    /// Login sent; receiving frames.
    Active,
    /// Transport lost; waiting out the backoff before retrying.
    Reconnecting,
    /// Externally cancelled. Terminal.
    ShuttingDown,
}

// =============================================================================
// Event handler seam
// =============================================================================

/// Host callback consuming decoded events.
///
/// The bridge calls this once per non-suppressed event and does not care
/// how the host dispatches it further.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one decoded event for the session identified by `identity`.
    async fn handle_event(&self, identity: &str, event: Event);
}

type RenameHook = Box<dyn Fn(&str, &str) + Send + Sync>;

// =============================================================================
// Session
// =============================================================================

/// One authenticated logical connection for one bot identity.
pub struct Session {
    identity: RwLock<Identity>,
    credential: Credential,
    head: String,
    server_url: String,
    ignore_self: bool,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn EventHandler>,
    resolver: Arc<dyn ChallengeResolver>,
    /// Write half of the current connection epoch, if any. The lock also
    /// serializes frame writes between the session and its heartbeat.
    sink: Mutex<Option<Box<dyn FrameSink>>>,
    state_tx: watch::Sender<SessionState>,
    cancel: CancellationToken,
    rename_hook: RwLock<Option<RenameHook>>,
}

impl Session {
    /// Creates a session for one bot identity.
    ///
    /// Fails with [`SessionError::MissingCredential`] when the bot has
    /// neither a token nor a password; a session never sends a malformed
    /// login frame.
    pub fn new(
        bot: BotConfig,
        server_url: impl Into<String>,
        ignore_self: bool,
        connector: Arc<dyn Connector>,
        handler: Arc<dyn EventHandler>,
        resolver: Arc<dyn ChallengeResolver>,
    ) -> SessionResult<Arc<Self>> {
        let identity = Identity {
            nick: bot.nick.clone(),
            channel: bot.channel.clone(),
        };
        let credential = bot
            .credential()
            .ok_or_else(|| SessionError::MissingCredential {
                identity: identity.key(),
            })?;
        let (state_tx, _) = watch::channel(SessionState::Disconnected);

        Ok(Arc::new(Self {
            identity: RwLock::new(identity),
            credential,
            head: bot.head,
            server_url: server_url.into(),
            ignore_self,
            connector,
            handler,
            resolver,
            sink: Mutex::new(None),
            state_tx,
            cancel: CancellationToken::new(),
            rename_hook: RwLock::new(None),
        }))
    }

    /// Returns the current identity key, `nick@channel`.
    pub fn key(&self) -> String {
        self.identity.read().key()
    }

    /// Returns the current nickname.
    pub fn nick(&self) -> String {
        self.identity.read().nick.clone()
    }

    /// Returns the current channel.
    pub fn channel(&self) -> String {
        self.identity.read().channel.clone()
    }

    /// Returns the avatar URL.
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Returns the challenge resolver.
    pub(crate) fn resolver(&self) -> &Arc<dyn ChallengeResolver> {
        &self.resolver
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Returns a watcher over lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: SessionState) {
        // ShuttingDown is terminal: once cancelled, no other state wins.
        if self.cancel.is_cancelled() && state != SessionState::ShuttingDown {
            return;
        }
        self.state_tx.send_replace(state);
    }

    // -------------------------------------------------------------------------
    // Run loop
    // -------------------------------------------------------------------------

    /// Runs the session until it is shut down.
    ///
    /// Any transport-level failure tears the connection down and retries
    /// the whole connect/login sequence after [`RECONNECT_DELAY`].
    /// Malformed individual frames are logged and skipped without
    /// touching the connection.
    pub async fn run(self: Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            self.set_state(SessionState::Connecting);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.connector.connect(&self.server_url) => result,
            };

            match connected {
                Ok((sink, stream)) => {
                    self.set_state(SessionState::Authenticating);
                    *self.sink.lock().await = Some(sink);

                    match self.send(&self.login_frame()).await {
                        Ok(()) => {
                            self.set_state(SessionState::Active);
                            info!(bot_id = %self.key(), "session active");

                            let heartbeat = Self::spawn_heartbeat(&self);
                            let end = Self::receive_loop(&self, stream).await;
                            // Heartbeat first, then transport: a stale tick
                            // must never write to a superseded connection.
                            heartbeat.stop().await;
                            self.close_transport().await;

                            match end {
                                LoopEnd::Cancelled => break,
                                LoopEnd::Closed(reason) => {
                                    warn!(bot_id = %self.key(), %reason, "connection lost");
                                }
                            }
                        }
                        Err(err) => {
                            warn!(bot_id = %self.key(), error = %err, "login failed");
                            self.close_transport().await;
                        }
                    }
                }
                Err(err) => {
                    warn!(bot_id = %self.key(), error = %err, "connect failed");
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            self.set_state(SessionState::Reconnecting);
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }

        self.close_transport().await;
        self.set_state(SessionState::ShuttingDown);
        debug!(bot_id = %self.key(), "run loop finished");
    }

    fn login_frame(&self) -> ClientFrame {
        let identity = self.identity.read();
        let (password, token) = match &self.credential {
            Credential::Token(token) => (None, Some(token.clone())),
            Credential::Password(password) => (Some(password.clone()), None),
        };
        ClientFrame::Join {
            nick: identity.nick.clone(),
            head: self.head.clone(),
            channel: identity.channel.clone(),
            client_key: CLIENT_KEY.to_string(),
            password,
            token,
        }
    }

    async fn receive_loop(session: &Arc<Self>, mut stream: Box<dyn FrameStream>) -> LoopEnd {
        loop {
            let frame = tokio::select! {
                _ = session.cancel.cancelled() => return LoopEnd::Cancelled,
                frame = stream.next_frame() => frame,
            };
            match frame {
                Some(Ok(text)) => Self::handle_frame(session, &text).await,
                Some(Err(err)) => return LoopEnd::Closed(err.to_string()),
                None => return LoopEnd::Closed("stream ended".to_string()),
            }
        }
    }

    async fn handle_frame(session: &Arc<Self>, text: &str) {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                warn!(bot_id = %session.key(), error = %err, "malformed frame skipped");
                return;
            }
        };

        let (self_id, nick, channel) = {
            let identity = session.identity.read();
            (identity.key(), identity.nick.clone(), identity.channel.clone())
        };
        let ctx = DecodeContext {
            self_id: &self_id,
            nick: &nick,
            channel: &channel,
            ignore_self: session.ignore_self,
        };

        match decode_frame(value, &ctx) {
            Decoded::Event(Event::Unknown(event)) => {
                warn!(bot_id = %self_id, cmd = %event.cmd, "unknown command");
            }
            Decoded::Event(mut event) => {
                apply_direct_address(&mut event, &nick);
                trace!(bot_id = %self_id, event = %event.name(), "dispatching event");
                session.handler.handle_event(&self_id, event).await;
            }
            Decoded::Challenge { text } => {
                tokio::spawn(challenge::run_challenge(Arc::clone(session), text));
            }
            Decoded::Suppressed => {
                trace!(bot_id = %self_id, "self message suppressed");
            }
            Decoded::Malformed { cmd, reason } => {
                warn!(bot_id = %self_id, %cmd, %reason, "frame skipped");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Heartbeat
    // -------------------------------------------------------------------------

    fn spawn_heartbeat(session: &Arc<Self>) -> HeartbeatHandle {
        let token = CancellationToken::new();
        let hb_token = token.clone();
        let session = Arc::clone(session);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = hb_token.cancelled() => break,
                    _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                        if let Err(err) = session.send(&ClientFrame::Ping).await {
                            warn!(bot_id = %session.key(), error = %err, "heartbeat failed");
                            break;
                        }
                        trace!(bot_id = %session.key(), "heartbeat sent");
                    }
                }
            }
        });
        HeartbeatHandle { token, task }
    }

    // -------------------------------------------------------------------------
    // Outbound operations
    // -------------------------------------------------------------------------

    /// Serializes one frame and writes it to the transport.
    ///
    /// Fails with [`SessionError::NotConnected`] while the transport is
    /// closed; nothing is buffered across reconnects.
    pub async fn send(&self, frame: &ClientFrame) -> SessionResult<()> {
        let text = serde_json::to_string(frame)?;
        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => {
                sink.send(&text).await?;
                Ok(())
            }
            None => Err(SessionError::NotConnected),
        }
    }

    /// Sends a chat message to the session's channel.
    pub async fn send_chat(&self, message: &Message, show: bool) -> SessionResult<()> {
        let text = sanitize(&message.encode()?);
        self.send(&ClientFrame::chat(text, show, self.head.clone()))
            .await
    }

    /// Sends a private message to `nick`.
    pub async fn send_whisper(&self, nick: &str, message: &Message) -> SessionResult<()> {
        let text = sanitize(&message.encode()?);
        self.send(&ClientFrame::whisper(nick, text)).await
    }

    /// Replies to a message event, routing by its type: chat messages get
    /// a channel reply, whispers get a whisper back.
    pub async fn reply(
        &self,
        event: &Event,
        message: &Message,
        options: ReplyOptions,
    ) -> SessionResult<()> {
        match event {
            Event::ChannelMessage(ev) => {
                let full = compose_reply(&ev.nick, &ev.trip, &ev.text, message, &options);
                self.send_chat(&full, true).await
            }
            Event::Whisper(ev) => {
                let full = compose_reply(&ev.nick, &ev.trip, &ev.text, message, &options);
                self.send_whisper(&ev.nick, &full).await
            }
            _ => Err(SessionError::NotReplyable),
        }
    }

    /// Moves to another channel and re-keys the registry entry.
    pub async fn move_channel(&self, channel: impl Into<String>) -> SessionResult<()> {
        let channel = channel.into();
        self.send(&ClientFrame::Move {
            channel: channel.clone(),
        })
        .await?;
        let mut identity = self.identity.read().clone();
        identity.channel = channel;
        self.rename(identity);
        Ok(())
    }

    /// Changes nickname and re-keys the registry entry.
    pub async fn change_nick(&self, nick: impl Into<String>) -> SessionResult<()> {
        let nick = nick.into();
        self.send(&ClientFrame::ChangeNick { nick: nick.clone() })
            .await?;
        let mut identity = self.identity.read().clone();
        identity.nick = nick;
        self.rename(identity);
        Ok(())
    }

    /// Requests `num` entries of channel history.
    pub async fn fetch_history(&self, num: u32) -> SessionResult<()> {
        self.send(&ClientFrame::GetOld { num }).await
    }

    // -------------------------------------------------------------------------
    // Identity and lifecycle
    // -------------------------------------------------------------------------

    /// Updates the identity and notifies the registry re-key hook.
    ///
    /// Sends no wire frame; callers issue the `move`/`changenick` frames
    /// themselves (or use [`Session::move_channel`] /
    /// [`Session::change_nick`], which do both).
    pub fn rename(&self, new_identity: Identity) {
        let old_key = self.identity.read().key();
        let new_key = new_identity.key();
        *self.identity.write() = new_identity;
        if old_key != new_key {
            if let Some(hook) = self.rename_hook.read().as_ref() {
                hook(&old_key, &new_key);
            }
            info!(old = %old_key, new = %new_key, "session renamed");
        }
    }

    /// Installs the registry re-key hook. One hook at a time.
    pub fn set_rename_hook(&self, hook: impl Fn(&str, &str) + Send + Sync + 'static) {
        *self.rename_hook.write() = Some(Box::new(hook));
    }

    /// Shuts the session down. Idempotent.
    ///
    /// Cancels the run loop and its heartbeat; the run loop closes the
    /// transport before returning. The session does not restart.
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!(bot_id = %self.key(), "shutting down session");
        self.cancel.cancel();
        self.state_tx.send_replace(SessionState::ShuttingDown);
    }

    async fn close_transport(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            sink.close().await;
        }
    }
}

enum LoopEnd {
    Cancelled,
    Closed(String),
}

struct HeartbeatHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Cancels the heartbeat and waits for it to finish.
    async fn stop(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

/// Options for [`Session::reply`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyOptions {
    /// Prefix the reply with `@sender `.
    pub at_sender: bool,
    /// Quote the original message above the reply.
    pub quote: bool,
}

fn compose_reply(
    nick: &str,
    trip: &str,
    original_text: &str,
    message: &Message,
    options: &ReplyOptions,
) -> Message {
    let mut full = Message::new();
    if options.quote {
        full.push(Segment::text(format!(
            "> {trip} {nick}:\n> {original_text}\n"
        )));
    }
    if options.at_sender && !nick.is_empty() {
        full.push(Segment::mention(nick));
        full.push(Segment::text(" "));
    }
    full.extend(message.segments().iter().cloned());
    full
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingHandler, StaticResolver, TestConnector, test_bot};
    use serde_json::json;

    fn test_session(
        connector: Arc<TestConnector>,
        handler: Arc<RecordingHandler>,
    ) -> Arc<Session> {
        Session::new(
            test_bot("Bot", "lobby"),
            "ws://test",
            true,
            connector,
            handler,
            Arc::new(StaticResolver(Some("unused".to_string()))),
        )
        .unwrap()
    }

    #[test]
    fn test_identity_key() {
        let identity = Identity {
            nick: "Bot".to_string(),
            channel: "lobby".to_string(),
        };
        assert_eq!(identity.key(), "Bot@lobby");
        assert_eq!(identity.to_string(), "Bot@lobby");
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let connector = TestConnector::new();
        let (handler, _events) = RecordingHandler::new();
        let bot = BotConfig {
            nick: "Bot".to_string(),
            password: None,
            token: None,
            ..Default::default()
        };
        let result = Session::new(
            bot,
            "ws://test",
            true,
            connector,
            handler,
            Arc::new(StaticResolver(None)),
        );
        assert!(matches!(
            result,
            Err(SessionError::MissingCredential { identity }) if identity == "Bot@default"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_prefers_token_over_password() {
        let connector = TestConnector::new();
        let mut server = connector.script_connection();
        let (handler, _events) = RecordingHandler::new();

        let bot = BotConfig {
            nick: "Bot".to_string(),
            channel: "lobby".to_string(),
            password: Some("pw".to_string()),
            token: Some("tk".to_string()),
            ..Default::default()
        };
        let session = Session::new(
            bot,
            "ws://test",
            true,
            Arc::clone(&connector) as Arc<dyn Connector>,
            handler,
            Arc::new(StaticResolver(None)),
        )
        .unwrap();
        let run = tokio::spawn(Arc::clone(&session).run());

        let login = server.recv().await;
        assert_eq!(login["cmd"], "join");
        assert_eq!(login["client_key"], "EFChat_Bot");
        assert_eq!(login["token"], "tk");
        assert_eq!(login.get("password"), None);

        session.shutdown();
        let _ = run.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_fails_when_disconnected() {
        let connector = TestConnector::new();
        let (handler, _events) = RecordingHandler::new();
        let session = test_session(connector, handler);

        let result = session.send(&ClientFrame::Ping).await;
        assert!(matches!(result, Err(SessionError::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_pings_while_active() {
        let connector = TestConnector::new();
        let mut server = connector.script_connection();
        let (handler, _events) = RecordingHandler::new();
        let session = test_session(Arc::clone(&connector), handler);
        let run = tokio::spawn(Arc::clone(&session).run());

        let login = server.recv().await;
        assert_eq!(login["cmd"], "join");

        // The paused clock advances to the next timer while we wait.
        let ping = server.recv().await;
        assert_eq!(ping["cmd"], "ping");

        session.shutdown();
        let _ = run.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_retries_login_after_backoff() {
        let connector = TestConnector::new();
        let mut server1 = connector.script_connection();
        let mut server2 = connector.script_connection();
        let (handler, _events) = RecordingHandler::new();
        let session = test_session(Arc::clone(&connector), handler);
        let run = tokio::spawn(Arc::clone(&session).run());

        let login = server1.recv().await;
        assert_eq!(login["cmd"], "join");
        assert_eq!(session.state(), SessionState::Active);

        // Server drops the connection mid-Active.
        server1.close_stream();

        let mut states = session.watch_state();
        states
            .wait_for(|state| *state == SessionState::Reconnecting)
            .await
            .unwrap();

        // While reconnecting the transport is gone: no buffering, no
        // heartbeat against a superseded connection.
        assert!(matches!(
            session.send(&ClientFrame::Ping).await,
            Err(SessionError::NotConnected)
        ));

        // After one backoff the whole handshake is retried.
        let login = server2.recv().await;
        assert_eq!(login["cmd"], "join");
        states
            .wait_for(|state| *state == SessionState::Active)
            .await
            .unwrap();
        assert_eq!(connector.connect_count(), 2);

        session.shutdown();
        let _ = run.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_is_skipped_without_reconnect() {
        let connector = TestConnector::new();
        let mut server = connector.script_connection();
        let (handler, mut events) = RecordingHandler::new();
        let session = test_session(Arc::clone(&connector), handler);
        let run = tokio::spawn(Arc::clone(&session).run());

        server.recv().await; // login

        server.push("this is not json");
        server.push(&json!({"cmd": "chat", "nick": "alice", "text": "still here"}).to_string());

        let event = events.recv().await.unwrap();
        let Event::ChannelMessage(ev) = event else {
            panic!("expected channel message");
        };
        assert_eq!(ev.nick, "alice");
        assert_eq!(connector.connect_count(), 1);

        session.shutdown();
        let _ = run.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_command_does_not_stop_the_loop() {
        let connector = TestConnector::new();
        let mut server = connector.script_connection();
        let (handler, mut events) = RecordingHandler::new();
        let session = test_session(Arc::clone(&connector), handler);
        let run = tokio::spawn(Arc::clone(&session).run());

        server.recv().await; // login

        server.push(&json!({"cmd": "zzz_unknown"}).to_string());
        server.push(&json!({"cmd": "chat", "nick": "alice", "text": "next"}).to_string());

        // The unknown frame is dropped; only the chat event is dispatched.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, Event::ChannelMessage(_)));

        session.shutdown();
        let _ = run.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_directed_message_is_stripped_before_dispatch() {
        let connector = TestConnector::new();
        let mut server = connector.script_connection();
        let (handler, mut events) = RecordingHandler::new();
        let session = test_session(Arc::clone(&connector), handler);
        let run = tokio::spawn(Arc::clone(&session).run());

        server.recv().await; // login
        server.push(&json!({"cmd": "chat", "nick": "alice", "text": "@Bot hello"}).to_string());

        let Event::ChannelMessage(ev) = events.recv().await.unwrap() else {
            panic!("expected channel message");
        };
        assert!(ev.to_me);
        assert_eq!(ev.message.extract_plain_text(), "hello");

        session.shutdown();
        let _ = run.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_idempotent_and_terminal() {
        let connector = TestConnector::new();
        let mut server = connector.script_connection();
        let (handler, _events) = RecordingHandler::new();
        let session = test_session(Arc::clone(&connector), handler);
        let run = tokio::spawn(Arc::clone(&session).run());

        server.recv().await; // login

        session.shutdown();
        session.shutdown();
        let _ = run.await;

        assert_eq!(session.state(), SessionState::ShuttingDown);
        // No restart: the connector was asked for exactly one connection.
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_invokes_hook_without_wire_traffic() {
        let connector = TestConnector::new();
        let (handler, _events) = RecordingHandler::new();
        let session = test_session(connector, handler);

        let renames: Arc<parking_lot::Mutex<Vec<(String, String)>>> = Arc::default();
        let seen = Arc::clone(&renames);
        session.set_rename_hook(move |old, new| {
            seen.lock().push((old.to_string(), new.to_string()));
        });

        session.rename(Identity {
            nick: "Marvin".to_string(),
            channel: "lobby".to_string(),
        });
        assert_eq!(session.key(), "Marvin@lobby");
        assert_eq!(
            renames.lock().as_slice(),
            &[("Bot@lobby".to_string(), "Marvin@lobby".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_channel_sends_frame_and_renames() {
        let connector = TestConnector::new();
        let mut server = connector.script_connection();
        let (handler, _events) = RecordingHandler::new();
        let session = test_session(Arc::clone(&connector), handler);
        let run = tokio::spawn(Arc::clone(&session).run());

        server.recv().await; // login

        session.move_channel("bridge").await.unwrap();
        let frame = server.recv().await;
        assert_eq!(frame, json!({"cmd": "move", "channel": "bridge"}));
        assert_eq!(session.key(), "Bot@bridge");

        session.shutdown();
        let _ = run.await;
    }

    #[test]
    fn test_compose_reply() {
        let message = Message::from_text("sure");
        let full = compose_reply(
            "alice",
            "AbCdEf",
            "can you help",
            &message,
            &ReplyOptions {
                at_sender: true,
                quote: true,
            },
        );
        assert_eq!(
            full.encode().unwrap(),
            "> AbCdEf alice:\n> can you help\n@alice sure"
        );
    }

    #[test]
    fn test_reply_options_default_to_plain() {
        let message = Message::from_text("hi");
        let full = compose_reply("alice", "", "orig", &message, &ReplyOptions::default());
        assert_eq!(full.encode().unwrap(), "hi");
    }
}
