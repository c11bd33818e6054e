//! Registry of active sessions.
//!
//! Owns the `identity key → Session` mapping. Sessions are created from
//! bot configs, run as independent tasks, and are re-keyed in place when
//! they rename (nick or channel change). One failing session never
//! affects another: each runs its own reconnect loop.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::challenge::{ChallengeResolver, StdinResolver};
use crate::config::{BotConfig, BridgeConfig, DEFAULT_SERVER_URL};
use crate::error::{SessionError, SessionResult};
use crate::session::{EventHandler, Session};
use crate::transport::{Connector, WsConnector};

type SessionMap = Arc<RwLock<HashMap<String, SessionEntry>>>;

struct SessionEntry {
    session: Arc<Session>,
    run: JoinHandle<()>,
}

/// Registry owning every active session.
pub struct SessionRegistry {
    sessions: SessionMap,
    server_url: String,
    ignore_self: bool,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn EventHandler>,
    resolver: Arc<dyn ChallengeResolver>,
}

impl SessionRegistry {
    /// Creates a registry with the default WebSocket transport and stdin
    /// challenge resolver.
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            server_url: DEFAULT_SERVER_URL.to_string(),
            ignore_self: true,
            connector: Arc::new(WsConnector::new()),
            handler,
            resolver: Arc::new(StdinResolver),
        }
    }

    /// Creates a registry with the server URL and suppression policy taken
    /// from a bridge config.
    pub fn from_config(config: &BridgeConfig, handler: Arc<dyn EventHandler>) -> Self {
        Self::new(handler)
            .with_server_url(&config.server_url)
            .with_ignore_self(config.ignore_self)
    }

    /// Sets the server URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Sets the self-message suppression policy.
    pub fn with_ignore_self(mut self, enabled: bool) -> Self {
        self.ignore_self = enabled;
        self
    }

    /// Replaces the transport connector.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replaces the challenge resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn ChallengeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Creates a session for one bot, starts its run loop, registers it.
    pub fn create(&self, bot: BotConfig) -> SessionResult<Arc<Session>> {
        let session = Session::new(
            bot,
            &self.server_url,
            self.ignore_self,
            Arc::clone(&self.connector),
            Arc::clone(&self.handler),
            Arc::clone(&self.resolver),
        )?;
        let key = session.key();

        let mut sessions = self.sessions.write();
        if sessions.contains_key(&key) {
            return Err(SessionError::DuplicateIdentity { identity: key });
        }

        // The session holds only a weak path back to the map, so the
        // registry and its sessions never form a reference cycle.
        let map = Arc::downgrade(&self.sessions);
        session.set_rename_hook(move |old, new| {
            if let Some(sessions) = map.upgrade() {
                let mut sessions = sessions.write();
                if let Some(entry) = sessions.remove(old) {
                    sessions.insert(new.to_string(), entry);
                }
            }
        });

        let run = tokio::spawn(Arc::clone(&session).run());
        sessions.insert(
            key.clone(),
            SessionEntry {
                session: Arc::clone(&session),
                run,
            },
        );
        drop(sessions);

        info!(bot_id = %key, "session created");
        Ok(session)
    }

    /// Creates one session per bot config, isolating failures: a bot that
    /// cannot start (say, no credential) is logged and skipped. Returns
    /// the number of sessions started.
    pub fn start(&self, bots: impl IntoIterator<Item = BotConfig>) -> usize {
        let mut started = 0;
        for bot in bots {
            let id = format!("{}@{}", bot.nick, bot.channel);
            match self.create(bot) {
                Ok(_) => started += 1,
                Err(err) => warn!(bot_id = %id, error = %err, "failed to start session"),
            }
        }
        started
    }

    /// Moves a registry entry to a new key.
    ///
    /// A missing `old` key is treated as already renamed and ignored.
    pub fn rename(&self, old: &str, new: &str) {
        let mut sessions = self.sessions.write();
        if let Some(entry) = sessions.remove(old) {
            sessions.insert(new.to_string(), entry);
        }
    }

    /// Looks up a session by identity key.
    pub fn get(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(key).map(|e| Arc::clone(&e.session))
    }

    /// Returns all registered identity keys.
    pub fn keys(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Returns the number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Checks whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Shuts down every session and awaits their tasks, clearing the
    /// registry.
    pub async fn shutdown_all(&self) {
        let entries: Vec<SessionEntry> = {
            let mut sessions = self.sessions.write();
            sessions.drain().map(|(_, entry)| entry).collect()
        };
        info!(count = entries.len(), "shutting down all sessions");

        for entry in &entries {
            entry.session.shutdown();
        }
        for entry in entries {
            let _ = entry.run.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Identity, SessionState};
    use crate::testutil::{RecordingHandler, StaticResolver, TestConnector, test_bot};

    fn test_registry(connector: Arc<TestConnector>) -> SessionRegistry {
        let (handler, _events) = RecordingHandler::new();
        SessionRegistry::new(handler)
            .with_server_url("ws://test")
            .with_connector(connector)
            .with_resolver(Arc::new(StaticResolver(None)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_registers_by_identity_key() {
        let connector = TestConnector::new();
        let registry = test_registry(Arc::clone(&connector));

        registry.create(test_bot("Marvin", "lobby")).unwrap();
        registry.create(test_bot("Eddie", "bridge")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("Marvin@lobby").is_some());
        assert!(registry.get("Eddie@bridge").is_some());

        registry.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_identity_is_rejected() {
        let connector = TestConnector::new();
        let registry = test_registry(Arc::clone(&connector));

        registry.create(test_bot("Marvin", "lobby")).unwrap();
        let result = registry.create(test_bot("Marvin", "lobby"));
        assert!(matches!(
            result,
            Err(SessionError::DuplicateIdentity { identity }) if identity == "Marvin@lobby"
        ));

        registry.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_isolates_misconfigured_bots() {
        let connector = TestConnector::new();
        let registry = test_registry(Arc::clone(&connector));

        let broken = BotConfig {
            nick: "NoCreds".to_string(),
            ..Default::default()
        };
        let started = registry.start([test_bot("Marvin", "lobby"), broken]);
        assert_eq!(started, 1);
        assert_eq!(registry.len(), 1);

        registry.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_rename_rekeys_the_entry() {
        let connector = TestConnector::new();
        let registry = test_registry(Arc::clone(&connector));

        let session = registry.create(test_bot("Marvin", "lobby")).unwrap();
        session.rename(Identity {
            nick: "Marvin".to_string(),
            channel: "bridge".to_string(),
        });

        assert!(registry.get("Marvin@lobby").is_none());
        let renamed = registry.get("Marvin@bridge").expect("entry moved");
        assert!(Arc::ptr_eq(&renamed, &session));

        registry.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_missing_key_is_silent() {
        let connector = TestConnector::new();
        let registry = test_registry(Arc::clone(&connector));

        registry.rename("Ghost@nowhere", "Ghost@elsewhere");
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_all_clears_and_terminates() {
        let connector = TestConnector::new();
        let registry = test_registry(Arc::clone(&connector));

        // No scripted connections: both sessions sit in Connecting until
        // cancelled, which shutdown_all must handle.
        let a = registry.create(test_bot("Marvin", "lobby")).unwrap();
        let b = registry.create(test_bot("Eddie", "bridge")).unwrap();

        registry.shutdown_all().await;

        assert!(registry.is_empty());
        assert_eq!(a.state(), SessionState::ShuttingDown);
        assert_eq!(b.state(), SessionState::ShuttingDown);
    }
}
