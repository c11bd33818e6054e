//! Shared test doubles for the session engine.
//!
//! `TestConnector` stands in for the WebSocket transport: each scripted
//! connection is a pair of in-memory channels, with the server end handed
//! back to the test. When the script runs out, further connect calls pend
//! forever, which keeps a reconnecting session parked in `Connecting`.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::challenge::ChallengeResolver;
use crate::config::BotConfig;
use crate::error::{TransportError, TransportResult};
use crate::event::Event;
use crate::session::EventHandler;
use crate::transport::{Connector, FrameSink, FrameStream};

/// Server-side handle to one scripted connection.
pub struct ServerEnd {
    to_client: Option<mpsc::UnboundedSender<TransportResult<String>>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    /// Delivers one frame to the client.
    pub fn push(&self, text: &str) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Ok(text.to_string()));
        }
    }

    /// Delivers a transport error to the client.
    pub fn fail(&self, reason: &str) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Err(TransportError::ConnectionClosed {
                reason: reason.to_string(),
            }));
        }
    }

    /// Ends the inbound stream, as a server-side close would.
    pub fn close_stream(&mut self) {
        self.to_client = None;
    }

    /// Receives the next frame the client wrote, parsed as JSON.
    pub async fn recv(&mut self) -> serde_json::Value {
        let text = self.from_client.recv().await.expect("client sink closed");
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Returns the next already-written frame without waiting, if any.
    pub fn try_recv(&mut self) -> Option<serde_json::Value> {
        self.from_client
            .try_recv()
            .ok()
            .map(|text| serde_json::from_str(&text).expect("client sent invalid JSON"))
    }
}

/// Scripted connector handing out prepared in-memory connections.
#[derive(Default)]
pub struct TestConnector {
    pending: Mutex<VecDeque<(Box<dyn FrameSink>, Box<dyn FrameStream>)>>,
    connects: AtomicUsize,
}

impl TestConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Prepares one connection and returns its server end.
    pub fn script_connection(&self) -> ServerEnd {
        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
        let (from_client_tx, from_client_rx) = mpsc::unbounded_channel();
        self.pending.lock().push_back((
            Box::new(TestSink { tx: from_client_tx }),
            Box::new(TestStream { rx: to_client_rx }),
        ));
        ServerEnd {
            to_client: Some(to_client_tx),
            from_client: from_client_rx,
        }
    }

    /// Number of connection attempts made so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for TestConnector {
    async fn connect(
        &self,
        _url: &str,
    ) -> TransportResult<(Box<dyn FrameSink>, Box<dyn FrameStream>)> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.pending.lock().pop_front();
        match next {
            Some(pair) => Ok(pair),
            None => {
                pending::<()>().await;
                unreachable!()
            }
        }
    }
}

struct TestSink {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl FrameSink for TestSink {
    async fn send(&mut self, text: &str) -> TransportResult<()> {
        self.tx
            .send(text.to_string())
            .map_err(|_| TransportError::SendFailed("server gone".to_string()))
    }

    async fn close(&mut self) {}
}

struct TestStream {
    rx: mpsc::UnboundedReceiver<TransportResult<String>>,
}

#[async_trait]
impl FrameStream for TestStream {
    async fn next_frame(&mut self) -> Option<TransportResult<String>> {
        self.rx.recv().await
    }
}

/// Handler forwarding every dispatched event into a channel.
pub struct RecordingHandler {
    tx: mpsc::UnboundedSender<Event>,
}

impl RecordingHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle_event(&self, _identity: &str, event: Event) {
        let _ = self.tx.send(event);
    }
}

/// Resolver answering every challenge with a fixed value.
///
/// `None` pends forever, for exercising the challenge timeout.
pub struct StaticResolver(pub Option<String>);

#[async_trait]
impl ChallengeResolver for StaticResolver {
    async fn resolve(&self, _url: &str) -> Option<String> {
        match &self.0 {
            Some(answer) => Some(answer.clone()),
            None => {
                pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// A bot config with a token credential, ready for session tests.
pub fn test_bot(nick: &str, channel: &str) -> BotConfig {
    BotConfig {
        nick: nick.to_string(),
        channel: channel.to_string(),
        token: Some("secret".to_string()),
        ..Default::default()
    }
}
