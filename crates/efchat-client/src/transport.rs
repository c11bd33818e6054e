//! Transport abstraction and the WebSocket implementation.
//!
//! The session engine only assumes the behavioral contract of the
//! transport: message-framed, ordered, full-duplex, closable. The traits
//! here capture that contract; [`WsConnector`] is the production
//! implementation on top of `tokio-tungstenite`. Tests substitute their
//! own connector.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use futures::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::trace;

use crate::error::{TransportError, TransportResult};

/// Write half of a framed transport.
#[async_trait]
pub trait FrameSink: Send {
    /// Writes one text frame.
    async fn send(&mut self, text: &str) -> TransportResult<()>;

    /// Closes the transport. Errors on close are ignored.
    async fn close(&mut self);
}

/// Read half of a framed transport.
#[async_trait]
pub trait FrameStream: Send {
    /// Receives the next inbound frame.
    ///
    /// `None` means the peer closed the stream; `Some(Err(_))` is a
    /// transport-level failure. Both tear down the connection.
    async fn next_frame(&mut self) -> Option<TransportResult<String>>;
}

/// Opens framed transports to a server URL.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a connection and returns its two halves.
    async fn connect(
        &self,
        url: &str,
    ) -> TransportResult<(Box<dyn FrameSink>, Box<dyn FrameStream>)>;
}

// =============================================================================
// WebSocket implementation
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Creates a new WebSocket connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> TransportResult<(Box<dyn FrameSink>, Box<dyn FrameStream>)> {
        let (ws_stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        let (ws_tx, ws_rx) = ws_stream.split();
        Ok((Box::new(WsSink(ws_tx)), Box::new(WsSource(ws_rx))))
    }
}

struct WsSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, text: &str) -> TransportResult<()> {
        self.0
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.0.close().await;
    }
}

struct WsSource(SplitStream<WsStream>);

#[async_trait]
impl FrameStream for WsSource {
    async fn next_frame(&mut self) -> Option<TransportResult<String>> {
        loop {
            match self.0.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "received text frame");
                    return Some(Ok(text.as_str().to_string()));
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "received binary frame");
                    return Some(Ok(String::from_utf8_lossy(&data).into_owned()));
                }
                // Protocol-level pings are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Err(e)) => {
                    return Some(Err(TransportError::ConnectionClosed {
                        reason: e.to_string(),
                    }));
                }
            }
        }
    }
}
