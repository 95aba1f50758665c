//! Websocket source for a remote simulation server

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace};

use crate::config::EndpointConfig;
use crate::protocol::ControlToken;
use crate::source::FrameSource;
use crate::{Result, StreamError};

/// Source reading frame messages from `ws://<host>/simulate/<scenario>`
pub struct WebSocketSource {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
    closed: bool,
}

impl WebSocketSource {
    /// Open the websocket described by `endpoint`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The endpoint configuration is invalid
    /// - The handshake does not finish within the connect timeout
    /// - The server refuses the connection or the scenario
    pub async fn connect(endpoint: &EndpointConfig) -> Result<Self> {
        endpoint.validate()?;
        let url = endpoint.url();
        let timeout = endpoint.connect_timeout();

        info!(url = %url, "Connecting to simulation server");

        let (socket, response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| StreamError::Timeout { duration: timeout })?
            .map_err(|e| {
                StreamError::connection_failed_with_source(
                    format!("websocket handshake with {} failed", url),
                    Box::new(e),
                )
            })?;

        debug!(url = %url, status = %response.status(), "Websocket handshake complete");

        Ok(Self { socket, url, closed: false })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn is_closed_error(err: &WsError) -> bool {
    matches!(err, WsError::ConnectionClosed | WsError::AlreadyClosed)
}

#[async_trait::async_trait]
impl FrameSource for WebSocketSource {
    async fn next_message(&mut self) -> Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }

        loop {
            match self.socket.next().await {
                None => return Ok(None),
                Some(Err(e)) if is_closed_error(&e) => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                // Not part of the protocol; let the decoder reject it as text.
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(url = %self.url, ?frame, "Server sent close frame");
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    trace!(url = %self.url, ?other, "Ignoring control frame");
                }
            }
        }
    }

    async fn send_control(&mut self, token: ControlToken) -> Result<()> {
        if self.closed {
            return Err(StreamError::SessionClosed);
        }
        self.socket.send(Message::Text(token.as_str().to_string())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        match self.socket.close(None).await {
            Ok(()) => Ok(()),
            Err(e) if is_closed_error(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
