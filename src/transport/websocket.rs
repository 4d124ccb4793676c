//! WebSocket transport (tokio-tungstenite).
//!
//! Gateway messages travel as text frames. Binary frames are accepted when
//! they hold valid UTF-8; control frames are skipped.

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Connector, Endpoint, MessageTransport};
use crate::error::{MoltbotError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens [`WsTransport`] connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Transport = WsTransport;

    fn connect<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<WsTransport>> {
        Box::pin(async move {
            let url = endpoint.url()?;
            let mut request = url
                .as_str()
                .into_client_request()
                .map_err(|e| MoltbotError::InvalidUrl(format!("{url}: {e}")))?;

            if let Some(token) = endpoint.credential() {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| MoltbotError::ConnectionFailed(format!("invalid token: {e}")))?;
                request.headers_mut().insert(header::AUTHORIZATION, value);
            }

            tracing::debug!("Connecting to gateway at {}", url);

            let (stream, _response) = connect_async(request)
                .await
                .map_err(|e| MoltbotError::ConnectionFailed(e.to_string()))?;

            Ok(WsTransport::new(stream))
        })
    }
}

/// WebSocket connection to the gateway.
pub struct WsTransport {
    /// `None` once closed
    stream: Option<WsStream>,
}

impl WsTransport {
    /// Wrap an established WebSocket stream.
    pub fn new(stream: WsStream) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream_mut(&mut self) -> Result<&mut WsStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| MoltbotError::ConnectionFailed("connection already closed".to_string()))
    }
}

impl MessageTransport for WsTransport {
    fn send(&mut self, text: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.stream_mut()?
                .send(WsMessage::Text(text.into()))
                .await
                .map_err(|e| MoltbotError::ConnectionFailed(e.to_string()))
        })
    }

    fn receive(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move {
            let stream = self.stream_mut()?;
            loop {
                match stream.next().await {
                    Some(Ok(WsMessage::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                    Some(Ok(WsMessage::Binary(data))) => {
                        let text = String::from_utf8(data.to_vec()).map_err(|_| {
                            MoltbotError::InvalidResponse("binary frame is not UTF-8".to_string())
                        })?;
                        return Ok(Some(text));
                    },
                    Some(Ok(WsMessage::Close(_))) | None => return Ok(None),
                    // Ping/pong are answered by tungstenite itself
                    Some(Ok(_)) => continue,
                    Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                        return Ok(None)
                    },
                    Some(Err(e)) => return Err(MoltbotError::ConnectionFailed(e.to_string())),
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let Some(mut stream) = self.stream.take() else {
                return Ok(());
            };

            match stream.close(None).await {
                Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
                Err(e) => Err(MoltbotError::ConnectionFailed(e.to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[tokio::test]
    async fn test_text_roundtrip_and_idempotent_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if let WsMessage::Text(text) = msg {
                    ws.send(WsMessage::Text(text)).await.unwrap();
                }
            }
        });

        let endpoint = Endpoint::new("127.0.0.1", port);
        let mut transport = WsConnector.connect(&endpoint).await.unwrap();

        transport.send("hello".to_string()).await.unwrap();
        assert_eq!(transport.receive().await.unwrap().as_deref(), Some("hello"));

        transport.close().await.unwrap();
        assert!(transport.is_closed());
        transport.close().await.unwrap();

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = WsConnector.connect(&Endpoint::new("127.0.0.1", port)).await;
        assert!(matches!(result, Err(MoltbotError::ConnectionFailed(_))));
    }
}
