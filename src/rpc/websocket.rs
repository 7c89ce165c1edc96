//! WebSocket notification channel.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::api::{NotificationStream, RawNotification};
use crate::error::Result;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct NotificationEnvelope {
    method: String,
    #[serde(default)]
    params: Vec<NotificationParam>,
}

#[derive(Debug, Deserialize)]
struct NotificationParam {
    gid: String,
}

/// Extracts a notification from a text frame.
///
/// Frames that are not notifications (e.g. responses to requests) yield `None`.
pub(crate) fn parse_notification(text: &str) -> Option<RawNotification> {
    let envelope: NotificationEnvelope = serde_json::from_str(text).ok()?;
    let gid = envelope.params.into_iter().next()?.gid;
    Some(RawNotification {
        method: envelope.method,
        gid,
    })
}

/// Notification stream read from the daemon's WebSocket endpoint.
pub struct WebSocketNotifications {
    socket: Option<Socket>,
}

impl WebSocketNotifications {
    /// Connects to `url` (e.g. `ws://localhost:6800/jsonrpc`).
    ///
    /// # Errors
    ///
    /// Returns an error if the WebSocket handshake fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _response) = tokio_tungstenite::connect_async(url).await?;
        log::debug!("Subscribed to notifications at {url}");
        Ok(Self {
            socket: Some(socket),
        })
    }
}

#[async_trait]
impl NotificationStream for WebSocketNotifications {
    async fn next_notification(&mut self) -> Option<Result<RawNotification>> {
        let socket = self.socket.as_mut()?;
        loop {
            match socket.next().await? {
                Err(e) => return Some(Err(e.into())),
                Ok(Message::Text(text)) => {
                    if let Some(notification) = parse_notification(&text) {
                        return Some(Ok(notification));
                    }
                    log::trace!("Ignoring non-notification frame");
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                log::debug!("Error while closing notification channel: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_download_start() {
        let text = r#"{"jsonrpc":"2.0","method":"aria2.onDownloadStart","params":[{"gid":"2089b05ecca3d829"}]}"#;
        assert_eq!(
            parse_notification(text),
            Some(RawNotification::new("aria2.onDownloadStart", "2089b05ecca3d829"))
        );
    }

    #[test]
    fn ignores_responses_and_garbage() {
        assert_eq!(parse_notification(r#"{"jsonrpc":"2.0","id":"1","result":"OK"}"#), None);
        assert_eq!(parse_notification("not json"), None);
        assert_eq!(
            parse_notification(r#"{"jsonrpc":"2.0","method":"aria2.onDownloadStart","params":[]}"#),
            None
        );
    }
}
