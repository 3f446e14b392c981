//! Low-level CDP WebSocket client.
//!
//! Connects to a DevTools page target and provides JSON-RPC command and
//! response correlation plus fan-out of asynchronous CDP events. Commands
//! get auto-incrementing ids and a oneshot response slot; events go out on
//! a broadcast channel so the page driver and its popup watcher can listen
//! independently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::BrowserError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default per-command response budget.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// An asynchronous CDP event.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// Event method name (e.g. "Target.targetCreated").
    pub method: String,
    /// Event parameters.
    pub params: Value,
}

/// A command sent to the browser.
#[derive(Debug, Clone, serde::Serialize)]
struct CdpCommand {
    id: u64,
    method: String,
    params: Value,
}

/// A correlated response.
#[derive(Debug, Clone)]
pub struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpResponseError>,
}

/// Error object inside a CDP response.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CdpResponseError {
    pub code: i64,
    pub message: String,
    pub data: Option<String>,
}

/// CDP client over one page target's WebSocket.
pub struct CdpClient {
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>,
    writer: Mutex<WsSink>,
    events: broadcast::Sender<CdpEvent>,
    closed: Arc<AtomicBool>,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a DevTools page WebSocket endpoint
    /// (`ws://host:port/devtools/page/<target-id>`).
    pub async fn connect(ws_url: &str) -> Result<Self, BrowserError> {
        tracing::info!(url = ws_url, "connecting to DevTools WebSocket");

        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;
        let (writer, reader) = stream.split();

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));

        let reader_handle = tokio::spawn(Self::read_loop(
            reader,
            Arc::clone(&pending),
            events.clone(),
            Arc::clone(&closed),
        ));

        Ok(Self {
            next_id: AtomicU64::new(1),
            pending,
            writer: Mutex::new(writer),
            events,
            closed,
            _reader_handle: reader_handle,
        })
    }

    /// Whether the transport has shut down.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Subscribe to the event stream. Slow subscribers drop old events.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }

    /// Send a command and await its correlated response.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        self.send_command_with_timeout(method, params, COMMAND_TIMEOUT)
            .await
    }

    /// Send a command with an explicit response budget.
    pub async fn send_command_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, BrowserError> {
        if self.is_closed() {
            return Err(BrowserError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let command = CdpCommand {
            id,
            method: method.to_string(),
            params,
        };
        let json = serde_json::to_string(&command).map_err(|e| BrowserError::Protocol {
            detail: format!("failed to serialize command: {e}"),
        })?;

        tracing::trace!(id, method, "sending CDP command");

        // Register the response slot before sending to avoid a race with
        // the reader task.
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        {
            let mut writer = self.writer.lock().await;
            writer
                .send(Message::Text(json.into()))
                .await
                .map_err(|e| BrowserError::Protocol {
                    detail: format!("failed to send WebSocket message: {e}"),
                })?;
        }

        let response = tokio::time::timeout(timeout, rx)
            .await
            .map_err(|_| BrowserError::Timeout {
                method: method.to_string(),
                duration: timeout,
            })?
            .map_err(|_| BrowserError::Closed)?;

        if let Some(err) = response.error {
            return Err(BrowserError::CdpError {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Enable a CDP domain ("Page", "Runtime", "Network", …).
    pub async fn enable_domain(&self, domain: &str) -> Result<(), BrowserError> {
        self.send_command(&format!("{domain}.enable"), serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Reader task: correlates responses, fans out events, and tears down
    /// pending commands when the socket drops.
    async fn read_loop(
        mut reader: WsSource,
        pending: Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>,
        events: broadcast::Sender<CdpEvent>,
        closed: Arc<AtomicBool>,
    ) {
        while let Some(message) = reader.next().await {
            let message = match message {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket read error, stopping reader");
                    break;
                }
            };

            let text = match message {
                Message::Text(t) => t.to_string(),
                Message::Binary(b) => match String::from_utf8(b.to_vec()) {
                    Ok(s) => s,
                    Err(_) => continue,
                },
                Message::Close(_) => {
                    tracing::info!("WebSocket closed by remote");
                    break;
                }
                _ => continue,
            };

            let json: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "unparseable CDP message");
                    continue;
                }
            };

            if let Some(response) = parse_cdp_response(&json) {
                let mut pending_guard = pending.lock().await;
                if let Some(tx) = pending_guard.remove(&response.id) {
                    let _ = tx.send(response);
                } else {
                    tracing::trace!(id = response.id, "response for unknown command id");
                }
            } else if let Some(event) = parse_cdp_event(&json) {
                // No subscribers is fine; the event is simply dropped.
                let _ = events.send(event);
            }
        }

        closed.store(true, Ordering::Release);

        // Fail all in-flight commands so callers unblock.
        let mut pending_guard = pending.lock().await;
        for (id, tx) in pending_guard.drain() {
            let _ = tx.send(CdpResponse {
                id,
                result: None,
                error: Some(CdpResponseError {
                    code: -1,
                    message: "WebSocket connection closed".to_string(),
                    data: None,
                }),
            });
        }
    }
}

/// Parse a CDP response (a message with an `id`).
pub fn parse_cdp_response(json: &Value) -> Option<CdpResponse> {
    let id = json.get("id")?.as_u64()?;
    Some(CdpResponse {
        id,
        result: json.get("result").cloned(),
        error: json
            .get("error")
            .and_then(|e| serde_json::from_value(e.clone()).ok()),
    })
}

/// Parse a CDP event (a message with a `method` and no `id`).
pub fn parse_cdp_event(json: &Value) -> Option<CdpEvent> {
    if json.get("id").is_some() {
        return None;
    }
    let method = json.get("method")?.as_str()?.to_string();
    let params = json.get("params").cloned().unwrap_or(Value::Null);
    Some(CdpEvent { method, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serialization() {
        let cmd = CdpCommand {
            id: 7,
            method: "Runtime.evaluate".to_string(),
            params: serde_json::json!({ "expression": "1 + 1", "returnByValue": true }),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["method"], "Runtime.evaluate");
        assert_eq!(json["params"]["expression"], "1 + 1");
    }

    #[test]
    fn parse_response_success() {
        let json = serde_json::json!({
            "id": 1,
            "result": { "frameId": "abc123" }
        });
        let resp = parse_cdp_response(&json).unwrap();
        assert_eq!(resp.id, 1);
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap()["frameId"], "abc123");
    }

    #[test]
    fn parse_response_error() {
        let json = serde_json::json!({
            "id": 2,
            "error": { "code": -32602, "message": "Invalid params", "data": "missing 'url'" }
        });
        let resp = parse_cdp_response(&json).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "Invalid params");
        assert_eq!(err.data.as_deref(), Some("missing 'url'"));
    }

    #[test]
    fn event_is_not_a_response() {
        let json = serde_json::json!({
            "method": "Page.loadEventFired",
            "params": { "timestamp": 12345.678 }
        });
        assert!(parse_cdp_response(&json).is_none());
        let event = parse_cdp_event(&json).unwrap();
        assert_eq!(event.method, "Page.loadEventFired");
        assert_eq!(event.params["timestamp"], 12345.678);
    }

    #[test]
    fn response_is_not_an_event() {
        let json = serde_json::json!({ "id": 1, "result": {} });
        assert!(parse_cdp_event(&json).is_none());
    }

    #[test]
    fn event_without_params_gets_null() {
        let json = serde_json::json!({ "method": "Page.domContentEventFired" });
        let event = parse_cdp_event(&json).unwrap();
        assert_eq!(event.params, Value::Null);
    }

    #[test]
    fn malformed_messages_parse_to_neither() {
        let json = serde_json::json!({ "params": { "foo": "bar" } });
        assert!(parse_cdp_response(&json).is_none());
        assert!(parse_cdp_event(&json).is_none());
    }
}
