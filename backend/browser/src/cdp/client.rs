//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>>;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser-level CDP connection. Page commands go through flattened
/// sessions obtained from [`CdpClient::attach`].
pub struct CdpClient {
    http_endpoint: String,
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: Pending,
    call_timeout: Duration,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at its debugging endpoint, e.g. `http://localhost:9222`.
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&http_endpoint)
            .map_err(|e| CdpError::Unreachable(format!("{}: {}", endpoint, e)))?;

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("[CDP] Fetching browser version from {}", version_url);
        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::Unreachable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::Unreachable(format!("{}: {}", endpoint, e)))?;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| CdpError::Disconnected(format!("opening WebSocket: {}", e)))?;
        let (ws_sink, ws_source) = ws_stream.split();

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let recv_task = tokio::spawn(Self::receive_loop(ws_source, pending.clone()));
        debug!("[CDP] Connected to {}", version.browser);

        Ok(Self {
            http_endpoint,
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            recv_task,
        })
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn http_endpoint(&self) -> &str {
        &self.http_endpoint
    }

    /// Route command responses to their waiters. Events are not consumed.
    async fn receive_loop(mut ws_source: WsSource, pending: Pending) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<CdpResponse>(&text) {
                    Ok(CdpResponse { id: Some(id), result, error, .. }) => {
                        let waiter = pending.lock().remove(&id);
                        if let Some(tx) = waiter {
                            let outcome = match error {
                                Some(e) => Err(CdpError::Protocol { code: e.code, message: e.message }),
                                None => Ok(result.unwrap_or(Value::Null)),
                            };
                            let _ = tx.send(outcome);
                        }
                    }
                    Ok(CdpResponse { method: Some(method), .. }) => trace!("[CDP] event {}", method),
                    Ok(_) => {}
                    Err(e) => warn!("[CDP] Failed to parse message: {}", e),
                },
                Ok(Message::Close(_)) => {
                    debug!("[CDP] WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("[CDP] WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        // Wake everyone still waiting; their senders drop here.
        pending.lock().clear();
    }

    /// Send a command and wait for its response.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };
        let json = serde_json::to_string(&request)?;
        trace!("[CDP] send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::Disconnected(format!("closed before {} returned", method))),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout { method: method.to_string() })
            }
        }
    }

    // ========================================================================
    // Targets
    // ========================================================================

    /// Open tabs, most recently focused first.
    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        let url = format!("{}/json/list", self.http_endpoint);
        Ok(reqwest::get(&url).await?.json().await?)
    }

    /// Attach to a target and return the flattened session id.
    pub async fn attach(&self, target_id: &str) -> Result<String, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({ "targetId": target_id, "flatten": true })),
                None,
            )
            .await?;
        result["sessionId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::Malformed("attach reply has no sessionId".to_string()))
    }

    /// Open `url` in a new background tab and return its target id.
    pub async fn create_target(&self, url: &str) -> Result<String, CdpError> {
        let result = self
            .call("Target.createTarget", Some(json!({ "url": url, "background": true })), None)
            .await?;
        result["targetId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::Malformed("createTarget reply has no targetId".to_string()))
    }

    pub async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({ "targetId": target_id })), None).await?;
        Ok(())
    }

    // ========================================================================
    // Runtime
    // ========================================================================

    /// Evaluate an expression in a session's page and return its JSON value.
    pub async fn evaluate(&self, session_id: &str, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
                Some(session_id),
            )
            .await?;
        evaluation_value(result)
    }
}

/// Unwrap a `Runtime.evaluate` result, turning page exceptions into errors.
pub(crate) fn evaluation_value(mut result: Value) -> Result<Value, CdpError> {
    if let Some(exception) = result.get("exceptionDetails") {
        let text = exception["exception"]["description"]
            .as_str()
            .or_else(|| exception["text"].as_str())
            .unwrap_or("Unknown error");
        return Err(CdpError::Script(text.to_string()));
    }
    Ok(result["result"]["value"].take())
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[test]
    fn exceptions_become_errors() {
        let result = json!({
            "result": { "type": "object" },
            "exceptionDetails": { "text": "Uncaught", "exception": { "description": "ReferenceError: x is not defined" } }
        });
        match evaluation_value(result) {
            Err(CdpError::Script(msg)) => assert!(msg.contains("ReferenceError")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn values_are_unwrapped() {
        let result = json!({ "result": { "type": "object", "value": { "title": "T" } } });
        assert_eq!(evaluation_value(result).unwrap(), json!({ "title": "T" }));
        let undefined = json!({ "result": { "type": "undefined" } });
        assert_eq!(evaluation_value(undefined).unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn missing_chrome_is_reported() {
        let server = MockServer::start().await;
        Mock::given(matchers::path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        match CdpClient::connect(&server.uri()).await {
            Err(CdpError::Unreachable(_)) => {}
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("connected to a fake endpoint"),
        }
    }
}
