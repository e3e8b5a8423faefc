//! Wire contract with the remote store.
//!
//! Every call is one POST of a JSON envelope to the configured endpoint:
//!
//! ```text
//! {"action": "ping" | "sync" | "push", "credential": "...", "userId": "...",
//!  "state"?: CloudPayload, "clientUpdatedAt"?: "2024-01-01T00:00:00.000Z"}
//! ```
//!
//! and one JSON reply `{"ok": bool, "error"?, "state"?, "updatedAt"?}`.
//! There is no retry here; the controller owns retry policy.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

use crate::snapshot::CloudPayload;

/// Remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "ping")]
    Ping,
    /// Fetch the stored document. Spelled `sync` on the wire.
    #[serde(rename = "sync")]
    Pull,
    #[serde(rename = "push")]
    Push,
}

impl Action {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Action::Ping => "ping",
            Action::Pull => "sync",
            Action::Push => "push",
        }
    }
}

/// Per-request data other than the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub credential: String,
    pub user_id: String,
    pub state: Option<CloudPayload>,
    pub client_updated_at: Option<String>,
}

impl Envelope {
    pub fn new(credential: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            user_id: user_id.into(),
            state: None,
            client_updated_at: None,
        }
    }

    pub fn with_state(mut self, state: CloudPayload, client_updated_at: impl Into<String>) -> Self {
        self.state = Some(state);
        self.client_updated_at = Some(client_updated_at.into());
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    action: Action,
    credential: &'a str,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a CloudPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_updated_at: Option<&'a str>,
}

/// Serialize the request body for one call.
pub fn encode_request(action: Action, envelope: &Envelope) -> Result<String, TransportError> {
    let request = WireRequest {
        action,
        credential: &envelope.credential,
        user_id: &envelope.user_id,
        state: envelope.state.as_ref(),
        client_updated_at: envelope.client_updated_at.as_deref(),
    };
    serde_json::to_string(&request).map_err(|e| TransportError::Protocol(e.to_string()))
}

/// Parsed reply.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: String,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    pub fn with_state(state: Value, updated_at: impl Into<String>) -> Self {
        Self {
            ok: true,
            state: Some(state),
            updated_at: updated_at.into(),
            error: None,
        }
    }

    pub fn with_updated_at(updated_at: impl Into<String>) -> Self {
        Self {
            ok: true,
            updated_at: updated_at.into(),
            ..Self::default()
        }
    }

    /// The remote holds a document only when `state` is an object.
    pub fn snapshot(&self) -> Option<&Value> {
        self.state.as_ref().filter(|state| state.is_object())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote could not be reached.
    #[error("Network request failed: {0}")]
    Network(String),

    /// The reply was not the expected JSON.
    #[error("Invalid response from remote: {0}")]
    Protocol(String),

    /// Parsed reply with `ok: false` or a non-2xx status.
    #[error("{0}")]
    Server(String),

    /// The remote refused the credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl TransportError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Unauthorized(_))
    }

    /// Classify a server-side error message.
    pub fn from_server_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if ["unauthorized", "unauthorised", "forbidden"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            TransportError::Unauthorized(message)
        } else {
            TransportError::Server(message)
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Protocol(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Interpret an HTTP status and body.
pub fn parse_reply(status: u16, body: &str) -> Result<Reply, TransportError> {
    if status == 401 || status == 403 {
        return Err(TransportError::Unauthorized(format!("HTTP {status}")));
    }

    let reply: Reply = serde_json::from_str(body).map_err(|e| TransportError::Protocol(e.to_string()))?;

    let success = (200..300).contains(&status);
    if !success || !reply.ok {
        let message = reply
            .error
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(TransportError::from_server_message(message));
    }
    Ok(reply)
}

/// One round trip to the remote store.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, endpoint: &str, action: Action, envelope: &Envelope) -> Result<Reply, TransportError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, endpoint: &str, action: Action, envelope: &Envelope) -> Result<Reply, TransportError> {
        let body = encode_request(action, envelope)?;

        // text/plain keeps script endpoints from demanding a CORS preflight.
        let mut request = self
            .client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        tracing::debug!(action = action.wire_name(), status, "remote replied");
        parse_reply(status, &text)
    }
}

/// A call seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: String,
    pub action: Action,
    pub envelope: Envelope,
}

/// Scripted in-process transport.
///
/// Replies are consumed in order; when the queue is empty every call
/// succeeds with a bare `ok` reply.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<Reply, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, reply: Result<Reply, TransportError>) {
        self.replies.lock().push_back(reply);
    }

    /// Delay every call by `latency` (tokio time, so it can be paused).
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, action: Action) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.action == action)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, endpoint: &str, action: Action, envelope: &Envelope) -> Result<Reply, TransportError> {
        self.calls.lock().push(RecordedCall {
            endpoint: endpoint.to_string(),
            action,
            envelope: envelope.clone(),
        });

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.replies.lock().pop_front().unwrap_or_else(|| Ok(Reply::ok()))
    }
}
