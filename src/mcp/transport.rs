// mcp/transport — SSE transport pairing a server-push stream with POSTed requests.
//!
//! Session lifecycle:
//!   1. Client GETs `/sse` → session created, `endpoint` event names the submit URL
//!   2. Client POSTs to `/message?sessionId=<id>` → request runs through the protocol handler
//!   3. Response is pushed into the session queue (streamed as a `message` event)
//!      and also returned as the POST body
//!   4. Stream ends (disconnect, close signal, eviction) → session removed
//!
//! The session table is a plain mutex-guarded map. It is only locked for the
//! insert / lookup / remove itself and never across an `.await`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{FromRef, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures_util::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::protocol::McpProtocolHandler;

/// Idle interval after which an open stream emits a `: keepalive` comment.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);

/// How concurrent submissions for the same session are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionOrdering {
    /// Each submission runs independently; the stream sees completion order.
    #[default]
    Concurrent,
    /// Submissions for one session run one at a time; the stream sees arrival order.
    Serialized,
}

/// Item carried by a session's delivery queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Serialized JSON-RPC response.
    Message(String),
    /// Ends the stream gracefully.
    Close,
}

struct SseSession {
    tx: mpsc::UnboundedSender<Delivery>,
    submit_lock: Arc<tokio::sync::Mutex<()>>,
    last_activity: Instant,
}

type SessionTable = Arc<Mutex<HashMap<String, SseSession>>>;

// ── Errors ──────────────────────────────────────────────────────────────────

/// Failures that happen before the protocol handler can run.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Missing sessionId query parameter")]
    MissingSessionId,

    #[error("Session not found")]
    SessionNotFound(String),
}

impl TransportError {
    fn status_code(&self) -> StatusCode {
        match self {
            TransportError::MissingSessionId => StatusCode::BAD_REQUEST,
            TransportError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        if let TransportError::SessionNotFound(id) = &self {
            tracing::warn!(session = %id, "SSE: submit for unknown session");
        }
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ── Transport ───────────────────────────────────────────────────────────────

/// Owns the session table and the protocol handler. Cheap to clone; all
/// clones share one table.
#[derive(Clone)]
pub struct SseTransport {
    handler: Arc<McpProtocolHandler>,
    sessions: SessionTable,
    keepalive: Duration,
    ordering: SubmissionOrdering,
}

impl SseTransport {
    pub fn new(handler: Arc<McpProtocolHandler>) -> Self {
        Self {
            handler,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            keepalive: DEFAULT_KEEPALIVE,
            ordering: SubmissionOrdering::default(),
        }
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_ordering(mut self, ordering: SubmissionOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, SseSession>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a new session and return its id with the delivery queue.
    pub fn open_session(&self) -> (String, mpsc::UnboundedReceiver<Delivery>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.table().insert(
            id.clone(),
            SseSession {
                tx,
                submit_lock: Arc::new(tokio::sync::Mutex::new(())),
                last_activity: Instant::now(),
            },
        );
        tracing::info!(session = %id, "SSE: new session");
        (id, rx)
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.table().contains_key(session_id)
    }

    pub fn active_session_count(&self) -> usize {
        self.table().len()
    }

    /// Build the event stream for an opened session.
    ///
    /// The stream owns a guard that removes the session from the table when
    /// the stream is dropped, whatever the reason.
    pub fn event_stream(
        &self,
        session_id: String,
        mut rx: mpsc::UnboundedReceiver<Delivery>,
    ) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        let guard = SessionGuard { sessions: self.sessions.clone(), id: session_id.clone() };
        let keepalive = self.keepalive;

        async_stream::stream! {
            let guard = guard;
            yield Ok::<_, Infallible>(Event::default().event("endpoint").data(format!("/message?sessionId={}", session_id)));

            loop {
                match tokio::time::timeout(keepalive, rx.recv()).await {
                    Ok(Some(Delivery::Message(payload))) => {
                        guard.touch();
                        yield Ok(Event::default().event("message").data(payload));
                    }
                    Ok(Some(Delivery::Close)) | Ok(None) => {
                        tracing::debug!(session = %session_id, "SSE: close signal received");
                        break;
                    }
                    Err(_) => {
                        yield Ok(Event::default().comment("keepalive"));
                        // polled again only once the keepalive frame was taken
                        guard.touch();
                    }
                }
            }
        }
    }

    /// Run one JSON-RPC payload for `session_id`, enqueue the response on the
    /// session stream and return it.
    pub async fn submit(&self, session_id: &str, payload: &str) -> Result<String, TransportError> {
        let (tx, submit_lock) = {
            let mut table = self.table();
            let session = table
                .get_mut(session_id)
                .ok_or_else(|| TransportError::SessionNotFound(session_id.to_string()))?;
            session.last_activity = Instant::now();
            (session.tx.clone(), session.submit_lock.clone())
        };

        tracing::debug!(session = %session_id, "SSE: message {}", payload);

        let _turn = match self.ordering {
            SubmissionOrdering::Serialized => Some(submit_lock.lock_owned().await),
            SubmissionOrdering::Concurrent => None,
        };

        let response = self.handler.handle_request(payload).await;

        if tx.send(Delivery::Message(response.clone())).is_err() {
            tracing::debug!(session = %session_id, "SSE: session closed before delivery, response dropped");
        }
        Ok(response)
    }

    /// Signal every open stream to finish and empty the table.
    pub fn close_all_sessions(&self) -> usize {
        let drained: Vec<(String, SseSession)> = self.table().drain().collect();
        for (_, session) in &drained {
            let _ = session.tx.send(Delivery::Close);
        }
        if !drained.is_empty() {
            tracing::info!("SSE: closed {} session(s)", drained.len());
        }
        drained.len()
    }

    /// Close sessions with no activity for at least `ttl`. Returns how many were evicted.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let evicted: Vec<(String, SseSession)> = {
            let mut table = self.table();
            let stale: Vec<String> = table
                .iter()
                .filter(|(_, s)| s.last_activity.elapsed() >= ttl)
                .map(|(id, _)| id.clone())
                .collect();
            stale
                .into_iter()
                .filter_map(|id| table.remove(&id).map(|s| (id, s)))
                .collect()
        };
        for (id, session) in &evicted {
            tracing::info!(session = %id, "SSE: evicting idle session");
            let _ = session.tx.send(Delivery::Close);
        }
        evicted.len()
    }
}

/// Removes its session from the table on drop.
struct SessionGuard {
    sessions: SessionTable,
    id: String,
}

impl SessionGuard {
    fn touch(&self) {
        let mut table = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(session) = table.get_mut(&self.id) {
            session.last_activity = Instant::now();
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.id);
        tracing::info!(session = %self.id, "SSE: session closed");
    }
}

// ── HTTP handlers ───────────────────────────────────────────────────────────

/// `/sse` and `/message`, for any router state the transport can be taken from.
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    SseTransport: FromRef<S>,
{
    Router::new()
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
}

/// GET /sse — open a session and stream its responses.
pub async fn sse_handler(State(transport): State<SseTransport>) -> Response {
    let (session_id, rx) = transport.open_session();
    let stream = transport.event_stream(session_id, rx);
    (
        [(HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no"))],
        Sse::new(stream),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// POST /message?sessionId=<id> — run one JSON-RPC request for a session.
pub async fn message_handler(
    State(transport): State<SseTransport>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        return TransportError::MissingSessionId.into_response();
    };

    let payload = String::from_utf8_lossy(&body);
    match transport.submit(&session_id, &payload).await {
        Ok(response) => ([(header::CONTENT_TYPE, "application/json")], response).into_response(),
        Err(e) => e.into_response(),
    }
}
