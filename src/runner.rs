//! Runner connection - request/response messaging with the step runner
//!
//! The runner is an independently started process that hosts the step
//! implementations (Java, C#, Python, ...).  Goto-definition on a step that
//! is not a concept asks the runner where the step is implemented.
//!
//! # Architecture
//!
//! ```text
//! Backend
//!   └── runner: RwLock<Option<SharedRunner>>   # current session, if any
//!
//! StreamRunner
//!   ├── writer: tokio::Mutex<W>                # serialized writes
//!   ├── pending: Mutex<Pending>                # in-flight requests, closed flag
//!   └── reader task                            # routes replies by id
//! ```
//!
//! # Wire Format
//!
//! One JSON message per line.  Every message carries a `messageType` tag
//! and a `messageId`; the reply to a request reuses the request's id.
//!
//! ```json
//! {"messageType":"StepNameRequest","messageId":7,"stepValue":"Say {} to {}"}
//! {"messageType":"StepNameResponse","messageId":7,"isStepPresent":true,
//!  "fileName":"/project/src/Steps.java","span":{"start":12,"startChar":4,"end":15,"endChar":5}}
//! ```
//!
//! A session that is not connected is not an error: the backend simply has
//! no runner and goto-definition falls back to returning nothing.  The same
//! holds once the runner closes its end of the stream.  Only a request that
//! is in flight when the connection drops fails with
//! [`RunnerError::Disconnected`].
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;

/// A 1-based line/character range reported by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// 1-based first line.
    pub start: u32,
    /// Character offset on the first line.
    pub start_char: u32,
    /// 1-based last line.
    pub end: u32,
    /// Character offset on the last line.
    pub end_char: u32,
}

/// The runner's answer to a [`RunnerMessage::StepNameRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepNameResponse {
    /// Whether the runner has an implementation for the step.
    pub is_step_present: bool,
    /// File containing the implementation.
    #[serde(default)]
    pub file_name: String,
    /// Where in `file_name` the implementation is.
    #[serde(default)]
    pub span: Span,
}

/// Messages exchanged with the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "messageType", rename_all_fields = "camelCase")]
pub enum RunnerMessage {
    /// Ask where the step with the given canonical value is implemented.
    StepNameRequest { message_id: u64, step_value: String },
    StepNameResponse {
        message_id: u64,
        #[serde(flatten)]
        response: StepNameResponse,
    },
}

impl RunnerMessage {
    /// A request for `step_value`.  The id is assigned by the connection.
    pub fn step_name_request(step_value: impl Into<String>) -> Self {
        RunnerMessage::StepNameRequest {
            message_id: 0,
            step_value: step_value.into(),
        }
    }

    pub fn message_id(&self) -> u64 {
        match self {
            RunnerMessage::StepNameRequest { message_id, .. }
            | RunnerMessage::StepNameResponse { message_id, .. } => *message_id,
        }
    }

    fn set_message_id(&mut self, id: u64) {
        match self {
            RunnerMessage::StepNameRequest { message_id, .. }
            | RunnerMessage::StepNameResponse { message_id, .. } => *message_id = id,
        }
    }

    /// The step-name response carried by this message, if it is one.
    pub fn step_name_response(&self) -> Option<&StepNameResponse> {
        match self {
            RunnerMessage::StepNameResponse { response, .. } => Some(response),
            RunnerMessage::StepNameRequest { .. } => None,
        }
    }
}

/// Failure talking to the runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("runner did not respond within {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("runner connection closed")]
    Disconnected,
    #[error("runner i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode runner message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode runner message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A request/response channel to a runner.
///
/// Implementations must be safe to share between concurrent requests.
#[tower_lsp::async_trait]
pub trait RunnerConnection: Send + Sync {
    /// Send `message` and wait at most `timeout` for its reply.
    async fn request(
        &self,
        message: RunnerMessage,
        timeout: Duration,
    ) -> Result<RunnerMessage, RunnerError>;

    /// Whether the connection can still carry requests.  A runner that has
    /// gone away is treated the same as no runner at all.
    fn is_connected(&self) -> bool {
        true
    }
}

/// The runner session handed to resolvers.
pub type SharedRunner = Arc<dyn RunnerConnection>;

/// In-flight requests, plus whether the reader has stopped routing replies.
/// Both live under one lock so a request is never registered after the
/// reader has drained the map.
#[derive(Default)]
struct Pending {
    waiters: HashMap<u64, oneshot::Sender<RunnerMessage>>,
    closed: bool,
}

type PendingMap = Arc<Mutex<Pending>>;

/// Removes a request's waiter however the request ends, including when the
/// request future itself is dropped.
struct PendingGuard<'a> {
    id: u64,
    pending: &'a PendingMap,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().waiters.remove(&self.id);
    }
}

/// Newline-delimited JSON runner connection over an async byte stream.
pub struct StreamRunner<W> {
    writer: tokio::sync::Mutex<W>,
    pending: PendingMap,
    next_id: AtomicU64,
    reader: tokio::task::JoinHandle<()>,
}

impl StreamRunner<tokio::net::tcp::OwnedWriteHalf> {
    /// Connect to a runner listening on `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, RunnerError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();
        Ok(Self::new(read, write))
    }
}

impl<W> StreamRunner<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an already established stream.  Spawns the reader task, so it
    /// must be called from inside a tokio runtime.
    pub fn new<R>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(Pending::default()));
        let reader = tokio::spawn(read_loop(reader, Arc::clone(&pending)));
        Self {
            writer: tokio::sync::Mutex::new(writer),
            pending,
            next_id: AtomicU64::new(1),
            reader,
        }
    }

    async fn send(&self, message: &RunnerMessage) -> Result<(), RunnerError> {
        let mut line = serde_json::to_vec(message).map_err(RunnerError::Encode)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[tower_lsp::async_trait]
impl<W> RunnerConnection for StreamRunner<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn request(
        &self,
        mut message: RunnerMessage,
        timeout: Duration,
    ) -> Result<RunnerMessage, RunnerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        message.set_message_id(id);

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(RunnerError::Disconnected);
            }
            pending.waiters.insert(id, tx);
        }
        let _guard = PendingGuard {
            id,
            pending: &self.pending,
        };

        self.send(&message).await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(RunnerError::Disconnected),
            Err(_) => Err(RunnerError::Timeout(timeout)),
        }
    }

    fn is_connected(&self) -> bool {
        !self.pending.lock().closed
    }
}

impl<W> Drop for StreamRunner<W> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Read replies until the stream ends, handing each to the request waiting
/// for its id.  Dropping the pending senders on exit wakes every waiter with
/// a disconnect.
async fn read_loop<R>(reader: R, pending: PendingMap)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(%err, "runner connection failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message: RunnerMessage = match serde_json::from_str(&line) {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(error = %RunnerError::Decode(err), "ignoring runner message");
                continue;
            }
        };

        let waiter = pending.lock().waiters.remove(&message.message_id());
        match waiter {
            Some(tx) => {
                // The requester may have timed out in the meantime.
                let _ = tx.send(message);
            }
            None => {
                tracing::debug!(id = message.message_id(), "no request waiting for runner reply");
            }
        }
    }
    {
        let mut pending = pending.lock();
        pending.closed = true;
        pending.waiters.clear();
    }
    tracing::info!("runner connection closed");
}
