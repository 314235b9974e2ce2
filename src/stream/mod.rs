//! Streaming reconciliation engine.
//!
//! Turns the agent backend's chunked plain-text byte stream back into an
//! ordered sequence of user-visible content and tool-call lifecycle
//! updates, withholding any content whose accuracy still depends on a tool
//! call in flight. The pipeline is strictly sequential per session:
//! bytes → decoded text → classified events → tool state + buffered or
//! forwarded content → handler callbacks.

pub mod buffer;
pub mod decoder;
pub mod scanner;
pub mod session;
pub mod tool_state;
pub mod transport;

pub use scanner::{IterationKind, ScanEvent};
pub use session::{SessionReport, SessionSlot, StreamSession, run_session};
pub use tool_state::{SYNTHETIC_COMPLETION_RESULT, ToolCall, ToolStatus};
pub use transport::{HttpStreamTransport, ReplayTransport, StreamTransport, TransportError};

use crate::logging;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Natural end of stream; everything safe was delivered.
    Completed,
    /// Cancelled by the user; withheld content was dropped.
    Cancelled,
    /// Transport failure; withheld content was dropped.
    Failed,
}

/// Consumer callbacks for one session.
///
/// `on_content` is append-only and in stream order. `on_tool_call` is an
/// idempotent upsert keyed by the call's id; the same call is re-sent on
/// every status change. Exactly one `on_complete` ends every session.
pub trait StreamHandler {
    fn on_content(&mut self, text: &str);
    fn on_tool_call(&mut self, call: &ToolCall);
    fn on_error(&mut self, message: &str);
    fn on_complete(&mut self, outcome: SessionOutcome);
}

/// Observability hook invoked by the session at its lifecycle points.
///
/// The engine's control flow stays free of logging concerns; everything it
/// wants to say goes through here. All methods default to no-ops.
pub trait StreamObserver {
    fn chunk_received(&self, _session_id: &str, _bytes: usize) {}
    fn event_classified(&self, _session_id: &str, _event: &ScanEvent) {}
    fn tool_transition(&self, _session_id: &str, _call: &ToolCall) {}
    fn content_flushed(&self, _session_id: &str, _fragments: usize, _bytes: usize) {}
    fn protocol_warning(&self, _session_id: &str, _message: &str) {}
    fn session_cancelled(&self, _session_id: &str, _dropped_fragments: usize) {}
    fn stream_error(&self, _session_id: &str, _message: &str) {}
}

/// Observer that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StreamObserver for NullObserver {}

/// Observer that forwards lifecycle points to the application log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StreamObserver for LogObserver {
    fn chunk_received(&self, session_id: &str, bytes: usize) {
        logging::debug(format!("[{session_id}] chunk received: {bytes} bytes"));
    }

    fn event_classified(&self, session_id: &str, event: &ScanEvent) {
        match event {
            ScanEvent::Content(text) => {
                logging::debug(format!("[{session_id}] content: {} bytes", text.len()));
            }
            ScanEvent::ToolStart { name, .. } => {
                logging::info(format!("[{session_id}] tool start: {name}"));
            }
            ScanEvent::ToolResult(_) => {
                logging::info(format!("[{session_id}] tool result"));
            }
            ScanEvent::ToolError(error) => {
                logging::warn(format!("[{session_id}] tool error: {error}"));
            }
            ScanEvent::Iteration(kind) => {
                logging::debug(format!("[{session_id}] iteration marker: {kind:?}"));
            }
        }
    }

    fn tool_transition(&self, session_id: &str, call: &ToolCall) {
        logging::info(format!(
            "[{session_id}] tool '{}' -> {:?} (id {})",
            call.name, call.status, call.id
        ));
    }

    fn content_flushed(&self, session_id: &str, fragments: usize, bytes: usize) {
        logging::debug(format!(
            "[{session_id}] flushed {fragments} fragment(s), {bytes} bytes"
        ));
    }

    fn protocol_warning(&self, session_id: &str, message: &str) {
        logging::warn(format!("[{session_id}] {message}"));
    }

    fn session_cancelled(&self, session_id: &str, dropped_fragments: usize) {
        logging::info(format!(
            "[{session_id}] cancelled; dropped {dropped_fragments} withheld fragment(s)"
        ));
    }

    fn stream_error(&self, session_id: &str, message: &str) {
        logging::error(format!("[{session_id}] stream error: {message}"));
    }
}
