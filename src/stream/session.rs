//! Session coordinator: one user turn, one byte stream, one pass.
//!
//! [`StreamSession`] owns the sequential pipeline (decode → scan → tool
//! state + buffering) and all of its mutable state; [`run_session`] drives
//! it from a transport, suspending only between chunks. Cancellation is
//! cooperative: the token is checked between chunk reads and before every
//! callback, and a cancelled session delivers nothing beyond its terminal
//! notification; buffered content is deliberately dropped, since the user
//! no longer wants the answer.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::buffer::ContentBuffer;
use super::decoder::Utf8StreamDecoder;
use super::scanner::{MarkerScanner, ScanEvent};
use super::tool_state::{ToolCall, ToolCallTracker};
use super::transport::StreamTransport;
use super::{SessionOutcome, StreamHandler, StreamObserver};

/// Sequential reconciliation pipeline for one streaming session.
///
/// All processing is synchronous and deterministic over the byte sequence:
/// feeding the same bytes with different chunk boundaries produces the same
/// callback sequence.
pub struct StreamSession {
    id: String,
    decoder: Utf8StreamDecoder,
    scanner: MarkerScanner,
    tools: ToolCallTracker,
    buffer: ContentBuffer,
    cancel: CancellationToken,
    finished: bool,
}

impl StreamSession {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            decoder: Utf8StreamDecoder::new(),
            scanner: MarkerScanner::new(),
            tools: ToolCallTracker::new(),
            buffer: ContentBuffer::new(),
            cancel,
            finished: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Tool calls observed so far, in start order.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tools.calls()
    }

    /// Fully process one chunk: decode, classify, and apply every settled
    /// event before returning.
    pub fn process_chunk(
        &mut self,
        chunk: &[u8],
        handler: &mut dyn StreamHandler,
        observer: &dyn StreamObserver,
    ) {
        if self.finished || self.cancel.is_cancelled() {
            return;
        }
        observer.chunk_received(&self.id, chunk.len());

        let text = self.decoder.feed(chunk);
        if text.is_empty() {
            return;
        }
        let events = self.scanner.push(&text);
        self.apply_events(events, handler, observer);
    }

    /// Natural end of stream: flush the decoder, release the scanner's
    /// residue as content, force-complete open tool calls, perform the
    /// mandatory final flush, then report completion.
    pub fn finalize(&mut self, handler: &mut dyn StreamHandler, observer: &dyn StreamObserver) {
        if self.finished {
            return;
        }

        let tail = self.decoder.finish();
        let mut events = self.scanner.push(&tail);
        events.extend(self.scanner.finish());
        self.apply_events(events, handler, observer);

        for snapshot in self.tools.finalize_open() {
            observer.tool_transition(&self.id, &snapshot);
            if !self.cancel.is_cancelled() {
                handler.on_tool_call(&snapshot);
            }
        }
        self.refresh_block(handler, observer);

        self.finished = true;
        handler.on_complete(SessionOutcome::Completed);
    }

    /// Cancel the session. Idempotent; suppresses every further delivery
    /// except the terminal notification and drops withheld content.
    pub fn cancel(&mut self, handler: &mut dyn StreamHandler, observer: &dyn StreamObserver) {
        if self.finished {
            return;
        }
        self.cancel.cancel();

        for snapshot in self.tools.finalize_open() {
            observer.tool_transition(&self.id, &snapshot);
        }
        let dropped = self.buffer.discard();
        observer.session_cancelled(&self.id, dropped);

        self.finished = true;
        handler.on_complete(SessionOutcome::Cancelled);
    }

    /// Transport failure: tear the session down. Open tool calls are closed
    /// out so none stays visually in progress, but withheld content stays
    /// withheld: it was never confirmed safe.
    pub fn fail(
        &mut self,
        message: &str,
        handler: &mut dyn StreamHandler,
        observer: &dyn StreamObserver,
    ) {
        if self.finished {
            return;
        }
        observer.stream_error(&self.id, message);

        for snapshot in self.tools.finalize_open() {
            observer.tool_transition(&self.id, &snapshot);
            if !self.cancel.is_cancelled() {
                handler.on_tool_call(&snapshot);
            }
        }
        self.buffer.discard();

        self.finished = true;
        handler.on_error(message);
        handler.on_complete(SessionOutcome::Failed);
    }

    fn apply_events(
        &mut self,
        events: Vec<ScanEvent>,
        handler: &mut dyn StreamHandler,
        observer: &dyn StreamObserver,
    ) {
        for event in events {
            if self.cancel.is_cancelled() {
                return;
            }
            observer.event_classified(&self.id, &event);
            match event {
                ScanEvent::Content(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    let ready = self.buffer.accept(text);
                    self.deliver(ready, handler, observer);
                }
                ScanEvent::ToolStart { name, params } => {
                    let snapshot = self.tools.start(name, params);
                    observer.tool_transition(&self.id, &snapshot);
                    handler.on_tool_call(&snapshot);
                    self.buffer.set_blocked(true);
                }
                ScanEvent::ToolResult(result) => match self.tools.resolve_success(result) {
                    Some(snapshot) => {
                        observer.tool_transition(&self.id, &snapshot);
                        handler.on_tool_call(&snapshot);
                        self.refresh_block(handler, observer);
                    }
                    None => {
                        observer.protocol_warning(&self.id, "result marker with no open tool call");
                    }
                },
                ScanEvent::ToolError(error) => match self.tools.resolve_error(error) {
                    Some(snapshot) => {
                        observer.tool_transition(&self.id, &snapshot);
                        handler.on_tool_call(&snapshot);
                        self.refresh_block(handler, observer);
                    }
                    None => {
                        observer.protocol_warning(&self.id, "error marker with no open tool call");
                    }
                },
                ScanEvent::Iteration(_) => {
                    self.refresh_block(handler, observer);
                }
            }
        }
    }

    /// Re-derive the block flag from the tool set and deliver whatever a
    /// blocked→unblocked transition released.
    fn refresh_block(&mut self, handler: &mut dyn StreamHandler, observer: &dyn StreamObserver) {
        let backlog = self.buffer.set_blocked(self.tools.any_executing());
        self.deliver(backlog, handler, observer);
    }

    fn deliver(
        &mut self,
        fragments: Vec<String>,
        handler: &mut dyn StreamHandler,
        observer: &dyn StreamObserver,
    ) {
        if fragments.is_empty() {
            return;
        }
        let bytes = fragments.iter().map(String::len).sum();
        for fragment in &fragments {
            if self.cancel.is_cancelled() {
                return;
            }
            handler.on_content(fragment);
        }
        observer.content_flushed(&self.id, fragments.len(), bytes);
    }
}

/// Outcome summary returned by [`run_session`].
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: String,
    pub outcome: SessionOutcome,
    pub tool_calls: Vec<ToolCall>,
}

/// Drive a session from a transport until it closes, fails, or the token
/// cancels. Each chunk is fully applied before the next is read.
pub async fn run_session<T: StreamTransport>(
    mut transport: T,
    handler: &mut dyn StreamHandler,
    observer: &dyn StreamObserver,
    cancel: CancellationToken,
) -> SessionReport {
    let mut session = StreamSession::new(cancel.clone());

    let outcome = loop {
        if cancel.is_cancelled() {
            session.cancel(handler, observer);
            break SessionOutcome::Cancelled;
        }
        tokio::select! {
            () = cancel.cancelled() => {
                session.cancel(handler, observer);
                break SessionOutcome::Cancelled;
            }
            chunk = transport.next_chunk() => match chunk {
                Ok(Some(bytes)) => session.process_chunk(&bytes, handler, observer),
                Ok(None) => {
                    session.finalize(handler, observer);
                    break SessionOutcome::Completed;
                }
                Err(err) => {
                    session.fail(&err.to_string(), handler, observer);
                    break SessionOutcome::Failed;
                }
            },
        }
    };

    SessionReport {
        session_id: session.id().to_string(),
        outcome,
        tool_calls: session.tool_calls().to_vec(),
    }
}

/// Conversation-level gate: at most one session may be in flight, and a new
/// one may only start once the previous one was cancelled or finished.
#[derive(Debug, Default)]
pub struct SessionSlot {
    active: Option<CancellationToken>,
}

impl SessionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a new session, handing back its cancellation
    /// token. Fails while an uncancelled session holds the slot.
    pub fn begin(&mut self) -> anyhow::Result<CancellationToken> {
        if let Some(prev) = &self.active {
            if !prev.is_cancelled() {
                anyhow::bail!("a streaming session is already active; cancel it first");
            }
        }
        let token = CancellationToken::new();
        self.active = Some(token.clone());
        Ok(token)
    }

    /// Release the slot after the session reached a terminal state.
    pub fn end(&mut self) {
        self.active = None;
    }

    /// Cancel the in-flight session, if any. Safe to call repeatedly.
    pub fn cancel_active(&self) {
        if let Some(token) = &self.active {
            token.cancel();
        }
    }
}
