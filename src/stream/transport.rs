//! Transport adapters feeding the reconciliation engine.
//!
//! The engine only assumes an ordered sequence of byte chunks with a clean
//! close, a failure, or a cancellation. Everything transport-specific,
//! including the stall timeout, lives behind [`StreamTransport`] so the
//! engine itself stays free of I/O concerns.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

/// Why a transport stopped producing chunks.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("stream read failed: {0}")]
    Read(String),
    #[error("stream stalled: no data received for {0:?}")]
    Stalled(Duration),
}

/// Ordered chunk source for one streaming session.
///
/// `Ok(None)` is the natural end of stream; any `Err` tears the session
/// down. Chunks arrive in order, with arbitrary boundaries.
pub trait StreamTransport: Send {
    fn next_chunk(
        &mut self,
    ) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// HTTP response body adapter. Applies the per-chunk stall timeout here so
/// the engine does not carry timing policy.
pub struct HttpStreamTransport {
    inner: ByteStream,
    stall_timeout: Duration,
}

impl std::fmt::Debug for HttpStreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamTransport")
            .field("stall_timeout", &self.stall_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpStreamTransport {
    #[must_use]
    pub fn new(response: reqwest::Response, stall_timeout: Duration) -> Self {
        Self {
            inner: Box::pin(response.bytes_stream()),
            stall_timeout,
        }
    }
}

impl StreamTransport for HttpStreamTransport {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        match tokio::time::timeout(self.stall_timeout, self.inner.next()).await {
            Err(_) => Err(TransportError::Stalled(self.stall_timeout)),
            Ok(None) => Ok(None),
            Ok(Some(Ok(chunk))) => Ok(Some(chunk)),
            Ok(Some(Err(err))) => Err(TransportError::Read(err.to_string())),
        }
    }
}

/// How a [`ReplayTransport`] behaves once its scripted chunks run out.
#[derive(Debug, Clone)]
pub enum ReplayEnding {
    /// Clean close, like a server finishing its response.
    Close,
    /// Transport failure with the given message.
    Error(String),
    /// Never resolves; exercises cancellation paths.
    Hang,
}

/// In-memory transport that replays a fixed chunk sequence. Used by tests
/// and for re-driving a captured stream offline.
pub struct ReplayTransport {
    chunks: VecDeque<Bytes>,
    ending: ReplayEnding,
}

impl ReplayTransport {
    fn new<I, B>(chunks: I, ending: ReplayEnding) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ending,
        }
    }

    /// Replay `chunks`, then close cleanly.
    pub fn closing<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::new(chunks, ReplayEnding::Close)
    }

    /// Replay `chunks`, then fail with `error`.
    pub fn erroring<I, B>(chunks: I, error: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::new(chunks, ReplayEnding::Error(error.into()))
    }

    /// Replay `chunks`, then block forever.
    pub fn hanging<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::new(chunks, ReplayEnding::Hang)
    }
}

impl StreamTransport for ReplayTransport {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }
        match &self.ending {
            ReplayEnding::Close => Ok(None),
            ReplayEnding::Error(message) => Err(TransportError::Read(message.clone())),
            ReplayEnding::Hang => {
                futures_util::future::pending::<Result<Option<Bytes>, TransportError>>().await
            }
        }
    }
}
