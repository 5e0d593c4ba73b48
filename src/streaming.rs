//! Forward-only chunk streams for in-progress textual results.
//!
//! A [`Streamable`] is the value a stream component produces instead of a
//! final string: an async sequence of text chunks, consumed at most once.
//! Ownership enforces the forward-only contract: draining or iterating takes
//! the stream (or a mutable borrow), so replay is impossible by construction.
//! Dropping a `Streamable` drops the producer side with it, which is the
//! supported early-exit path: producers backed by [`Streamable::channel`]
//! observe the disconnect on their next send.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::StreamError;

/// An in-progress textual result: an async, forward-only sequence of string
/// chunks.
///
/// Implements [`Stream`] with `Item = Result<String, StreamError>`, so it can
/// be consumed with `futures_util::StreamExt` combinators or via
/// [`next_chunk`](Streamable::next_chunk)/[`collect_text`](Streamable::collect_text).
pub struct Streamable {
    inner: BoxStream<'static, Result<String, StreamError>>,
}

impl Streamable {
    /// Wrap an arbitrary chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<String, StreamError>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Build a stream from pre-materialized chunks (mainly for tests and
    /// fallback paths).
    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let items: Vec<Result<String, StreamError>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::from_stream(stream::iter(items))
    }

    /// Create a producer/consumer pair backed by an unbounded channel.
    ///
    /// The producer pushes chunks through the [`StreamSender`]; dropping the
    /// consumer disconnects the channel so the producer can release its
    /// resources on the next send attempt.
    pub fn channel() -> (StreamSender, Streamable) {
        let (tx, rx) = flume::unbounded();
        (StreamSender { tx }, Self::from_stream(rx.into_stream()))
    }

    /// Pull the next chunk, or `None` once the sequence is exhausted.
    pub async fn next_chunk(&mut self) -> Option<Result<String, StreamError>> {
        self.inner.next().await
    }

    /// Drain the remaining chunks into one string, concatenated in emission
    /// order. The first mid-stream error terminates the drain.
    pub async fn collect_text(mut self) -> Result<String, StreamError> {
        let mut out = String::new();
        while let Some(chunk) = self.inner.next().await {
            out.push_str(&chunk?);
        }
        Ok(out)
    }
}

impl Stream for Streamable {
    type Item = Result<String, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for Streamable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Streamable { .. }")
    }
}

/// Producer handle for a channel-backed [`Streamable`].
#[derive(Clone)]
pub struct StreamSender {
    tx: flume::Sender<Result<String, StreamError>>,
}

impl StreamSender {
    /// Push one chunk. Fails with [`StreamError::Disconnected`] once the
    /// consumer has been dropped, the producer's cue to clean up.
    pub fn send(&self, chunk: impl Into<String>) -> Result<(), StreamError> {
        self.tx
            .send(Ok(chunk.into()))
            .map_err(|_| StreamError::Disconnected)
    }

    /// Terminate the sequence abnormally. Chunks already delivered stand.
    pub fn fail(&self, error: StreamError) -> Result<(), StreamError> {
        self.tx
            .send(Err(error))
            .map_err(|_| StreamError::Disconnected)
    }

    /// True once the consumer side has been dropped.
    pub fn is_disconnected(&self) -> bool {
        self.tx.is_disconnected()
    }
}
