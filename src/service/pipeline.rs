// Per-request streaming pipeline
//
// object store body -> SyncIoBridge -> BlockWalker -> ChannelSink -> response body
//
// The walker runs on a blocking thread. The response is committed when the first
// chunk leaves the sink; until then a failure is handed back to the handler so it
// can still answer with an error status. After that, failures can only cut the
// body short.

use std::io::{self, ErrorKind, Write};

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};
use tokio_util::io::{StreamReader, SyncIoBridge};

use crate::catalog::Track;
use crate::error::{Error, Result};
use crate::flac::{BlockWalker, RewritePlan};
use crate::service::Relay;

/// Bytes collected before a chunk is handed to the response body
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks in flight between the walker and the client
pub const CHANNEL_DEPTH: usize = 8;

type Chunk = io::Result<Bytes>;

/// Blocking `Write` adapter feeding a bounded channel.
///
/// A full channel blocks the writer, so a slow client slows down the upstream read.
/// The first chunk sent commits the response through `started`.
pub struct ChannelSink {
    tx: mpsc::Sender<Chunk>,
    buffer: BytesMut,
    started: Option<oneshot::Sender<Result<()>>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Chunk>, started: oneshot::Sender<Result<()>>) -> Self {
        ChannelSink {
            tx,
            buffer: BytesMut::with_capacity(CHUNK_SIZE),
            started: Some(started),
        }
    }

    /// Whether any chunk has been handed to the response body
    pub fn is_committed(&self) -> bool {
        self.started.is_none()
    }

    /// Whether the response body has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Report a failure that happened before the response was committed.
    ///
    /// Gives the error back if the response is already on its way.
    pub fn reject(&mut self, error: Error) -> std::result::Result<(), Error> {
        match self.started.take() {
            Some(started) => {
                let _ = started.send(Err(error));
                Ok(())
            }
            None => Err(error),
        }
    }

    /// Cut a committed response short
    pub fn abort(&self, error: &Error) {
        // An error item makes the server drop the connection instead of ending the body cleanly
        let _ = self.tx.blocking_send(Err(io::Error::other(error.to_string())));
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        if let Some(started) = self.started.take() {
            if started.send(Ok(())).is_err() {
                return Err(io::Error::new(ErrorKind::BrokenPipe, "request was dropped"));
            }
        }
        let chunk = self.buffer.split().freeze();
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(ErrorKind::BrokenPipe, "response body was dropped"))
    }
}

impl Write for ChannelSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

/// A track whose rewritten bytes are ready to be streamed
pub struct TrackStream {
    pub track: Track,
    pub body: Body,
}

impl Relay {
    /// Look the track up, start fetching it and start rewriting it.
    ///
    /// Errors returned here happen before any byte reached the client.
    pub async fn open(&self, track_id: &str) -> Result<TrackStream> {
        let track = self.catalog.lookup(track_id).await?;
        let plan = RewritePlan::from_track(&track);

        let response = self.store.fetch(&track.holding_id, &track.file_path).await?;

        let (tx, mut rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);
        let (started_tx, started_rx) = oneshot::channel();

        // Stop reading upstream as soon as nobody is left to receive the output
        let receiver_gone = tx.clone();
        let upstream = response
            .bytes_stream()
            .map_err(io::Error::other)
            .take_until(async move { receiver_gone.closed().await });
        let source = StreamReader::new(Box::pin(upstream));

        let label = track_id.to_string();
        tokio::task::spawn_blocking(move || relay_blocking(source, tx, plan, started_tx, &label));

        match started_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(Error::Source(io::Error::other(
                    "rewrite task ended before producing output",
                )))
            }
        }

        let body = Body::from_stream(futures::stream::poll_fn(move |cx| rx.poll_recv(cx)));
        Ok(TrackStream { track, body })
    }
}

fn relay_blocking<S>(
    source: S,
    tx: mpsc::Sender<Chunk>,
    plan: RewritePlan,
    started: oneshot::Sender<Result<()>>,
    track_id: &str,
) where
    S: AsyncRead + Unpin,
{
    let reader = SyncIoBridge::new(source);
    let mut walker = BlockWalker::new(reader, ChannelSink::new(tx, started), plan);
    let result = walker.run();
    let mut sink = walker.into_writer();

    let error = match result {
        Ok(summary) => {
            log::info!(
                "{}: sent {} metadata blocks and {} audio bytes (comments rewritten: {:?}, synthesized: {}, padding: {:?})",
                track_id,
                summary.metadata_blocks,
                summary.audio_bytes,
                summary.tags_rewritten,
                summary.tags_synthesized,
                summary.padding_adjusted
            );
            return;
        }
        Err(e) => e,
    };

    match sink.reject(error) {
        Ok(()) => {}
        Err(e) if sink.is_closed() || !e.is_source_side() => {
            log::warn!("{}: client went away: {}", track_id, e)
        }
        Err(e) => {
            log::error!("{}: aborting response mid-stream: {}", track_id, e);
            sink.abort(&e);
        }
    }
}
