//! Inbound and outbound transfer implementations.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::contract::SizeContract;
use super::error::TransferError;
use super::message::{DownloadMessage, ObjectInfo};
use crate::blobstore::BlobStore;

/// Chunk size used when streaming an object out of the blob store.
pub const DOWNLOAD_CHUNK_SIZE: u64 = 32 * 1024;

/// How long an abort waits for the writer task to settle before giving up.
const ABORT_DRAIN: Duration = Duration::from_secs(5);

/// Tuning knobs for an inbound transfer.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// How long `finish` waits for the blob-store write after the last chunk.
    pub wait_budget: Duration,
    /// Capacity of the handoff buffer, in chunks.
    pub buffer_chunks: usize,
    /// Cancellation signal observed by the writer task. Cancelling it aborts
    /// the transfer; the pipeline derives a child token so its own
    /// cancellations never propagate back to the caller.
    pub cancel: CancellationToken,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            wait_budget: Duration::from_secs(30),
            buffer_chunks: 16,
            cancel: CancellationToken::new(),
        }
    }
}

/// Lifecycle of a transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting chunks from the caller.
    Receiving,
    /// Producer closed; waiting for the blob-store write to settle.
    Completing,
    /// Object durably written.
    Committed,
    /// Failed or cancelled; nothing visible in the store.
    Aborted,
}

/// An in-flight inbound transfer session.
///
/// Exactly one request owns a session; it never outlives the request. The
/// session is the producer side of a bounded handoff buffer whose consumer
/// is a concurrently spawned writer task draining into the blob store.
pub struct InboundTransfer {
    key: String,
    contract: SizeContract,
    state: SessionState,
    chunk_tx: Option<mpsc::Sender<Bytes>>,
    result_rx: Option<oneshot::Receiver<Result<u64, TransferError>>>,
    cancel: CancellationToken,
    wait_budget: Duration,
}

impl InboundTransfer {
    /// Begin an inbound transfer: allocate the handoff buffer and spawn the
    /// writer task that drains it into the blob store under `key`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `declared_size` is zero.
    pub fn begin(
        store: &BlobStore,
        key: impl Into<String>,
        content_type: impl Into<String>,
        declared_size: u64,
        options: TransferOptions,
    ) -> Result<Self, TransferError> {
        let contract = SizeContract::new(declared_size)?;
        let key = key.into();

        let (chunk_tx, chunk_rx) = mpsc::channel(options.buffer_chunks.max(1));
        let (result_tx, result_rx) = oneshot::channel();
        let cancel = options.cancel.child_token();

        let writer_store = store.clone();
        let writer_key = key.clone();
        let writer_cancel = cancel.clone();
        let content_type = content_type.into();
        tokio::spawn(async move {
            let result =
                run_writer(writer_store, writer_key, content_type, chunk_rx, writer_cancel).await;
            // The receiver may be gone if the session was dropped; the write
            // has already been cleaned up either way.
            let _ = result_tx.send(result);
        });

        Ok(Self {
            key,
            contract,
            state: SessionState::Receiving,
            chunk_tx: Some(chunk_tx),
            result_rx: Some(result_rx),
            cancel,
            wait_budget: options.wait_budget,
        })
    }

    /// Append one chunk to the producer side of the handoff buffer.
    ///
    /// The overflow check runs before the buffer write, so the buffer never
    /// carries more than the contract permits; a chunk that would cross the
    /// declared size is rejected wholesale. Empty chunks are no-ops. The call
    /// suspends only for buffer capacity (back-pressure).
    ///
    /// # Errors
    ///
    /// Returns `Overflow` past the declared size, or the writer task's error
    /// if it has already stopped.
    pub async fn feed_chunk(&mut self, bytes: Bytes) -> Result<(), TransferError> {
        if self.state != SessionState::Receiving {
            return Err(TransferError::validation("transfer session is closed"));
        }
        if bytes.is_empty() {
            return Ok(());
        }

        self.contract.accept(bytes.len() as u64)?;

        let Some(tx) = self.chunk_tx.as_ref() else {
            return Err(TransferError::validation("transfer session is closed"));
        };
        if tx.send(bytes).await.is_err() {
            // The writer stopped early; surface its captured error instead of
            // a generic send failure.
            self.state = SessionState::Aborted;
            self.chunk_tx = None;
            return Err(self.collect_writer_error().await);
        }

        Ok(())
    }

    /// Close the producer side and wait for the blob-store write to settle.
    ///
    /// Waits until the writer reports, the wait budget elapses, or the
    /// cancellation signal fires - whichever is first. Returns the number of
    /// bytes committed.
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` when fewer bytes than declared were fed,
    /// `Timeout` when the budget elapses, or the writer task's own error.
    pub async fn finish(mut self) -> Result<u64, TransferError> {
        // Close the producer exactly once; this is the writer's end-of-data.
        self.chunk_tx = None;

        if let Err(mismatch) = self.contract.close() {
            self.state = SessionState::Aborted;
            self.cancel.cancel();
            self.drain_writer().await;
            return Err(mismatch);
        }

        self.state = SessionState::Completing;
        let Some(result_rx) = self.result_rx.take() else {
            self.state = SessionState::Aborted;
            return Err(TransferError::WriterLost);
        };

        let cancelled = self.cancel.clone();
        tokio::select! {
            biased;
            outcome = timeout(self.wait_budget, result_rx) => match outcome {
                Ok(Ok(Ok(written))) => {
                    self.state = SessionState::Committed;
                    Ok(written)
                }
                Ok(Ok(Err(e))) => {
                    self.state = SessionState::Aborted;
                    Err(e)
                }
                // A panic in the writer drops the result sender; the caller
                // gets an error instead of blocking forever.
                Ok(Err(_)) => {
                    self.state = SessionState::Aborted;
                    Err(TransferError::WriterLost)
                }
                Err(_) => {
                    self.state = SessionState::Aborted;
                    self.cancel.cancel();
                    Err(TransferError::Timeout {
                        budget: self.wait_budget,
                    })
                }
            },
            // The writer observes the same token and cleans up on its own;
            // the session just stops waiting.
            () = cancelled.cancelled() => {
                self.state = SessionState::Aborted;
                Err(TransferError::Cancelled)
            }
        }
    }

    /// Abort the transfer: close the producer, signal the writer, and wait
    /// briefly for its cleanup so no partial object stays visible.
    pub async fn abort(mut self) {
        self.state = SessionState::Aborted;
        self.chunk_tx = None;
        self.cancel.cancel();
        self.drain_writer().await;
    }

    /// Bytes accepted so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.contract.received()
    }

    /// Declared total size.
    #[must_use]
    pub fn declared(&self) -> u64 {
        self.contract.declared()
    }

    /// Whether every declared byte has been fed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.contract.is_complete()
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Storage key this session writes to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Fetch the error the writer task reported, if any.
    async fn collect_writer_error(&mut self) -> TransferError {
        let Some(result_rx) = self.result_rx.take() else {
            return TransferError::WriterLost;
        };
        match timeout(ABORT_DRAIN, result_rx).await {
            Ok(Ok(Err(e))) => e,
            Ok(Ok(Ok(_)) | Err(_)) | Err(_) => TransferError::WriterLost,
        }
    }

    /// Wait briefly for the writer to settle after a cancellation so its
    /// cleanup has run before the session reports back.
    async fn drain_writer(&mut self) {
        if let Some(result_rx) = self.result_rx.take() {
            match timeout(ABORT_DRAIN, result_rx).await {
                Ok(Ok(result)) => {
                    debug!(key = %self.key, result = ?result.err(), "writer settled after abort");
                }
                Ok(Err(_)) => debug!(key = %self.key, "writer task gone after abort"),
                Err(_) => debug!(key = %self.key, "writer did not settle within abort drain"),
            }
        }
    }
}

impl Drop for InboundTransfer {
    fn drop(&mut self) {
        // A session dropped mid-flight must not leak its writer.
        self.chunk_tx = None;
        if self.state != SessionState::Committed {
            self.cancel.cancel();
        }
    }
}

/// Writer task: drain the handoff buffer into the blob store.
///
/// Errors never cross the task boundary directly - the spawner receives them
/// through the session's result channel. On every failure path the partially
/// written object is discarded.
async fn run_writer(
    store: BlobStore,
    key: String,
    content_type: String,
    mut chunks: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
) -> Result<u64, TransferError> {
    let mut writer = match store.writer(&key, &content_type).await {
        Ok(writer) => writer,
        Err(e) => return Err(TransferError::Store(e)),
    };

    let mut written: u64 = 0;
    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                drop(writer);
                store.discard(&key).await;
                return Err(TransferError::Cancelled);
            }
            chunk = chunks.recv() => chunk,
        };

        match chunk {
            Some(bytes) => {
                written += bytes.len() as u64;
                if let Err(e) = writer.write(bytes).await {
                    drop(writer);
                    store.discard(&key).await;
                    return Err(TransferError::Store(e.into()));
                }
            }
            // Producer closed: commit the object.
            None => {
                return match writer.close().await {
                    Ok(_) => Ok(written),
                    Err(e) => {
                        store.discard(&key).await;
                        Err(TransferError::Store(e.into()))
                    }
                };
            }
        }
    }
}

/// Receiver of outbound download messages.
pub trait ChunkSink: Send {
    /// Deliver one outbound message, in order.
    fn deliver(
        &mut self,
        message: DownloadMessage,
    ) -> impl Future<Output = Result<(), TransferError>> + Send;
}

impl ChunkSink for mpsc::Sender<DownloadMessage> {
    async fn deliver(&mut self, message: DownloadMessage) -> Result<(), TransferError> {
        self.send(message)
            .await
            .map_err(|_| TransferError::Cancelled)
    }
}

/// Stream an object out of the blob store: the info record first, then
/// fixed-size chunks in blob order.
///
/// A read error mid-stream aborts the remaining transfer; chunks already
/// delivered to the sink stand, so the reader-side contract is "stream
/// terminates early on error", not "stream is atomic".
///
/// # Errors
///
/// Returns `NotFound` for a missing object, `Cancelled` when the sink stops
/// accepting, or a wrapped store error.
pub async fn stream_outbound<S: ChunkSink>(
    store: &BlobStore,
    key: &str,
    info: ObjectInfo,
    sink: &mut S,
) -> Result<u64, TransferError> {
    let total = info.size;
    sink.deliver(DownloadMessage::Info(info)).await?;

    let mut offset: u64 = 0;
    while offset < total {
        let end = (offset + DOWNLOAD_CHUNK_SIZE).min(total);
        let bytes = store
            .read_range(key, offset..end)
            .await
            .map_err(|e| TransferError::from_blob(e, key))?;
        sink.deliver(DownloadMessage::Chunk(bytes)).await?;
        offset = end;
    }

    Ok(total)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
