//! Public client type owning the worker thread.

use std::{
    sync::Arc,
    thread,
    time::{Duration, SystemTime},
};

use crossbeam_channel::{Sender, TrySendError, bounded};
use log::{debug, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::rate_limited_warner::RateLimitedWarner;
use crate::reconnector::Reconnector;
use crate::record::LogRecord;

use super::{
    codec::{effective_tag, encode_entry},
    config::DeliveryConfig,
    state::{ConnectionState, Shared},
    transport::connect,
    worker::{Command, spawn_worker},
};

/// Reasons a record was not queued.
#[derive(Debug, Error)]
pub enum SendError {
    /// The outbound buffer has no room for the record; it was dropped.
    #[error("outbound buffer is full")]
    BufferFull,
    /// The client has been closed.
    #[error("delivery client is closed")]
    Closed,
    /// The record could not be encoded; it was dropped.
    #[error("failed to encode record: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// Non-blocking sender of records to a collector.
///
/// Construction attempts one connection synchronously. The client is returned
/// even if that attempt fails; the worker then keeps retrying whenever there
/// is something to deliver.
pub struct DeliveryClient {
    tx: Option<Sender<Command>>,
    stop: Option<Sender<()>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    shared: Arc<Shared>,
    tag_prefix: String,
    flush_timeout: Duration,
    warner: RateLimitedWarner,
}

impl DeliveryClient {
    /// Connect to the collector described by `config` and start the worker.
    pub fn new(config: DeliveryConfig, reconnector: Reconnector) -> Self {
        let shared = Arc::new(Shared::new(config.buffer_capacity));
        shared.set_state(ConnectionState::Connecting);
        let connection = match connect(
            &config.host,
            config.port,
            config.connect_timeout,
            config.write_timeout,
        ) {
            Ok(stream) => {
                debug!("connected to collector at {}:{}", config.host, config.port);
                shared.set_state(ConnectionState::Connected);
                Some(stream)
            }
            Err(err) => {
                warn!(
                    "initial connection to {}:{} failed: {err}",
                    config.host, config.port
                );
                shared.set_state(ConnectionState::Disconnected);
                None
            }
        };

        let tag_prefix = config.tag_prefix.clone();
        let flush_timeout = config.flush_timeout;
        let warner = RateLimitedWarner::new(config.warn_interval);
        let (tx, stop, handle) =
            match spawn_worker(config, reconnector, connection, Arc::clone(&shared)) {
                Ok(worker) => (Some(worker.tx), Some(worker.stop), Some(worker.join)),
                Err(err) => {
                    warn!("failed to start the delivery worker: {err}");
                    shared.set_state(ConnectionState::Closed);
                    (None, None, None)
                }
            };
        Self {
            tx,
            stop,
            handle: Mutex::new(handle),
            shared,
            tag_prefix,
            flush_timeout,
            warner,
        }
    }

    /// Encode `record` under the effective tag, stamped with the current
    /// time, and queue it for delivery.
    ///
    /// Never blocks on the network. When the buffer is full the incoming
    /// record is dropped and [`SendError::BufferFull`] is returned.
    pub fn send(&self, tag: &str, record: &LogRecord) -> Result<(), SendError> {
        self.send_at(tag, SystemTime::now(), record)
    }

    /// Like [`send`](Self::send), stamping the entry with `time`.
    pub fn send_at(
        &self,
        tag: &str,
        time: SystemTime,
        record: &LogRecord,
    ) -> Result<(), SendError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(SendError::Closed);
        };
        let tag = effective_tag(&self.tag_prefix, tag);
        let frame = encode_entry(&tag, time, record)?;
        let len = frame.len();
        if !self.shared.budget.try_reserve(len) {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                warn!("outbound buffer full; dropped {count} records");
            });
            return Err(SendError::BufferFull);
        }
        match tx.try_send(Command::Frame(frame)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.shared.budget.release(len);
                Err(SendError::Closed)
            }
        }
    }

    /// Wait until everything queued so far has been written, or until the
    /// flush timeout elapses. Returns `true` when the worker caught up.
    pub fn flush(&self) -> bool {
        let Some(handle) = self.flush_handle() else {
            return false;
        };
        self.warner.flush(|count| {
            warn!("outbound buffer full; dropped {count} records");
        });
        handle.wait()
    }

    /// Detached handle for waiting on the worker without borrowing the
    /// client. `None` once the client is closed.
    pub(crate) fn flush_handle(&self) -> Option<FlushHandle> {
        self.tx.as_ref().map(|tx| FlushHandle {
            tx: tx.clone(),
            timeout: self.flush_timeout,
        })
    }

    /// Flush, stop the worker and release the connection. Idempotent.
    ///
    /// A pending backoff wait is cut short, but a connect attempt already in
    /// progress is not: in the worst case `close` returns after the flush
    /// timeout plus the connect timeout for each address the host resolves
    /// to.
    pub fn close(&mut self) {
        if self.tx.is_some() && !self.flush() {
            debug!(
                "flush timed out with {} bytes pending; closing anyway",
                self.pending_bytes()
            );
        }
        self.request_shutdown();
        self.join_worker();
        self.shared.set_state(ConnectionState::Closed);
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Encoded bytes queued but not yet written.
    pub fn pending_bytes(&self) -> usize {
        self.shared.budget.used()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.shared.budget.capacity()
    }

    fn request_shutdown(&mut self) {
        // Dropping the stop sender cuts any backoff wait short.
        drop(self.stop.take());
        let Some(tx) = self.tx.take() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(Command::Shutdown(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.recv_timeout(self.flush_timeout);
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("delivery worker thread panicked");
        }
    }
}

/// Waits for the worker to write everything queued before the call.
#[derive(Clone, Debug)]
pub(crate) struct FlushHandle {
    tx: Sender<Command>,
    timeout: Duration,
}

impl FlushHandle {
    /// Returns `true` when the worker caught up within the flush timeout.
    pub(crate) fn wait(&self) -> bool {
        let (ack_tx, ack_rx) = bounded(1);
        if self.tx.send(Command::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv_timeout(self.timeout).is_ok()
    }
}

impl Drop for DeliveryClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DeliveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryClient")
            .field("state", &self.state())
            .field("tag_prefix", &self.tag_prefix)
            .field("pending_bytes", &self.pending_bytes())
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}
