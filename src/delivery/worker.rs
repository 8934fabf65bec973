//! Worker thread driving socket I/O.
//!
//! The worker is the only owner of the collector connection. Frames are
//! written in the order they were queued; a frame whose write fails is kept
//! and retried on the next connection, so delivery is at-least-once.

use std::{
    net::TcpStream,
    sync::Arc,
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, unbounded};
use log::{debug, warn};

use crate::rate_limited_warner::RateLimitedWarner;
use crate::reconnector::{ReconnectState, Reconnector};

use super::{
    config::DeliveryConfig,
    state::{ConnectionState, Shared},
    transport::{connect, write_frame},
};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub(super) enum Command {
    Frame(Vec<u8>),
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// Channels and join handle returned by [`spawn_worker`].
pub(super) struct WorkerHandle {
    pub(super) tx: Sender<Command>,
    /// Dropping this sender interrupts any backoff wait.
    pub(super) stop: Sender<()>,
    pub(super) join: thread::JoinHandle<()>,
}

#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Sent,
    Stopped,
}

pub(super) fn spawn_worker(
    config: DeliveryConfig,
    reconnector: Reconnector,
    connection: Option<TcpStream>,
    shared: Arc<Shared>,
) -> std::io::Result<WorkerHandle> {
    let (tx, rx) = unbounded();
    let (stop, stop_rx) = bounded(0);
    let worker = Worker {
        warner: RateLimitedWarner::new(config.warn_interval),
        config,
        rx,
        stop: stop_rx,
        shared,
        connection,
        reconnect: ReconnectState::new(reconnector),
    };
    let join = thread::Builder::new()
        .name("fluent-forwarder-delivery".into())
        .spawn(move || worker.run())?;
    Ok(WorkerHandle { tx, stop, join })
}

struct Worker {
    config: DeliveryConfig,
    rx: Receiver<Command>,
    stop: Receiver<()>,
    shared: Arc<Shared>,
    connection: Option<TcpStream>,
    reconnect: ReconnectState,
    warner: RateLimitedWarner,
}

impl Worker {
    fn run(mut self) {
        while let Ok(cmd) = self.rx.recv() {
            match cmd {
                Command::Frame(frame) => {
                    if self.deliver(frame) == Delivery::Stopped {
                        self.discard_pending();
                        break;
                    }
                }
                Command::Flush(ack) => {
                    self.flush_connection();
                    let _ = ack.send(());
                }
                Command::Shutdown(ack) => {
                    let _ = ack.send(());
                    break;
                }
            }
        }
        self.connection = None;
        self.shared.set_state(ConnectionState::Disconnected);
        self.warner.flush(|count| {
            warn!("failed to reach the collector {count} times before shutdown");
        });
    }

    fn deliver(&mut self, frame: Vec<u8>) -> Delivery {
        loop {
            let Some(conn) = self.connection.as_mut() else {
                if !self.reconnect() {
                    self.shared.budget.release(frame.len());
                    return Delivery::Stopped;
                }
                continue;
            };
            match write_frame(conn, &frame) {
                Ok(()) => {
                    self.shared.budget.release(frame.len());
                    return Delivery::Sent;
                }
                Err(err) => {
                    warn!(
                        "write to {}:{} failed: {err}; reconnecting",
                        self.config.host, self.config.port
                    );
                    self.connection = None;
                    self.shared.set_state(ConnectionState::Disconnected);
                }
            }
        }
    }

    /// Back off and reconnect until a connection is established or the client
    /// is closed. Returns `false` when stopped.
    fn reconnect(&mut self) -> bool {
        self.shared.set_state(ConnectionState::Disconnected);
        loop {
            if !self.reconnect.should_retry() || !self.wait(self.reconnect.next_delay()) {
                return false;
            }
            self.shared.set_state(ConnectionState::Connecting);
            match connect(
                &self.config.host,
                self.config.port,
                self.config.connect_timeout,
                self.config.write_timeout,
            ) {
                Ok(stream) => {
                    debug!(
                        "reconnected to {}:{} after {} failed attempts",
                        self.config.host,
                        self.config.port,
                        self.reconnect.attempts()
                    );
                    self.reconnect.record_success();
                    self.connection = Some(stream);
                    self.shared.set_state(ConnectionState::Connected);
                    return true;
                }
                Err(err) => {
                    self.reconnect.record_failure();
                    self.shared.set_state(ConnectionState::Disconnected);
                    self.warner.record_drop();
                    let (host, port) = (&self.config.host, self.config.port);
                    self.warner.warn_if_due(|count| {
                        warn!("unable to connect to {host}:{port}: {err}; {count} failed attempts");
                    });
                }
            }
        }
    }

    /// Sleep for `delay` unless the stop signal fires first.
    fn wait(&self, delay: Duration) -> bool {
        matches!(self.stop.recv_timeout(delay), Err(RecvTimeoutError::Timeout))
    }

    fn flush_connection(&mut self) {
        use std::io::Write;

        if let Some(conn) = self.connection.as_mut()
            && let Err(err) = conn.flush()
        {
            warn!("flush to collector failed: {err}");
            self.connection = None;
            self.shared.set_state(ConnectionState::Disconnected);
        }
    }

    /// Drop everything still queued after the client has been closed.
    fn discard_pending(&mut self) {
        let mut dropped = 0u64;
        loop {
            match self.rx.try_recv() {
                Ok(Command::Frame(frame)) => {
                    self.shared.budget.release(frame.len());
                    dropped += 1;
                }
                Ok(Command::Flush(_)) => {}
                Ok(Command::Shutdown(ack)) => {
                    let _ = ack.send(());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if dropped > 0 {
            warn!("discarded {dropped} undelivered records on shutdown");
        }
    }
}
