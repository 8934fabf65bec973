//! Forwarder appender: configuration, validation and lifecycle.
//!
//! [`ForwarderAppender`] moves through `Uninitialized → Activating → Active →
//! Closed`. Activation validates the configuration before touching the
//! network, then builds a [`DeliveryClient`]. If the collector cannot be
//! reached at that point the appender still becomes active but holds no
//! client, and every [`append`](ForwarderAppender::append) is a no-op that
//! reports a rate-limited diagnostic. Nothing here panics or returns an error
//! into the caller's logging path.

mod config;
mod error;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::delivery::{DeliveryClient, SendError};
use crate::event::LoggingEvent;
use crate::rate_limited_warner::RateLimitedWarner;
use crate::reconnector::Reconnector;
use crate::record_builder::RecordBuilder;

pub use config::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_TIMEOUT_MS, DEFAULT_TAG, DEFAULT_TIMEOUT_MS,
    ForwarderConfig, OPT_ADD_HOSTNAME, OPT_BUFFER_CAPACITY, OPT_CONSTANT_RECONNECTOR,
    OPT_FLUSH_TIMEOUT, OPT_HOST, OPT_MDC_KEYS, OPT_PORT, OPT_TAG, OPT_TAG_PREFIX, OPT_TIMEOUT,
};
pub use error::{ActivationError, ConfigError};

/// Externally visible lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppenderState {
    Uninitialized,
    Activating,
    Active,
    Closed,
}

#[derive(Debug)]
struct ActiveForwarder {
    config: ForwarderConfig,
    builder: RecordBuilder,
    client: Option<DeliveryClient>,
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Activating,
    Active(Box<ActiveForwarder>),
    Closed,
}

/// Converts events into records and forwards them to a collector.
#[derive(Debug)]
pub struct ForwarderAppender {
    lifecycle: RwLock<Lifecycle>,
    warner: RateLimitedWarner,
}

impl Default for ForwarderAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwarderAppender {
    pub fn new() -> Self {
        Self {
            lifecycle: RwLock::new(Lifecycle::Uninitialized),
            warner: RateLimitedWarner::default(),
        }
    }

    /// Validate `config`, connect to the collector and start forwarding.
    ///
    /// Configuration errors are returned before any connection attempt and
    /// leave the appender uninitialised. An unreachable collector is not an
    /// error: the appender becomes active without a client.
    pub fn activate(&self, config: ForwarderConfig) -> Result<(), ActivationError> {
        self.begin_activation()?;

        let delivery = match config.validate() {
            Ok(delivery) => delivery,
            Err(err) => {
                let mut lifecycle = self.lifecycle.write();
                if matches!(*lifecycle, Lifecycle::Activating) {
                    *lifecycle = Lifecycle::Uninitialized;
                }
                return Err(err.into());
            }
        };

        let reconnector = Reconnector::from_flag(config.use_constant_delay_reconnector);
        let summary = format!(
            "host={}, port={}, timeout={}, bufferCapacity={}, tagPrefix={}",
            config.host, config.port, config.timeout_ms, config.buffer_capacity, config.tag_prefix
        );
        let mut client = DeliveryClient::new(delivery, reconnector);
        let client = if client.is_connected() {
            debug!("forwarder connected to the collector ({summary})");
            Some(client)
        } else {
            warn!("forwarder NOT connected to the collector ({summary}); records will be dropped");
            client.close();
            None
        };

        let active = ActiveForwarder {
            builder: RecordBuilder::from_config(&config),
            config,
            client,
        };

        let mut lifecycle = self.lifecycle.write();
        if matches!(*lifecycle, Lifecycle::Closed) {
            drop(lifecycle);
            if let Some(mut client) = active.client {
                client.close();
            }
            return Err(ActivationError::Closed);
        }
        *lifecycle = Lifecycle::Active(Box::new(active));
        Ok(())
    }

    fn begin_activation(&self) -> Result<(), ActivationError> {
        let mut lifecycle = self.lifecycle.write();
        match *lifecycle {
            Lifecycle::Uninitialized => {
                *lifecycle = Lifecycle::Activating;
                Ok(())
            }
            Lifecycle::Activating | Lifecycle::Active(_) => Err(ActivationError::AlreadyActivated),
            Lifecycle::Closed => Err(ActivationError::Closed),
        }
    }

    /// Build a record from `event` and queue it for delivery.
    pub fn append(&self, event: &dyn LoggingEvent) {
        let lifecycle = self.lifecycle.read();
        let Lifecycle::Active(active) = &*lifecycle else {
            self.report_unavailable("forwarder is not active");
            return;
        };
        let Some(client) = active.client.as_ref() else {
            self.report_unavailable("forwarder has no collector connection");
            return;
        };
        let record = active.builder.build(event);
        match client.send_at(&active.config.tag, event.timestamp(), &record) {
            Ok(()) | Err(SendError::BufferFull) => {}
            Err(err @ SendError::Encode(_)) => {
                warn!("record for tag {} dropped: {err}", active.config.tag);
            }
            Err(err) => debug!("record for tag {} dropped: {err}", active.config.tag),
        }
    }

    /// Wait for queued records to be written. Returns `false` when there is
    /// no client or the flush deadline elapsed.
    ///
    /// The lifecycle lock is released before waiting, so a concurrent
    /// `close` or `append` is never held up by a flush.
    pub fn flush(&self) -> bool {
        let handle = match &*self.lifecycle.read() {
            Lifecycle::Active(active) => active
                .client
                .as_ref()
                .and_then(DeliveryClient::flush_handle),
            _ => None,
        };
        handle.is_some_and(|handle| handle.wait())
    }

    /// Flush and close the client, if any. Idempotent.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.write(), Lifecycle::Closed);
        if let Lifecycle::Active(active) = previous
            && let Some(mut client) = active.client
        {
            client.close();
        }
        self.warner.flush(|count| {
            warn!("forwarder dropped {count} events because it was not connected");
        });
    }

    pub fn state(&self) -> AppenderState {
        match &*self.lifecycle.read() {
            Lifecycle::Uninitialized => AppenderState::Uninitialized,
            Lifecycle::Activating => AppenderState::Activating,
            Lifecycle::Active(_) => AppenderState::Active,
            Lifecycle::Closed => AppenderState::Closed,
        }
    }

    /// `true` when the appender holds a client that is currently connected.
    pub fn is_connected(&self) -> bool {
        match &*self.lifecycle.read() {
            Lifecycle::Active(active) => active
                .client
                .as_ref()
                .is_some_and(DeliveryClient::is_connected),
            _ => false,
        }
    }

    /// Configuration in effect once active.
    pub fn config(&self) -> Option<ForwarderConfig> {
        match &*self.lifecycle.read() {
            Lifecycle::Active(active) => Some(active.config.clone()),
            _ => None,
        }
    }

    fn report_unavailable(&self, reason: &str) {
        debug!("{reason}; check the configuration and earlier diagnostics");
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("{reason}; dropped {count} events");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryConfig;
    use crate::event::ForwardEvent;
    use crate::level::Level;
    use rstest::rstest;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn unused_port() -> u16 {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        listener.local_addr().expect("listener has address").port()
    }

    fn unreachable_config() -> ForwarderConfig {
        ForwarderConfig::default()
            .with_host("127.0.0.1")
            .with_port(u32::from(unused_port()))
            .with_timeout_ms(200u64)
            .with_flush_timeout_ms(100u64)
    }

    /// An active appender whose client is stuck in a long backoff, so every
    /// flush runs until its deadline.
    fn stalled_appender(flush_timeout: Duration) -> ForwarderAppender {
        let client = DeliveryClient::new(
            DeliveryConfig::default()
                .with_address("127.0.0.1", unused_port())
                .with_connect_timeout(Duration::from_millis(200))
                .with_flush_timeout(flush_timeout),
            Reconnector::Constant {
                delay: Duration::from_secs(30),
            },
        );
        let appender = ForwarderAppender::new();
        *appender.lifecycle.write() = Lifecycle::Active(Box::new(ActiveForwarder {
            config: ForwarderConfig::default(),
            builder: RecordBuilder::default(),
            client: Some(client),
        }));
        appender.append(&ForwardEvent::new("app", Level::Info, "pending"));
        appender
    }

    #[rstest]
    fn starts_uninitialized_and_ignores_appends() {
        let appender = ForwarderAppender::new();
        assert_eq!(appender.state(), AppenderState::Uninitialized);
        appender.append(&ForwardEvent::new("app", Level::Info, "early"));
        assert!(!appender.flush());
    }

    #[rstest]
    fn invalid_config_leaves_appender_uninitialized() {
        let appender = ForwarderAppender::new();
        let err = appender
            .activate(ForwarderConfig::default().with_port(70_000u32))
            .expect_err("port out of range");
        assert_eq!(err, ActivationError::Config(ConfigError::PortOutOfRange(70_000)));
        assert_eq!(appender.state(), AppenderState::Uninitialized);
        appender.append(&ForwardEvent::new("app", Level::Info, "ignored"));
    }

    #[rstest]
    fn unreachable_collector_activates_without_client() {
        let appender = ForwarderAppender::new();
        appender
            .activate(unreachable_config())
            .expect("activation succeeds regardless of reachability");
        assert_eq!(appender.state(), AppenderState::Active);
        assert!(!appender.is_connected());
        appender.append(&ForwardEvent::new("app", Level::Error, "dropped"));
        assert!(!appender.flush());
        appender.close();
        assert_eq!(appender.state(), AppenderState::Closed);
    }

    #[rstest]
    fn activation_is_single_shot() {
        let appender = ForwarderAppender::new();
        appender.activate(unreachable_config()).expect("first activation");
        assert_eq!(
            appender.activate(unreachable_config()),
            Err(ActivationError::AlreadyActivated)
        );
        appender.close();
        assert_eq!(
            appender.activate(unreachable_config()),
            Err(ActivationError::Closed)
        );
    }

    #[rstest]
    fn flush_does_not_block_close_or_append() {
        let appender = Arc::new(stalled_appender(Duration::from_secs(2)));
        let flusher = {
            let appender = Arc::clone(&appender);
            thread::spawn(move || appender.flush())
        };
        thread::sleep(Duration::from_millis(100));
        let closer = {
            let appender = Arc::clone(&appender);
            thread::spawn(move || appender.close())
        };
        thread::sleep(Duration::from_millis(100));

        let start = Instant::now();
        appender.append(&ForwardEvent::new("app", Level::Info, "during close"));
        assert!(
            start.elapsed() < Duration::from_millis(500),
            "append waited {:?}",
            start.elapsed()
        );
        assert_eq!(appender.state(), AppenderState::Closed);

        assert!(!flusher.join().expect("join flusher"));
        closer.join().expect("join closer");
    }

    #[rstest]
    fn close_is_idempotent() {
        let appender = ForwarderAppender::new();
        appender.close();
        appender.close();
        assert_eq!(appender.state(), AppenderState::Closed);
        assert_eq!(appender.config(), None);
    }
}
