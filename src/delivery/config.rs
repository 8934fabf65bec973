//! Configuration consumed by [`DeliveryClient`](super::DeliveryClient).

use std::time::Duration;

use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

/// Default collector host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default Fluentd forward port.
pub const DEFAULT_PORT: u16 = 24224;
/// Default connection timeout applied when establishing sockets.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Default write timeout applied to socket writes.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default upper bound on how long `flush` waits for the worker.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);
/// Default outbound buffer size in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1 << 20; // 1 MiB

/// Settings for a single delivery client.
#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub flush_timeout: Duration,
    pub buffer_capacity: usize,
    pub tag_prefix: String,
    pub warn_interval: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            tag_prefix: String::new(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl DeliveryConfig {
    /// Target `host:port`.
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn with_buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes;
        self
    }

    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }
}
