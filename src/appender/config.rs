//! Forwarder configuration and its string option surface.
//!
//! Option names match the keys host frameworks use to configure the
//! forwarder: `mdcKeys`, `tagPrefix`, `tag`, `host`, `port`, `timeout`,
//! `bufferCapacity`, `useConstantDelayReconnector`, `addHostname` and
//! `flushTimeout`. Values are only checked for syntax when set; range checks
//! happen in [`ForwarderConfig::validate`], which activation calls before any
//! network attempt.

use std::time::Duration;

use serde::Deserialize;

use crate::delivery::{DEFAULT_HOST, DEFAULT_PORT, DeliveryConfig};
use crate::record_builder::parse_context_keys;

use super::error::ConfigError;

pub const OPT_MDC_KEYS: &str = "mdcKeys";
pub const OPT_TAG_PREFIX: &str = "tagPrefix";
pub const OPT_TAG: &str = "tag";
pub const OPT_HOST: &str = "host";
pub const OPT_PORT: &str = "port";
pub const OPT_TIMEOUT: &str = "timeout";
pub const OPT_BUFFER_CAPACITY: &str = "bufferCapacity";
pub const OPT_CONSTANT_RECONNECTOR: &str = "useConstantDelayReconnector";
pub const OPT_ADD_HOSTNAME: &str = "addHostname";
pub const OPT_FLUSH_TIMEOUT: &str = "flushTimeout";

/// Default tag applied to every record.
pub const DEFAULT_TAG: &str = "log";
/// Default connection timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
/// Default buffer capacity in bytes.
pub const DEFAULT_BUFFER_CAPACITY: u64 = 1024 * 1024;
/// Default flush deadline in milliseconds.
pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 1_000;

/// Settings for a [`ForwarderAppender`](super::ForwarderAppender).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ForwarderConfig {
    /// Comma separated context keys copied into each record.
    pub mdc_keys: String,
    pub tag_prefix: String,
    pub tag: String,
    pub host: String,
    pub port: u32,
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    pub buffer_capacity: u64,
    pub use_constant_delay_reconnector: bool,
    pub add_hostname: bool,
    #[serde(rename = "flushTimeout")]
    pub flush_timeout_ms: u64,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            mdc_keys: String::new(),
            tag_prefix: String::new(),
            tag: DEFAULT_TAG.into(),
            host: DEFAULT_HOST.into(),
            port: u32::from(DEFAULT_PORT),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            use_constant_delay_reconnector: false,
            add_hostname: false,
            flush_timeout_ms: DEFAULT_FLUSH_TIMEOUT_MS,
        }
    }
}

macro_rules! config_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: impl Into<$ty>) -> Self {
            self.$field = value.into();
            self
        }
    };
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

fn ensure_positive(value: u64, field: &'static str) -> Result<u64, ConfigError> {
    if value == 0 {
        Err(ConfigError::NotPositive(field))
    } else {
        Ok(value)
    }
}

impl ForwarderConfig {
    config_setter!(with_mdc_keys, mdc_keys, String);
    config_setter!(with_tag_prefix, tag_prefix, String);
    config_setter!(with_tag, tag, String);
    config_setter!(with_host, host, String);
    config_setter!(with_port, port, u32);
    config_setter!(
        #[doc = "Connection timeout in milliseconds."]
        with_timeout_ms,
        timeout_ms,
        u64
    );
    config_setter!(
        #[doc = "Outbound buffer size in bytes."]
        with_buffer_capacity,
        buffer_capacity,
        u64
    );
    config_setter!(with_constant_delay_reconnector, use_constant_delay_reconnector, bool);
    config_setter!(with_add_hostname, add_hostname, bool);
    config_setter!(with_flush_timeout_ms, flush_timeout_ms, u64);

    /// Build a configuration from `(option, value)` pairs applied over the
    /// defaults.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in options {
            config.set_option(key.as_ref(), value.as_ref())?;
        }
        Ok(config)
    }

    /// Set a single option by name. String options are stored verbatim.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            OPT_MDC_KEYS => self.mdc_keys = value.to_owned(),
            OPT_TAG_PREFIX => self.tag_prefix = value.to_owned(),
            OPT_TAG => self.tag = value.to_owned(),
            OPT_HOST => self.host = value.to_owned(),
            OPT_PORT => self.port = parse_value(key, value)?,
            OPT_TIMEOUT => self.timeout_ms = parse_value(key, value)?,
            OPT_BUFFER_CAPACITY => self.buffer_capacity = parse_value(key, value)?,
            OPT_CONSTANT_RECONNECTOR => {
                self.use_constant_delay_reconnector = parse_flag(key, value)?;
            }
            OPT_ADD_HOSTNAME => self.add_hostname = parse_flag(key, value)?,
            OPT_FLUSH_TIMEOUT => self.flush_timeout_ms = parse_value(key, value)?,
            _ => return Err(ConfigError::UnknownOption(key.to_owned())),
        }
        Ok(())
    }

    /// Context keys parsed from [`mdc_keys`](Self::mdc_keys).
    pub fn context_keys(&self) -> Vec<String> {
        parse_context_keys(&self.mdc_keys)
    }

    /// Check the configuration and derive the delivery settings from it.
    pub fn validate(&self) -> Result<DeliveryConfig, ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        let port = u16::try_from(self.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or(ConfigError::PortOutOfRange(self.port))?;
        let timeout = ensure_positive(self.timeout_ms, OPT_TIMEOUT)?;
        let capacity = ensure_positive(self.buffer_capacity, OPT_BUFFER_CAPACITY)?;
        let capacity = usize::try_from(capacity).map_err(|_| ConfigError::InvalidValue {
            key: OPT_BUFFER_CAPACITY.into(),
            value: capacity.to_string(),
        })?;
        let flush_timeout = ensure_positive(self.flush_timeout_ms, OPT_FLUSH_TIMEOUT)?;

        Ok(DeliveryConfig::default()
            .with_address(self.host.clone(), port)
            .with_connect_timeout(Duration::from_millis(timeout))
            .with_flush_timeout(Duration::from_millis(flush_timeout))
            .with_buffer_capacity(capacity)
            .with_tag_prefix(self.tag_prefix.clone()))
    }
}
