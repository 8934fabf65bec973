//! Mapping from a [`LoggingEvent`] to the [`LogRecord`] sent to the collector.
//!
//! Fields are inserted in a fixed order: the six required fields, then
//! `throwableInformation`, `NDC`, the configured context keys and finally
//! `hostname`. A context key that collides with an earlier field name
//! overwrites it. No field is ever written with an absent value.

use std::io;
use std::sync::OnceLock;

use log::warn;

use crate::appender::ForwarderConfig;
use crate::event::LoggingEvent;
use crate::rate_limited_warner::RateLimitedWarner;
use crate::record::LogRecord;

pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_LEVEL: &str = "level";
pub const FIELD_LOGGER: &str = "logger";
pub const FIELD_THREAD_NAME: &str = "threadName";
pub const FIELD_LOGGER_CLASS: &str = "loggerClass";
pub const FIELD_LOCATION: &str = "locationInformation";
pub const FIELD_THROWABLE: &str = "throwableInformation";
pub const FIELD_NDC: &str = "NDC";
pub const FIELD_HOSTNAME: &str = "hostname";

const REQUIRED_FIELDS: usize = 6;

/// Function used to look up the local host name.
pub type HostnameResolver = fn() -> io::Result<String>;

fn system_hostname() -> io::Result<String> {
    whoami::fallible::hostname()
}

/// Split a comma separated context key list.
///
/// Keys are not trimmed: `"a, b"` yields `"a"` and `" b"`. Empty segments are
/// skipped and repeated keys keep their first position.
pub fn parse_context_keys(list: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in list.split(',') {
        if key.is_empty() || keys.iter().any(|existing| existing == key) {
            continue;
        }
        keys.push(key.to_owned());
    }
    keys
}

/// Builds structured records from events.
#[derive(Debug)]
pub struct RecordBuilder {
    context_keys: Vec<String>,
    include_hostname: bool,
    resolver: HostnameResolver,
    hostname: OnceLock<String>,
    warner: RateLimitedWarner,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(Vec::new(), false)
    }
}

impl RecordBuilder {
    pub fn new(context_keys: Vec<String>, include_hostname: bool) -> Self {
        Self {
            context_keys,
            include_hostname,
            resolver: system_hostname,
            hostname: OnceLock::new(),
            warner: RateLimitedWarner::default(),
        }
    }

    pub fn from_config(config: &ForwarderConfig) -> Self {
        Self::new(config.context_keys(), config.add_hostname)
    }

    /// Replace the host name lookup, primarily for tests.
    pub fn with_hostname_resolver(mut self, resolver: HostnameResolver) -> Self {
        self.resolver = resolver;
        self.hostname = OnceLock::new();
        self
    }

    pub fn context_keys(&self) -> &[String] {
        &self.context_keys
    }

    /// Convert `event` into a record. Never fails; optional fields whose
    /// source is absent are omitted.
    pub fn build(&self, event: &dyn LoggingEvent) -> LogRecord {
        let mut record =
            LogRecord::with_capacity(REQUIRED_FIELDS + 3 + self.context_keys.len());
        record.insert(FIELD_MESSAGE, event.message());
        record.insert(FIELD_LEVEL, event.level().as_str());
        record.insert(FIELD_LOGGER, event.logger_name());
        record.insert(FIELD_THREAD_NAME, event.thread_name());
        record.insert(FIELD_LOGGER_CLASS, event.logger_class());
        record.insert(FIELD_LOCATION, event.location_information());

        if let Some(lines) = event.throwable_lines() {
            record.insert(FIELD_THROWABLE, lines.join("\n"));
        }
        if let Some(ndc) = event.ndc() {
            record.insert(FIELD_NDC, ndc);
        }
        for key in &self.context_keys {
            if let Some(value) = event.mdc(key) {
                record.insert(key.as_str(), value.clone());
            }
        }
        if self.include_hostname
            && let Some(hostname) = self.hostname()
        {
            record.insert(FIELD_HOSTNAME, hostname);
        }
        record
    }

    fn hostname(&self) -> Option<&str> {
        if let Some(cached) = self.hostname.get() {
            return Some(cached);
        }
        match (self.resolver)() {
            Ok(name) if !name.is_empty() => Some(self.hostname.get_or_init(|| name)),
            Ok(_) => {
                self.warn_hostname("resolver returned an empty name");
                None
            }
            Err(err) => {
                self.warn_hostname(&err.to_string());
                None
            }
        }
    }

    fn warn_hostname(&self, reason: &str) {
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!(
                "unable to resolve the local hostname ({reason}); omitted from {count} records. \
                 Check the host configuration or disable addHostname"
            );
        });
    }
}
