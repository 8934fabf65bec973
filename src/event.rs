//! Inbound event interface.
//!
//! [`LoggingEvent`] is the read-only view the forwarder needs from a host
//! logging framework. [`ForwardEvent`] is an owned implementation that
//! captures the calling thread's name and the creation time, in the same way
//! a log call captures its runtime context.

use std::collections::BTreeMap;
use std::thread;
use std::time::SystemTime;

use crate::diagnostic::{Mdc, Ndc};
use crate::level::Level;
use crate::record::FieldValue;

/// Read-only view of a single log invocation.
pub trait LoggingEvent {
    fn message(&self) -> &str;

    fn logger_name(&self) -> &str;

    fn level(&self) -> Level;

    /// Fully qualified name of the logger type that produced the event.
    fn logger_class(&self) -> &str;

    /// Caller location, conventionally `module(file:line)`.
    fn location_information(&self) -> &str;

    fn thread_name(&self) -> &str;

    /// Rendered exception, one stack frame per line.
    fn throwable_lines(&self) -> Option<&[String]> {
        None
    }

    fn ndc(&self) -> Option<&str> {
        None
    }

    /// Resolve `key` in the event's mapped diagnostic context.
    fn mdc(&self, key: &str) -> Option<&FieldValue>;

    fn timestamp(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Owned event captured at the call site.
#[derive(Clone, Debug)]
pub struct ForwardEvent {
    pub message: String,
    pub logger: String,
    pub level: Level,
    pub logger_class: String,
    pub location: String,
    pub thread_name: String,
    pub throwable: Option<Vec<String>>,
    pub ndc: Option<String>,
    pub mdc: BTreeMap<String, FieldValue>,
    pub timestamp: SystemTime,
}

impl ForwardEvent {
    /// Construct an event for `logger` at `level`, capturing the current
    /// thread name and time. Diagnostic contexts start empty.
    pub fn new(logger: &str, level: Level, message: &str) -> Self {
        let current = thread::current();
        let thread_name = current
            .name()
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("{:?}", current.id()));
        Self {
            message: message.to_owned(),
            logger: logger.to_owned(),
            level,
            logger_class: String::new(),
            location: String::new(),
            thread_name,
            throwable: None,
            ndc: None,
            mdc: BTreeMap::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Copy the calling thread's [`Mdc`] and [`Ndc`] into the event.
    pub fn capture_context(mut self) -> Self {
        self.mdc.extend(Mdc::snapshot());
        self.ndc = Ndc::get();
        self
    }

    pub fn with_logger_class(mut self, class: impl Into<String>) -> Self {
        self.logger_class = class.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_throwable<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.throwable = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    /// Override the time the event is stamped with on the wire.
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_ndc(mut self, ndc: impl Into<String>) -> Self {
        self.ndc = Some(ndc.into());
        self
    }

    pub fn with_mdc(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.mdc.insert(key.into(), value.into());
        self
    }
}

impl LoggingEvent for ForwardEvent {
    fn message(&self) -> &str {
        &self.message
    }

    fn logger_name(&self) -> &str {
        &self.logger
    }

    fn level(&self) -> Level {
        self.level
    }

    fn logger_class(&self) -> &str {
        &self.logger_class
    }

    fn location_information(&self) -> &str {
        &self.location
    }

    fn thread_name(&self) -> &str {
        &self.thread_name
    }

    fn throwable_lines(&self) -> Option<&[String]> {
        self.throwable.as_deref()
    }

    fn ndc(&self) -> Option<&str> {
        self.ndc.as_deref()
    }

    fn mdc(&self, key: &str) -> Option<&FieldValue> {
        self.mdc.get(key)
    }

    fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}
