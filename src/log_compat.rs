//! Compatibility bridge for the Rust `log` crate.
//!
//! [`ForwarderLogger`] implements `log::Log` and turns each record into a
//! [`ForwardEvent`] for a [`ForwarderAppender`]. The calling thread's
//! [`Mdc`](crate::Mdc) and [`Ndc`](crate::Ndc) are captured, and the record's
//! structured key-values are merged over the MDC snapshot. Records emitted by
//! this crate itself are skipped so forwarding diagnostics never loop back
//! into the forwarder.

use std::borrow::Cow;
use std::sync::Arc;

use log::kv::{self, VisitSource};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::appender::ForwarderAppender;
use crate::event::ForwardEvent;
use crate::level::Level;
use crate::record::FieldValue;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

fn normalise_target(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn location_of(record: &Record<'_>) -> String {
    let module = record.module_path().unwrap_or("?");
    match (record.file(), record.line()) {
        (Some(file), Some(line)) => format!("{module}({file}:{line})"),
        (Some(file), None) => format!("{module}({file})"),
        _ => module.to_owned(),
    }
}

fn field_value(value: &kv::Value<'_>) -> FieldValue {
    if let Some(flag) = value.to_bool() {
        FieldValue::Bool(flag)
    } else if let Some(int) = value.to_i64() {
        FieldValue::Integer(int)
    } else if let Some(float) = value.to_f64() {
        FieldValue::Float(float)
    } else {
        FieldValue::Text(value.to_string())
    }
}

struct KeyValueCollector<'a> {
    event: &'a mut ForwardEvent,
}

impl<'kvs> VisitSource<'kvs> for KeyValueCollector<'_> {
    fn visit_pair(
        &mut self,
        key: kv::Key<'kvs>,
        value: kv::Value<'kvs>,
    ) -> Result<(), kv::Error> {
        self.event
            .mdc
            .insert(key.as_str().to_owned(), field_value(&value));
        Ok(())
    }
}

/// Convert a `log` record into an event, capturing thread-local context.
pub fn event_from_record(record: &Record<'_>) -> ForwardEvent {
    let target = normalise_target(record.target());
    let message = record.args().to_string();
    let mut event = ForwardEvent::new(&target, Level::from(record.level()), &message)
        .with_logger_class(record.module_path().unwrap_or_default())
        .with_location(location_of(record))
        .capture_context();
    let _ = record
        .key_values()
        .visit(&mut KeyValueCollector { event: &mut event });
    event
}

/// `log::Log` implementation feeding a shared [`ForwarderAppender`].
#[derive(Debug, Clone)]
pub struct ForwarderLogger {
    appender: Arc<ForwarderAppender>,
    level: LevelFilter,
}

impl ForwarderLogger {
    pub fn new(appender: Arc<ForwarderAppender>) -> Self {
        Self {
            appender,
            level: LevelFilter::Trace,
        }
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn appender(&self) -> &Arc<ForwarderAppender> {
        &self.appender
    }

    /// Install as the global logger and raise the global max level to match.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for ForwarderLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && !is_own_target(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.appender.append(&event_from_record(record));
    }

    fn flush(&self) {
        self.appender.flush();
    }
}
