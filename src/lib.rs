//! Structured log-event forwarding to Fluentd-compatible collectors.
//!
//! A [`ForwarderAppender`] turns logging events into flat [`LogRecord`]s via a
//! [`RecordBuilder`] and hands them to a [`DeliveryClient`], which encodes
//! them as MessagePack forward entries and writes them over TCP from a
//! background worker. Callers never block on the network: records are
//! buffered up to a byte budget and the worker reconnects on its own schedule
//! as chosen by a [`Reconnector`].
//!
//! With the default `log-compat` feature, [`ForwarderLogger`] plugs the
//! appender into the `log` crate facade.

mod appender;
mod delivery;
mod diagnostic;
mod event;
mod level;
#[cfg(feature = "log-compat")]
mod log_compat;
pub mod rate_limited_warner;
mod reconnector;
mod record;
mod record_builder;

pub use appender::{
    ActivationError, AppenderState, ConfigError, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_FLUSH_TIMEOUT_MS, DEFAULT_TAG, DEFAULT_TIMEOUT_MS, ForwarderAppender, ForwarderConfig,
    OPT_ADD_HOSTNAME, OPT_BUFFER_CAPACITY, OPT_CONSTANT_RECONNECTOR, OPT_FLUSH_TIMEOUT, OPT_HOST,
    OPT_MDC_KEYS, OPT_PORT, OPT_TAG, OPT_TAG_PREFIX, OPT_TIMEOUT,
};
pub use delivery::{
    ByteBudget, ConnectionState, DEFAULT_HOST, DEFAULT_PORT, DeliveryClient, DeliveryConfig,
    SendError, effective_tag, encode_entry,
};
pub use diagnostic::{Mdc, Ndc};
pub use event::{ForwardEvent, LoggingEvent};
pub use level::Level;
#[cfg(feature = "log-compat")]
pub use log_compat::{ForwarderLogger, event_from_record};
pub use reconnector::{
    DEFAULT_CAP_ATTEMPTS, DEFAULT_CONSTANT_DELAY, DEFAULT_EXPONENTIAL_BASE,
    DEFAULT_EXPONENTIAL_FACTOR, DEFAULT_MAX_DELAY, ReconnectState, Reconnector,
};
pub use record::{FieldValue, LogRecord};
pub use record_builder::{
    FIELD_HOSTNAME, FIELD_LEVEL, FIELD_LOCATION, FIELD_LOGGER, FIELD_LOGGER_CLASS, FIELD_MESSAGE,
    FIELD_NDC, FIELD_THREAD_NAME, FIELD_THROWABLE, HostnameResolver, RecordBuilder,
    parse_context_keys,
};
