//! End-to-end behaviour of the appender against an in-process collector.

mod test_utils;

use std::time::{Duration, UNIX_EPOCH};

use fluent_forwarder::{
    ActivationError, AppenderState, ConfigError, FieldValue, ForwardEvent, ForwarderAppender,
    ForwarderConfig, Level,
};
use rstest::{fixture, rstest};
use test_utils::{Collector, unused_port};

#[fixture]
fn collector() -> Collector {
    Collector::start()
}

fn config_for(collector: &Collector) -> ForwarderConfig {
    ForwarderConfig::default()
        .with_host("127.0.0.1")
        .with_port(u32::from(collector.port()))
        .with_timeout_ms(1_000u64)
}

fn text<'a>(record: &'a fluent_forwarder::LogRecord, key: &str) -> Option<&'a str> {
    record.get(key).and_then(FieldValue::as_text)
}

#[rstest]
fn forwards_event_with_context_and_hostname(collector: Collector) {
    let appender = ForwarderAppender::new();
    appender
        .activate(
            config_for(&collector)
                .with_tag("app")
                .with_mdc_keys("requestId")
                .with_add_hostname(true),
        )
        .expect("activate");
    assert!(appender.is_connected());

    let event = ForwardEvent::new("com.example.Boot", Level::Info, "boot")
        .with_logger_class("com.example.Boot")
        .with_location("com.example.Boot(boot.rs:10)")
        .with_thread_name("main")
        .with_mdc("requestId", "42");
    appender.append(&event);

    let (tag, seconds, record) = collector.next();
    assert_eq!(tag, "app");
    assert!(seconds > 0);
    assert_eq!(text(&record, "message"), Some("boot"));
    assert_eq!(text(&record, "level"), Some("INFO"));
    assert_eq!(text(&record, "logger"), Some("com.example.Boot"));
    assert_eq!(text(&record, "threadName"), Some("main"));
    assert_eq!(text(&record, "loggerClass"), Some("com.example.Boot"));
    assert_eq!(
        text(&record, "locationInformation"),
        Some("com.example.Boot(boot.rs:10)")
    );
    assert_eq!(text(&record, "requestId"), Some("42"));
    assert!(!record.contains_key("throwableInformation"));
    assert!(!record.contains_key("NDC"));
    match whoami::fallible::hostname() {
        Ok(host) if !host.is_empty() => assert_eq!(text(&record, "hostname"), Some(host.as_str())),
        _ => assert!(!record.contains_key("hostname")),
    }
    appender.close();
}

#[rstest]
fn forwards_throwable_and_ndc_under_prefixed_tag(collector: Collector) {
    let appender = ForwarderAppender::new();
    appender
        .activate(config_for(&collector).with_tag_prefix("svc").with_tag("errors"))
        .expect("activate");

    let event = ForwardEvent::new("worker", Level::Error, "job failed")
        .with_throwable(["Error: boom", "  at run(job.rs:3)"])
        .with_ndc("batch-9 job-3");
    appender.append(&event);

    let (tag, _, record) = collector.next();
    assert_eq!(tag, "svc.errors");
    assert_eq!(text(&record, "level"), Some("ERROR"));
    assert_eq!(
        text(&record, "throwableInformation"),
        Some("Error: boom\n  at run(job.rs:3)")
    );
    assert_eq!(text(&record, "NDC"), Some("batch-9 job-3"));
    assert!(!record.contains_key("hostname"));
    appender.close();
}

#[rstest]
fn stamps_entries_with_event_time(collector: Collector) {
    let appender = ForwarderAppender::new();
    appender.activate(config_for(&collector)).expect("activate");

    let event = ForwardEvent::new("app", Level::Info, "replayed")
        .with_timestamp(UNIX_EPOCH + Duration::from_secs(1_500_000_000));
    appender.append(&event);

    let (_, seconds, record) = collector.next();
    assert_eq!(seconds, 1_500_000_000);
    assert_eq!(text(&record, "message"), Some("replayed"));
    appender.close();
}

#[rstest]
fn close_delivers_everything_appended_before_it(collector: Collector) {
    let appender = ForwarderAppender::new();
    appender.activate(config_for(&collector)).expect("activate");
    for idx in 0..10 {
        appender.append(&ForwardEvent::new("app", Level::Debug, &format!("m{idx}")));
    }
    appender.close();
    assert_eq!(appender.state(), AppenderState::Closed);

    for idx in 0..10 {
        let (tag, _, record) = collector.next();
        assert_eq!(tag, "log");
        assert_eq!(text(&record, "message"), Some(format!("m{idx}").as_str()));
    }
    appender.append(&ForwardEvent::new("app", Level::Info, "after close"));
    assert!(collector.try_next(Duration::from_millis(200)).is_none());
}

#[rstest]
fn activates_from_string_options(collector: Collector) {
    let port = collector.port().to_string();
    let config = ForwarderConfig::from_options([
        ("host", "127.0.0.1"),
        ("port", port.as_str()),
        ("tag", "opts"),
        ("mdcKeys", "user,,user"),
        ("useConstantDelayReconnector", "true"),
    ])
    .expect("options parse");
    assert_eq!(config.context_keys(), vec!["user".to_owned()]);

    let appender = ForwarderAppender::new();
    appender.activate(config).expect("activate");
    appender.append(&ForwardEvent::new("app", Level::Warn, "hi").with_mdc("user", "ada"));
    let (tag, _, record) = collector.next();
    assert_eq!(tag, "opts");
    assert_eq!(text(&record, "user"), Some("ada"));
    appender.close();
}

#[rstest]
fn rejects_out_of_range_port_before_connecting() {
    let appender = ForwarderAppender::new();
    let err = appender
        .activate(ForwarderConfig::default().with_port(70_000u32))
        .expect_err("invalid port");
    assert_eq!(err, ActivationError::Config(ConfigError::PortOutOfRange(70_000)));
    appender.append(&ForwardEvent::new("app", Level::Info, "ignored"));
    assert_eq!(appender.state(), AppenderState::Uninitialized);
}

#[rstest]
fn unreachable_collector_degrades_silently() {
    let appender = ForwarderAppender::new();
    appender
        .activate(
            ForwarderConfig::default()
                .with_host("127.0.0.1")
                .with_port(u32::from(unused_port()))
                .with_timeout_ms(200u64),
        )
        .expect("activation tolerates an unreachable collector");
    assert!(!appender.is_connected());
    for _ in 0..100 {
        appender.append(&ForwardEvent::new("app", Level::Info, "dropped"));
    }
    assert!(!appender.flush());
    appender.close();
}
