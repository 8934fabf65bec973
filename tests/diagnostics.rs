//! Diagnostics emitted while the forwarder degrades.
//!
//! `logtest` installs a process-wide logger, so everything lives in a single
//! test.

mod test_utils;

use fluent_forwarder::{ForwardEvent, ForwarderAppender, ForwarderConfig, Level};
use logtest::Logger;
use test_utils::unused_port;

fn drain_warnings(logger: &mut Logger) -> Vec<String> {
    let mut warnings = Vec::new();
    while let Some(record) = logger.pop() {
        if record.level() == log::Level::Warn {
            warnings.push(record.args().to_owned());
        }
    }
    warnings
}

#[test]
fn reports_unreachable_collector_and_dropped_events() {
    let mut logger = Logger::start();
    let appender = ForwarderAppender::new();
    appender
        .activate(
            ForwarderConfig::default()
                .with_host("127.0.0.1")
                .with_port(u32::from(unused_port()))
                .with_timeout_ms(200u64),
        )
        .expect("activate");

    let warnings = drain_warnings(&mut logger);
    assert!(
        warnings.iter().any(|msg| msg.contains("NOT connected")),
        "missing activation warning in {warnings:?}"
    );

    appender.append(&ForwardEvent::new("app", Level::Info, "first"));
    let warnings = drain_warnings(&mut logger);
    assert!(
        warnings
            .iter()
            .any(|msg| msg.contains("no collector connection") && msg.contains("dropped 1 events")),
        "missing drop warning in {warnings:?}"
    );

    // Further drops inside the interval are counted, not logged.
    appender.append(&ForwardEvent::new("app", Level::Info, "second"));
    appender.append(&ForwardEvent::new("app", Level::Info, "third"));
    assert!(drain_warnings(&mut logger).is_empty());

    appender.close();
    let warnings = drain_warnings(&mut logger);
    assert!(
        warnings.iter().any(|msg| msg.contains("dropped 2 events")),
        "missing summary in {warnings:?}"
    );
}
