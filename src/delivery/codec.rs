//! MessagePack encoding of forward-protocol entries.
//!
//! Each entry is the three element array `[tag, time, record]` with `time`
//! in whole seconds since the UNIX epoch.

use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};

use rmp_serde::Serializer;
use serde::Serialize;

use crate::record::LogRecord;

#[derive(Serialize)]
struct ForwardEntry<'a>(&'a str, u64, &'a LogRecord);

/// Join `prefix` and `tag` with a dot, or return `tag` when there is no prefix.
pub fn effective_tag<'a>(prefix: &str, tag: &'a str) -> Cow<'a, str> {
    if prefix.is_empty() {
        Cow::Borrowed(tag)
    } else {
        Cow::Owned(format!("{prefix}.{tag}"))
    }
}

pub(super) fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs())
        .unwrap_or_default()
}

/// Serialise a single entry into a MessagePack frame.
pub fn encode_entry(
    tag: &str,
    time: SystemTime,
    record: &LogRecord,
) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    let mut buf = Vec::with_capacity(128);
    ForwardEntry(tag, unix_seconds(time), record).serialize(&mut Serializer::new(&mut buf))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case("", "log", "log")]
    #[case("app", "log", "app.log")]
    #[case("a.b", "c", "a.b.c")]
    fn joins_tag_prefix(#[case] prefix: &str, #[case] tag: &str, #[case] expected: &str) {
        assert_eq!(effective_tag(prefix, tag), expected);
    }

    #[rstest]
    fn encodes_tag_time_and_record_as_array() {
        let mut record = LogRecord::new();
        record.insert("message", "boot");
        let time = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        let frame = encode_entry("app.log", time, &record).expect("encode entry");
        let (tag, secs, decoded): (String, u64, LogRecord) =
            rmp_serde::from_slice(&frame).expect("decode entry");

        assert_eq!(frame[0], 0x93, "entry must be a fixarray of three");
        assert_eq!(tag, "app.log");
        assert_eq!(secs, 1_700_000_000);
        assert_eq!(decoded.get("message"), Some(&FieldValue::from("boot")));
    }
}
