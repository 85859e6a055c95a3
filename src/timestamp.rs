//! Capture-time lookup and parsing.
//!
//! Cameras, phones and tools disagree on which field holds the capture time and on
//! whether it carries sub-seconds or a UTC offset. [`resolve`] walks a fixed fallback
//! chain of field names; [`parse`] tries a fixed list of layouts, strict first.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

use crate::error::RenameError;
use crate::metadata::MetadataRecord;

/// Capture-time fields, most reliable first.
///
/// - `DateTimeOriginal` — JPEG, PNG, MP4
/// - `CreationDate` — QuickTime keys (MOV)
/// - `SubSecDateTimeOriginal` — HEIC, with sub-seconds
/// - `ContentCreateDate` — MOV/MP4 fallback
/// - `CreateDate` — JPEG fallback, also the MP4 movie header time
pub const TIMESTAMP_FIELDS: [&str; 5] = [
    "DateTimeOriginal",
    "CreationDate",
    "SubSecDateTimeOriginal",
    "ContentCreateDate",
    "CreateDate",
];

/// Placeholder written by cameras whose clock was never set.
const ZERO_DATE: &str = "0000:00:00 00:00:00";

/// Layout of the canonical base name.
const NAME_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Return the first usable raw timestamp from `record`.
pub fn resolve(record: &MetadataRecord) -> Result<&str, RenameError> {
    TIMESTAMP_FIELDS
        .iter()
        .filter_map(|field| record.get(field))
        .map(str::trim)
        .find(|value| !is_placeholder(value))
        .ok_or(RenameError::TimestampNotFound)
}

/// Values that stand in for "no date": empty, the zero date, or the blank template
/// (`"    :  :     :  :  "`) some writers leave behind.
fn is_placeholder(value: &str) -> bool {
    value.starts_with(ZERO_DATE) || value.chars().all(|c| c == ' ' || c == ':')
}

/// A layout accepted by [`parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2023:05:01 10:15:30`
    Base,
    /// `2023:05:01 10:15:30.123-05:00`
    SubSecondOffset,
    /// `2023:05:01 10:15:30-05:00`
    Offset,
}

impl TimestampFormat {
    /// Every layout, in the order they are tried.
    pub const ALL: [TimestampFormat; 3] = [Self::Base, Self::SubSecondOffset, Self::Offset];

    /// The chrono pattern for this layout.
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Base => "%Y:%m:%d %H:%M:%S",
            Self::SubSecondOffset => "%Y:%m:%d %H:%M:%S%.f%:z",
            Self::Offset => "%Y:%m:%d %H:%M:%S%:z",
        }
    }

    fn parse(&self, raw: &str) -> Option<CaptureTime> {
        match self {
            Self::Base => NaiveDateTime::parse_from_str(raw, self.pattern())
                .ok()
                .map(|local| CaptureTime {
                    local,
                    offset: None,
                    format: *self,
                }),
            Self::SubSecondOffset | Self::Offset => {
                // `%.f` also accepts no fraction at all, so insist on the dot here to
                // keep the two offset layouts distinct.
                let has_fraction = raw.as_bytes().get(19) == Some(&b'.');
                if has_fraction != (*self == Self::SubSecondOffset) {
                    return None;
                }
                DateTime::parse_from_str(raw, self.pattern())
                    .ok()
                    .map(|time| CaptureTime {
                        local: time.naive_local(),
                        offset: Some(*time.offset()),
                        format: *self,
                    })
            }
        }
    }
}

/// A parsed capture time.
///
/// Holds the wall-clock time exactly as the device recorded it. Names are built from
/// this value without converting to the host's zone, so a library gets the same names
/// on every machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
    format: TimestampFormat,
}

impl CaptureTime {
    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    /// UTC offset, when the source value carried one.
    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// Which layout matched.
    pub fn format(&self) -> TimestampFormat {
        self.format
    }

    /// `YYYY-MM-DD_HHMMSS`, second precision.
    pub fn base_name(&self) -> String {
        self.local.format(NAME_FORMAT).to_string()
    }
}

/// Parse a raw capture-time value, trying each [`TimestampFormat`] in order.
pub fn parse(raw: &str) -> Result<CaptureTime, RenameError> {
    let trimmed = raw.trim();
    TimestampFormat::ALL
        .iter()
        .find_map(|format| format.parse(trimmed))
        .ok_or_else(|| RenameError::TimestampUnparseable(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> MetadataRecord {
        fields.iter().copied().collect()
    }

    // ── resolve ──────────────────────────────────────────────────────

    #[test]
    fn resolve_falls_back_to_create_date() {
        let r = record(&[("FileType", "JPEG"), ("CreateDate", "2023:05:01 10:15:30")]);
        assert_eq!(resolve(&r).unwrap(), "2023:05:01 10:15:30");
    }

    #[test]
    fn resolve_prefers_date_time_original() {
        let r = record(&[
            ("CreateDate", "2020:01:01 00:00:00"),
            ("DateTimeOriginal", "2023:05:01 10:15:30"),
        ]);
        assert_eq!(resolve(&r).unwrap(), "2023:05:01 10:15:30");
    }

    #[test]
    fn resolve_follows_priority_order() {
        let r = record(&[
            ("ContentCreateDate", "2021:01:01 00:00:00-05:00"),
            ("SubSecDateTimeOriginal", "2022:01:01 00:00:00.500-05:00"),
            ("CreationDate", "2023:01:01 00:00:00-05:00"),
        ]);
        assert_eq!(resolve(&r).unwrap(), "2023:01:01 00:00:00-05:00");
    }

    #[test]
    fn resolve_skips_empty_and_zero_values() {
        let r = record(&[
            ("DateTimeOriginal", "   "),
            ("CreationDate", "0000:00:00 00:00:00"),
            ("CreateDate", "2023:05:01 10:15:30"),
        ]);
        assert_eq!(resolve(&r).unwrap(), "2023:05:01 10:15:30");
    }

    #[test]
    fn resolve_skips_blank_date_template() {
        let r = record(&[
            ("DateTimeOriginal", "    :  :     :  :  "),
            ("CreateDate", "2023:05:01 10:15:30"),
        ]);
        assert_eq!(resolve(&r).unwrap(), "2023:05:01 10:15:30");

        let only_blank = record(&[("DateTimeOriginal", "    :  :     :  :  ")]);
        assert!(matches!(resolve(&only_blank), Err(RenameError::TimestampNotFound)));
    }

    #[test]
    fn resolve_not_found() {
        let r = record(&[("FileType", "JPEG"), ("ModifyDate", "2023:05:01 10:15:30")]);
        assert!(matches!(resolve(&r), Err(RenameError::TimestampNotFound)));
    }

    // ── parse ────────────────────────────────────────────────────────

    #[test]
    fn parse_base_format() {
        let t = parse("2023:05:01 10:15:30").unwrap();
        assert_eq!(t.format(), TimestampFormat::Base);
        assert_eq!(t.offset(), None);
        assert_eq!(t.base_name(), "2023-05-01_101530");
    }

    #[test]
    fn parse_sub_second_with_offset() {
        let t = parse("2023:05:01 10:15:30.123-05:00").unwrap();
        assert_eq!(t.format(), TimestampFormat::SubSecondOffset);
        assert_eq!(t.offset(), FixedOffset::west_opt(5 * 3600));
        assert_eq!(t.base_name(), "2023-05-01_101530");
    }

    #[test]
    fn parse_offset_only() {
        let t = parse("2023:05:01 10:15:30-05:00").unwrap();
        assert_eq!(t.format(), TimestampFormat::Offset);
        // Wall clock as recorded, not shifted to UTC.
        assert_eq!(t.base_name(), "2023-05-01_101530");
    }

    #[test]
    fn parse_positive_offset() {
        let t = parse("2019:12:31 23:59:59+09:00").unwrap();
        assert_eq!(t.offset(), FixedOffset::east_opt(9 * 3600));
        assert_eq!(t.base_name(), "2019-12-31_235959");
    }

    #[test]
    fn parse_trims_whitespace() {
        let t = parse("  2023:05:01 10:15:30\n").unwrap();
        assert_eq!(t.format(), TimestampFormat::Base);
    }

    #[test]
    fn parse_rejects_garbage() {
        match parse("not-a-date") {
            Err(RenameError::TimestampUnparseable(raw)) => assert_eq!(raw, "not-a-date"),
            other => panic!("expected TimestampUnparseable, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_sub_second_without_offset() {
        assert!(parse("2023:05:01 10:15:30.123").is_err());
    }

    #[test]
    fn parse_rejects_invalid_calendar_date() {
        assert!(parse("2023:02:30 10:15:30").is_err());
        assert!(parse("2023-05-01 10:15:30").is_err());
    }
}
