//! Lesson extraction from the StarPlan calendar export.
//!
//! This is not a general iCalendar parser. It reads the narrow format the
//! service emits: one property per physical line (folded continuation lines
//! are not joined), values taken verbatim after the first `:` (no parameter
//! parsing, no backslash unescaping) and date-times in the compact
//! `YYYYMMDDTHHMM..` form without timezone handling.

use std::{ops::Range, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime};

use crate::{CalendarError, Lesson, Result};

const BEGIN_EVENT: &str = "BEGIN:VEVENT";
const END_EVENT: &str = "END:VEVENT";

/// Shortest accepted date-time token, `YYYYMMDDTHHMM`
const MIN_TIMESTAMP_LEN: usize = 13;

/// Event properties copied into a [`Lesson`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Property {
    Start,
    End,
    Summary,
    Uid,
    Location,
    Description,
}

impl Property {
    const PREFIXES: [(&'static str, Self); 6] = [
        ("DTSTART", Self::Start),
        ("DTEND", Self::End),
        ("SUMMARY", Self::Summary),
        ("UID", Self::Uid),
        ("LOCATION", Self::Location),
        ("DESCRIPTION", Self::Description),
    ];

    /// Literal prefix match, so `DTSTART;TZID=...:` is still `Start`
    fn of(line: &str) -> Option<Self> {
        Self::PREFIXES
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix))
            .map(|&(_, property)| property)
    }

    fn apply(self, lesson: &mut Lesson, value: &str) -> std::result::Result<(), CalendarError> {
        match self {
            Self::Start => lesson.start = Some(parse_timestamp(value)?),
            Self::End => lesson.end = Some(parse_timestamp(value)?),
            Self::Summary => lesson.summary = value.to_string(),
            Self::Uid => lesson.id = value.to_string(),
            Self::Location => lesson.location = value.to_string(),
            Self::Description => lesson.description = value.to_string(),
        }
        Ok(())
    }
}

/// Extract the lessons of a calendar export in the order they appear.
///
/// Everything before the first `BEGIN:VEVENT` is skipped; input without such
/// a line is malformed. An event that is reopened before its `END:VEVENT`
/// is dropped, and so is a trailing event that never ends. Components nested
/// inside an event (alarms) are skipped.
pub fn extract_lessons(raw: &str) -> Result<Vec<Lesson>> {
    let mut lines = raw
        .lines()
        .enumerate()
        .skip_while(|(_, line)| !line.starts_with(BEGIN_EVENT))
        .peekable();

    if lines.peek().is_none() {
        return Err(CalendarError::MissingEventBlock.into());
    }

    let mut lessons = Vec::new();
    let mut current: Option<Lesson> = None;
    let mut nested = 0usize;

    for (idx, line) in lines {
        let line_no = idx + 1;

        if line.starts_with(BEGIN_EVENT) {
            if current.replace(Lesson::default()).is_some() {
                tracing::debug!("Dropping unterminated event before line {}", line_no);
            }
            nested = 0;
        } else if line.starts_with(END_EVENT) {
            let lesson = current
                .take()
                .ok_or(CalendarError::UnmatchedEnd { line: line_no })?;
            lessons.push(lesson);
            nested = 0;
        } else if let Some(lesson) = current.as_mut() {
            if line.starts_with("BEGIN:") {
                nested += 1;
            } else if line.starts_with("END:") {
                nested = nested.saturating_sub(1);
            } else if nested == 0 {
                if let Some(property) = Property::of(line) {
                    let (_, value) = line
                        .split_once(':')
                        .ok_or(CalendarError::MissingValue { line: line_no })?;
                    property.apply(lesson, value)?;
                }
            }
        } else if Property::of(line).is_some() {
            tracing::debug!("Ignoring property outside of an event on line {}", line_no);
        }
    }

    if current.is_some() {
        tracing::debug!("Dropping unterminated event at end of input");
    }
    tracing::debug!("Extracted {} lessons", lessons.len());

    Ok(lessons)
}

/// Decode a compact date-time token by fixed offsets.
///
/// Year `0..4`, month `4..6`, day `6..8`, hour `9..11`, minute `11..13`.
/// Seconds and any `Z`/offset suffix are ignored, seconds become zero. The
/// month is the plain calendar month (1-12).
pub fn parse_timestamp(token: &str) -> std::result::Result<NaiveDateTime, CalendarError> {
    let invalid = |reason: &str| CalendarError::InvalidDateTime {
        value: token.to_string(),
        reason: reason.to_string(),
    };

    if token.len() < MIN_TIMESTAMP_LEN {
        return Err(invalid("shorter than 13 characters"));
    }

    let year: i32 = digits(token, 0..4).ok_or_else(|| invalid("bad year"))?;
    let month: u32 = digits(token, 4..6).ok_or_else(|| invalid("bad month"))?;
    let day: u32 = digits(token, 6..8).ok_or_else(|| invalid("bad day"))?;
    let hour: u32 = digits(token, 9..11).ok_or_else(|| invalid("bad hour"))?;
    let minute: u32 = digits(token, 11..13).ok_or_else(|| invalid("bad minute"))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid("no such date"))?
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| invalid("no such time"))
}

fn digits<T: FromStr>(token: &str, range: Range<usize>) -> Option<T> {
    token
        .get(range)
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
}
