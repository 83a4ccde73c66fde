//! Pulls the JSON payload embedded in a proposal's detail page.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use regex::Regex;
use serde_json::Value;

use crate::source::{DetailPage, SearchHit};

/// Matches the first inline script that assigns an object literal to a variable.
pub const DEFAULT_PAYLOAD_PATTERN: &str =
    r"(?s)<script[^>]*>\s*var\s+\w+\s*=\s*(\{.*?\})\s*;?\s*</script>";

/// The site spells the approval key two different ways, both of them wrong.
pub const APPROVAL_DATE_KEYS: [&str; 2] = ["approveDate", "aproveDate"];

/// Key under which the normalized approval timestamp is stored in the payload.
pub const CANONICAL_DATE_KEY: &str = "approvalDate";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%dT%H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

// Anything at or above this is taken to be epoch milliseconds.
const EPOCH_MILLIS_THRESHOLD: u64 = 100_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid payload pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("payload pattern '{0}' has no capture group")]
    MissingCaptureGroup(String),
    #[error("no embedded payload found in page")]
    NoPayload,
    #[error("embedded payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("embedded payload is not a JSON object")]
    NotAnObject,
    #[error("cannot parse timestamp {value} under key '{key}'")]
    InvalidTimestamp { key: String, value: String },
}

/// A proposal as recorded locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub id: String,
    pub title: String,
    pub link: String,
    pub approved_at: Option<DateTime<FixedOffset>>,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    pattern: Regex,
    utc_offset: FixedOffset,
}

impl Extractor {
    pub fn new(pattern: &str, utc_offset: FixedOffset) -> Result<Self, ExtractError> {
        let pattern = Regex::new(pattern)?;
        // captures_len counts the implicit whole-match group
        if pattern.captures_len() < 2 {
            return Err(ExtractError::MissingCaptureGroup(pattern.as_str().to_string()));
        }
        Ok(Self {
            pattern,
            utc_offset,
        })
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Returns the raw JSON text captured from `html`, if any.
    pub fn find_payload<'h>(&self, html: &'h str) -> Option<&'h str> {
        self.pattern
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    pub fn extract(&self, hit: &SearchHit, page: &DetailPage) -> Result<Proposal, ExtractError> {
        let raw = self.find_payload(&page.body).ok_or(ExtractError::NoPayload)?;
        let mut payload: Value = serde_json::from_str(raw)?;
        let object = payload.as_object_mut().ok_or(ExtractError::NotAnObject)?;

        let title = object
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .or(hit.title.as_deref())
            .map(normalize_ws)
            .unwrap_or_default();

        let mut approved_at = None;
        if let Some((key, value)) = approval_value(object) {
            let timestamp = normalize_timestamp(value, self.utc_offset).ok_or_else(|| {
                ExtractError::InvalidTimestamp {
                    key: key.to_string(),
                    value: value.to_string(),
                }
            })?;
            object.insert(
                CANONICAL_DATE_KEY.to_string(),
                Value::String(format_timestamp(&timestamp)),
            );
            approved_at = Some(timestamp);
        } else {
            tracing::debug!(id = hit.id, "proposal has no approval date");
        }

        Ok(Proposal {
            id: hit.id.clone(),
            title,
            link: page.url.clone(),
            approved_at,
            payload,
        })
    }
}

fn approval_value(object: &serde_json::Map<String, Value>) -> Option<(&'static str, &Value)> {
    APPROVAL_DATE_KEYS.iter().find_map(|key| match object.get(*key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some((*key, value)),
    })
}

/// Interprets `value` as a point in time and expresses it in `offset`.
///
/// Numbers are epoch seconds or milliseconds. Strings are RFC 3339, or a
/// naive date/time that is taken to be local to `offset`.
pub fn normalize_timestamp(value: &Value, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::Number(n) => {
            let n = n.as_i64()?;
            let utc = if n.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD {
                DateTime::<Utc>::from_timestamp_millis(n)?
            } else {
                DateTime::<Utc>::from_timestamp(n, 0)?
            };
            Some(utc.with_timezone(&offset))
        }
        Value::String(s) => parse_timestamp_str(s.trim(), offset),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&offset));
    }
    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    offset.from_local_datetime(&naive).single()
}

/// `2024-03-05T14:07:00+08:00`
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Collapse runs of whitespace into a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
