//! Built-in value conversions for each transform kind.
//!
//! Inbound conversions turn wire strings into rich values; outbound conversions
//! turn them back. Anything that does not convert is returned unchanged.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use tracing::trace;

use crate::transform::{TransformKind, TransformProgram, TransformResolver};
use crate::value::Value;

/// Which way a payload is travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Response payloads: wire format to rich values
    Inbound,
    /// Request payloads: rich values to wire format
    Outbound,
}

/// Parse an RFC 3339 date-time or a `YYYY-MM-DD` date.
pub fn parse_date(value: Value) -> Value {
    let Value::String(text) = value else {
        return value;
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Value::Date(parsed);
    }
    if let Ok(day) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Value::Day(day);
    }
    trace!(value = %text, "Leaving unparseable date string as is.");
    Value::String(text)
}

pub fn format_date(value: Value) -> Value {
    match value {
        Value::Date(date) => Value::String(render_date(&date)),
        Value::Day(day) => Value::String(day.format("%Y-%m-%d").to_string()),
        other => other,
    }
}

fn render_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Decode standard or URL-safe base64.
pub fn decode_binary(value: Value) -> Value {
    let Value::String(text) = value else {
        return value;
    };
    match STANDARD.decode(&text).or_else(|_| URL_SAFE.decode(&text)) {
        Ok(bytes) => Value::Binary(bytes),
        Err(err) => {
            trace!(error = %err, "Leaving undecodable base64 string as is.");
            Value::String(text)
        }
    }
}

pub fn encode_binary(value: Value) -> Value {
    match value {
        Value::Binary(bytes) => Value::String(STANDARD.encode(bytes)),
        other => other,
    }
}

/// The conversion function for a kind and direction.
pub fn transformer_for(kind: TransformKind, direction: Direction) -> fn(Value) -> Value {
    match (kind, direction) {
        (TransformKind::Date, Direction::Inbound) => parse_date,
        (TransformKind::Date, Direction::Outbound) => format_date,
        (TransformKind::Binary, Direction::Inbound) => decode_binary,
        (TransformKind::Binary, Direction::Outbound) => encode_binary,
    }
}

/// Programs linked to one payload position, keyed by kind.
pub trait ProgramSource {
    fn programs(&self, kind: TransformKind) -> &[TransformProgram];
}

/// Run every kind's programs over `payload` with the built-in transformers.
pub fn convert_payload<R, P>(resolver: &R, links: &P, payload: &mut Value, direction: Direction)
where
    R: TransformResolver + ?Sized,
    P: ProgramSource + ?Sized,
{
    for kind in TransformKind::ALL {
        let programs = links.programs(kind);
        if programs.is_empty() {
            continue;
        }
        crate::interpreter::transform_payload(
            resolver,
            payload,
            kind,
            transformer_for(kind, direction),
            programs,
        );
    }
}
