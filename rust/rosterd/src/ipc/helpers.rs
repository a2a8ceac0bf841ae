//! Parsing of raw form values. The UI forwards inputs as typed, so numbers
//! may arrive as strings and optional fields as empty strings.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::RosterError;
use crate::model::StudentStatus;

type Parsed<T> = Result<T, RosterError>;

/// Three states for patchable fields: untouched, cleared, or set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn into_option(self) -> Option<Option<T>> {
        match self {
            Self::Keep => None,
            Self::Clear => Some(None),
            Self::Set(v) => Some(Some(v)),
        }
    }
}

fn blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

pub fn opt_str<'a>(params: &'a Value, key: &str) -> Parsed<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(RosterError::validation(key, "must be a string")),
    }
}

pub fn req_str<'a>(params: &'a Value, key: &str) -> Parsed<&'a str> {
    opt_str(params, key)?.ok_or_else(|| RosterError::validation(key, "is required"))
}

pub fn opt_id<T>(
    params: &Value,
    key: &str,
    parse: impl Fn(&str, &str) -> Parsed<T>,
) -> Parsed<Option<T>> {
    match params.get(key) {
        Some(v) if blank(v) => Ok(None),
        None => Ok(None),
        Some(Value::String(s)) => parse(key, s).map(Some),
        Some(_) => Err(RosterError::validation(key, "ids are strings")),
    }
}

pub fn req_id<T>(params: &Value, key: &str, parse: impl Fn(&str, &str) -> Parsed<T>) -> Parsed<T> {
    opt_id(params, key, parse)?.ok_or_else(|| RosterError::validation(key, "is required"))
}

/// Absent keeps the current reference; `null` or `""` clears it.
pub fn patch_id<T>(
    params: &Value,
    key: &str,
    parse: impl Fn(&str, &str) -> Parsed<T>,
) -> Parsed<Patch<T>> {
    match params.get(key) {
        None => Ok(Patch::Keep),
        Some(v) if blank(v) => Ok(Patch::Clear),
        Some(Value::String(s)) => parse(key, s).map(Patch::Set),
        Some(_) => Err(RosterError::validation(key, "ids are strings")),
    }
}

/// A JSON number or a numeric string; a decimal comma is accepted.
pub fn opt_number(params: &Value, key: &str) -> Parsed<Option<f64>> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if blank(v) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| RosterError::validation(key, "not a number")),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| RosterError::validation(key, format!("not a number: {s:?}"))),
        Some(_) => Err(RosterError::validation(key, "not a number")),
    }
}

pub fn req_number(params: &Value, key: &str) -> Parsed<f64> {
    opt_number(params, key)?.ok_or_else(|| RosterError::validation(key, "is required"))
}

pub fn opt_count(params: &Value, key: &str) -> Parsed<Option<u32>> {
    let Some(n) = opt_number(params, key)? else {
        return Ok(None);
    };
    if n.fract() != 0.0 || n < 0.0 || n > u32::MAX as f64 {
        return Err(RosterError::validation(key, "must be a whole number"));
    }
    Ok(Some(n as u32))
}

pub fn req_count(params: &Value, key: &str) -> Parsed<u32> {
    opt_count(params, key)?.ok_or_else(|| RosterError::validation(key, "is required"))
}

fn parse_date(key: &str, raw: &str) -> Parsed<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| RosterError::validation(key, format!("expected YYYY-MM-DD, got {raw:?}")))
}

pub fn opt_date(params: &Value, key: &str) -> Parsed<Option<NaiveDate>> {
    opt_id(params, key, parse_date)
}

pub fn patch_date(params: &Value, key: &str) -> Parsed<Patch<NaiveDate>> {
    patch_id(params, key, parse_date)
}

pub fn opt_status(params: &Value, key: &str) -> Parsed<Option<StudentStatus>> {
    match opt_str(params, key)? {
        Some(s) if !s.trim().is_empty() => StudentStatus::parse(s).map(Some),
        _ => Ok(None),
    }
}
