use crate::error::ApiError;
use crate::model::{BookChanges, BookFilter, BookStatus, NewBook};
use crate::sanitize::{sanitize_text, sanitize_textarea};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    pub status: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
}

impl BookQuery {
    /// Blank values and a zero year are treated as not supplied.
    pub fn into_filter(self) -> BookFilter {
        BookFilter {
            status: self.status.filter(|s| !s.is_empty()),
            author: self.author.filter(|s| !s.is_empty()),
            year: self.year.map(|y| parse_int_prefix(&y)).filter(|y| *y != 0),
        }
    }
}

/// Body of `POST /books` and `PUT /books/{id}`.
///
/// Forms post everything as strings, so numbers are accepted for text fields and
/// strings for the year. `null` means the field was not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookPayload {
    #[serde(default, deserialize_with = "loose_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose_text", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "loose_int", skip_serializing_if = "Option::is_none")]
    pub publicationyear: Option<i64>,
    #[serde(default, deserialize_with = "loose_text", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl BookPayload {
    /// Sanitizes and defaults a create request. An unknown status falls back to `available`.
    pub fn into_new_book(self) -> Result<NewBook, ApiError> {
        let title = sanitize_text(self.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            return Err(ApiError::InvalidTitle);
        }

        Ok(NewBook {
            title,
            description: self.description.as_deref().map(sanitize_textarea).unwrap_or_default(),
            author: self.author.as_deref().map(sanitize_text).unwrap_or_default(),
            publicationyear: self.publicationyear.unwrap_or(0),
            status: self.status.as_deref().and_then(BookStatus::parse).unwrap_or_default(),
        })
    }

    /// Sanitizes an update request. An unknown status is dropped, so the stored one is kept.
    pub fn into_changes(self) -> Result<BookChanges, ApiError> {
        let title = match self.title {
            Some(raw) => {
                let title = sanitize_text(&raw);
                if title.is_empty() {
                    return Err(ApiError::InvalidTitle);
                }
                Some(title)
            }
            None => None,
        };

        Ok(BookChanges {
            title,
            description: self.description.as_deref().map(sanitize_textarea),
            author: self.author.as_deref().map(sanitize_text),
            publicationyear: self.publicationyear,
            status: self.status.as_deref().and_then(BookStatus::parse),
        })
    }
}

/// Leading-integer parse: `"1965abc"` is 1965, anything without leading digits is 0.
pub fn parse_int_prefix(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(if b { "1".to_string() } else { String::new() })),
        Some(other) => Err(D::Error::custom(format!("expected text, found {other}"))),
    }
}

fn loose_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64))),
        Some(Value::String(s)) => Ok(Some(parse_int_prefix(&s))),
        Some(Value::Bool(b)) => Ok(Some(b as i64)),
        Some(other) => Err(D::Error::custom(format!("expected a number, found {other}"))),
    }
}
