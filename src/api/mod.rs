//! Typed clients for the marketplace back-office endpoints.
//!
//! Every function here goes through the [`Gateway`](crate::gateway::Gateway),
//! so authorization and forced sign-out apply uniformly.

pub mod auth;
pub mod blogs;
pub mod content;
pub mod dashboard;
pub mod links;
pub mod products;
pub mod users;

use crate::gateway::ApiError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("upload response did not include a file path")]
    MissingPath,
}

/// `{"data": ...}`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Payloads that some endpoints wrap in `{"data": ...}` and others don't
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    pub fn into_inner(self) -> T {
        match self {
            Payload::Wrapped { data } | Payload::Bare(data) => data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageMeta {
    pub last_page: u32,
}

#[derive(Debug, Deserialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// The stored path from an upload response: `{"path"}` or
/// `{"success": true, "data": {"path"}}`
pub fn upload_path(body: &Value) -> Option<String> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return None;
    }
    body.get("path")
        .or_else(|| body.get("data").and_then(|d| d.get("path")))
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(String::from)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|n| n.and_utc())
        })
}

/// Timestamps that fail to parse become `None` rather than failing the
/// whole payload
pub(crate) fn lenient_timestamp<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Accept a string or a number; decimals arrive both ways
pub(crate) fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    #[test]
    fn test_upload_path_shapes() {
        assert_eq!(
            upload_path(&json!({"path": "videos/a.mp4"})).as_deref(),
            Some("videos/a.mp4")
        );
        assert_eq!(
            upload_path(&json!({"success": true, "data": {"path": "blogs/x.png"}})).as_deref(),
            Some("blogs/x.png")
        );
        assert_eq!(upload_path(&json!({"success": false, "data": {"path": "x"}})), None);
        assert_eq!(upload_path(&json!({"data": {}})), None);
        assert_eq!(upload_path(&json!({"path": ""})), None);
    }

    #[test]
    fn test_payload_wrapped_or_bare() {
        let wrapped: Payload<Vec<u32>> = serde_json::from_value(json!({"data": [1, 2]})).unwrap();
        assert_eq!(wrapped.into_inner(), vec![1, 2]);
        let bare: Payload<Vec<u32>> = serde_json::from_value(json!([3])).unwrap();
        assert_eq!(bare.into_inner(), vec![3]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let t = parse_timestamp("2024-05-01T10:00:00.000000Z").unwrap();
        assert_eq!(t.year(), 2024);
        assert!(parse_timestamp("2024-05-01 10:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
