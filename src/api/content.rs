//! Static app content: privacy policy, onboarding titles and the promo video.
//!
//! Titles and the video live in the `app-content` table of the content
//! service, which has its own origin. Each onboarding title is a fixed row.

use super::{lenient_string, lenient_timestamp, upload_path, Envelope, Payload, UploadError};
use crate::gateway::{media_type_for, ApiError, Form, Gateway};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::Path;

/// Row id of the promo video
pub const VIDEO_CONTENT_ID: u64 = 1;

/// Largest accepted video upload
pub const MAX_VIDEO_BYTES: u64 = 30_000 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Privacy {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default)]
    pub list: Vec<String>,
}

pub fn privacy(gateway: &Gateway) -> Result<Privacy, ApiError> {
    let payload: Payload<Privacy> = gateway.get("/privacy")?;
    Ok(payload.into_inner())
}

/// Save the policy. Blank items are dropped before sending.
pub fn save_privacy(gateway: &Gateway, title: &str, items: &[String]) -> Result<(), ApiError> {
    let list: Vec<&str> = items
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
        .collect();
    gateway
        .post_json::<_, Value>("/privacy", &json!({ "title": title, "list": list }))
        .map(|_| ())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TitleKey {
    Title,
    SubTitle1,
    Title2,
    SubTitle2,
    Title3,
    SubTitle3,
}

impl TitleKey {
    pub const ALL: [TitleKey; 6] = [
        TitleKey::Title,
        TitleKey::SubTitle1,
        TitleKey::Title2,
        TitleKey::SubTitle2,
        TitleKey::Title3,
        TitleKey::SubTitle3,
    ];

    /// Field name in the `app-content` map
    pub fn key(&self) -> &'static str {
        match self {
            TitleKey::Title => "title",
            TitleKey::SubTitle1 => "subTitle1",
            TitleKey::Title2 => "title2",
            TitleKey::SubTitle2 => "subTitle2",
            TitleKey::Title3 => "title3",
            TitleKey::SubTitle3 => "subTitle3",
        }
    }

    /// Row id used for updates
    pub fn content_id(&self) -> u64 {
        match self {
            TitleKey::Title => 9,
            TitleKey::SubTitle1 => 10,
            TitleKey::Title2 => 11,
            TitleKey::SubTitle2 => 12,
            TitleKey::Title3 => 13,
            TitleKey::SubTitle3 => 14,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.key().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for TitleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn content_url(origin: &str, suffix: &str) -> String {
    format!("{}/{}", origin.trim_end_matches('/'), suffix)
}

/// Current onboarding titles, in display order. Missing ones are empty.
pub fn titles(gateway: &Gateway, origin: &str) -> Result<Vec<(TitleKey, String)>, ApiError> {
    let resp: Envelope<Map<String, Value>> = gateway.get(&content_url(origin, "app-content"))?;
    Ok(TitleKey::ALL
        .into_iter()
        .map(|k| {
            let value = resp
                .data
                .get(k.key())
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            (k, value)
        })
        .collect())
}

pub fn update_title(
    gateway: &Gateway,
    origin: &str,
    key: TitleKey,
    value: &str,
) -> Result<(), ApiError> {
    let url = content_url(origin, &format!("app-content/{}", key.content_id()));
    gateway
        .put_json::<_, Value>(&url, &json!({ "value": value }))
        .map(|_| ())
}

/// One `app-content` row
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentItem {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn current_video(gateway: &Gateway, origin: &str) -> Result<ContentItem, ApiError> {
    let url = content_url(origin, &format!("app-content/{}", VIDEO_CONTENT_ID));
    let resp: Envelope<ContentItem> = gateway.get(&url)?;
    Ok(resp.data)
}

/// Upload a new promo video and point the video row at it
pub fn upload_video(
    gateway: &Gateway,
    origin: &str,
    path: &Path,
) -> Result<ContentItem, UploadError> {
    let read_err = |source: std::io::Error| UploadError::Read {
        path: path.to_path_buf(),
        source,
    };
    if !media_type_for(path).starts_with("video/") {
        return Err(UploadError::Rejected(format!(
            "{} is not a video file",
            path.display()
        )));
    }
    let size = std::fs::metadata(path).map_err(read_err)?.len();
    if size > MAX_VIDEO_BYTES {
        return Err(UploadError::Rejected(format!(
            "video is {} KB, the limit is {} KB",
            size / 1024,
            MAX_VIDEO_BYTES / 1024
        )));
    }

    let form = Form::new().file_from_path("file", path).map_err(read_err)?;
    let body: Value = gateway.post_form(&content_url(origin, "upload/video"), form)?;
    let stored = upload_path(&body).ok_or(UploadError::MissingPath)?;
    tracing::info!(path = %stored, "video uploaded");

    let url = content_url(origin, &format!("app-content/{}", VIDEO_CONTENT_ID));
    let resp: Envelope<ContentItem> = gateway.put_json(&url, &json!({ "value": stored }))?;
    Ok(resp.data)
}

/// Public address of a stored file
pub fn storage_url(storage_origin: &str, value: &str) -> String {
    format!(
        "{}/storage/{}",
        storage_origin.trim_end_matches('/'),
        value.trim_start_matches('/')
    )
}
