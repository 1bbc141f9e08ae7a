//! Blog articles, created and updated as one nested document.

use super::{lenient_string, lenient_timestamp, upload_path, Payload, UploadError};
use crate::gateway::{ApiError, Form, Gateway};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlogContent {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub blog_title_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlogTitle {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub blog_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default)]
    pub contents: Vec<BlogContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Blog {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image_path: String,
    #[serde(default)]
    pub titles: Vec<BlogTitle>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One section of a blog draft
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SectionDraft {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub contents: Vec<String>,
}

/// Body of a create or full update
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlogDraft {
    pub name: String,
    pub image_path: String,
    #[serde(default)]
    pub titles: Vec<SectionDraft>,
}

impl BlogDraft {
    /// Wire payload; contents become `{"content": ...}` objects
    pub fn to_payload(&self) -> Value {
        let titles: Vec<Value> = self
            .titles
            .iter()
            .map(|t| {
                serde_json::json!({
                    "title": t.title,
                    "type": t.kind,
                    "contents": t.contents.iter()
                        .map(|c| serde_json::json!({ "content": c }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        serde_json::json!({
            "name": self.name,
            "image_path": self.image_path,
            "titles": titles,
        })
    }
}

impl From<&Blog> for BlogDraft {
    fn from(blog: &Blog) -> Self {
        Self {
            name: blog.name.clone(),
            image_path: blog.image_path.clone(),
            titles: blog
                .titles
                .iter()
                .map(|t| SectionDraft {
                    title: t.title.clone(),
                    kind: t.kind.clone(),
                    contents: t.contents.iter().map(|c| c.content.clone()).collect(),
                })
                .collect(),
        }
    }
}

pub fn list(gateway: &Gateway) -> Result<Vec<Blog>, ApiError> {
    let payload: Payload<Vec<Blog>> = gateway.get("/blogs")?;
    Ok(payload.into_inner())
}

pub fn delete(gateway: &Gateway, id: u64) -> Result<(), ApiError> {
    gateway.delete(&format!("/blogs/{}", id))
}

pub fn create(gateway: &Gateway, draft: &BlogDraft) -> Result<(), ApiError> {
    gateway
        .post_json::<_, Value>("/blogs/complete", &draft.to_payload())
        .map(|_| ())
}

pub fn update(gateway: &Gateway, id: u64, draft: &BlogDraft) -> Result<(), ApiError> {
    gateway
        .put_json::<_, Value>(&format!("/blogs/{}/complete", id), &draft.to_payload())
        .map(|_| ())
}

/// Upload a cover image and return its stored path
pub fn upload_image(gateway: &Gateway, path: &Path) -> Result<String, UploadError> {
    let form = Form::new()
        .file_from_path("file", path)
        .map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let body: Value = gateway.post_form("/upload", form)?;
    upload_path(&body).ok_or(UploadError::MissingPath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::gateway;
    use crate::gateway::{Body, Method};
    use std::io::Write;

    fn draft() -> BlogDraft {
        BlogDraft {
            name: "Caring for gold".to_string(),
            image_path: "blogs/cover.png".to_string(),
            titles: vec![SectionDraft {
                title: "Cleaning".to_string(),
                kind: "list".to_string(),
                contents: vec!["Warm water".to_string(), "Soft cloth".to_string()],
            }],
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = draft().to_payload();
        assert_eq!(payload["name"], "Caring for gold");
        assert_eq!(payload["titles"][0]["type"], "list");
        assert_eq!(payload["titles"][0]["contents"][1]["content"], "Soft cloth");
    }

    #[test]
    fn test_create_and_update_endpoints() {
        let (gw, transport) = gateway();
        create(&gw, &draft()).unwrap();
        let sent = transport.last();
        assert_eq!(sent.method, Method::Post);
        assert!(sent.url.ends_with("/blogs/complete"));
        assert!(matches!(sent.body, Body::Json(_)));

        update(&gw, 5, &draft()).unwrap();
        let sent = transport.last();
        assert_eq!(sent.method, Method::Put);
        assert!(sent.url.ends_with("/blogs/5/complete"));
    }

    #[test]
    fn test_list_bare_array() {
        let (gw, transport) = gateway();
        transport.reply(
            200,
            r#"[{"id":1,"name":"B","image_path":"b.png","titles":[{"id":2,"blog_id":1,
                "title":"T","type":"paragraph","contents":[{"id":3,"blog_title_id":2,"content":"C"}]}],
                "created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-02T00:00:00Z"}]"#,
        );
        let blogs = list(&gw).unwrap();
        assert_eq!(blogs[0].titles[0].contents[0].content, "C");

        let draft = BlogDraft::from(&blogs[0]);
        assert_eq!(draft.titles[0].contents, vec!["C".to_string()]);
    }

    #[test]
    fn test_upload_image() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let (gw, transport) = gateway();
        transport.reply(200, r#"{"success":true,"data":{"path":"uploads/cover.png"}}"#);

        let path = upload_image(&gw, file.path()).unwrap();
        assert_eq!(path, "uploads/cover.png");

        let sent = transport.last();
        assert!(!sent.headers.contains("Content-Type"));
        let Body::Multipart(form) = &sent.body else {
            panic!("upload must be multipart");
        };
        assert_eq!(form.parts()[0].name, "file");
    }

    #[test]
    fn test_upload_without_path_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"x").unwrap();

        let (gw, transport) = gateway();
        transport.reply(200, r#"{"success":false}"#);
        assert!(matches!(
            upload_image(&gw, file.path()),
            Err(UploadError::MissingPath)
        ));
    }
}
