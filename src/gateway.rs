//! HTTP gateway: the one path every API call takes.
//!
//! A call is built as a [`Request`], run through the ordered outgoing
//! stages, handed to a [`Transport`], and the outcome is run through the
//! ordered incoming stages before the caller sees it. The stages carry the
//! cross-cutting policy:
//!
//! - default `Accept`/`Content-Type` headers
//! - bearer authorization from the session store
//! - no preset `Content-Type` on multipart uploads, so the transport can
//!   write its own boundary
//! - non-2xx statuses become [`ApiError::Status`]
//! - a 401 signs the session out and the error still reaches the caller

use crate::session::{Session, SessionStore};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// The `message` field of a JSON error body, if the server sent one
    pub fn server_message(&self) -> Option<String> {
        match self {
            ApiError::Status { body, .. } => serde_json::from_str::<Value>(body)
                .ok()?
                .get("message")?
                .as_str()
                .map(String::from),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Request headers with case-insensitive names, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a header, replacing any existing value
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.remove(name);
        self.0.push((name.to_string(), value.into()));
    }

    /// Set a header only if it is not already present
    pub fn set_default(&mut self, name: &str, value: impl Into<String>) {
        if !self.contains(name) {
            self.0.push((name.to_string(), value.into()));
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartBody {
    Text(String),
    File {
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub body: PartBody,
}

/// A multipart form payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    parts: Vec<Part>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.to_string(),
            body: PartBody::Text(value.into()),
        });
        self
    }

    pub fn file(
        mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(Part {
            name: name.to_string(),
            body: PartBody::File {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                bytes,
            },
        });
        self
    }

    /// Attach a file from disk, guessing its media type from the extension
    pub fn file_from_path(self, name: &str, path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(self.file(name, &filename, media_type_for(path), bytes))
    }

    #[cfg(test)]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Encode as `multipart/form-data` using `boundary`
    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match &part.body {
                PartBody::Text(value) => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            escape_quoted(&part.name)
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                PartBody::File {
                    filename,
                    content_type,
                    bytes,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            escape_quoted(&part.name),
                            escape_quoted(filename),
                            content_type
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(bytes);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        out
    }
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Media type for an upload, from the file extension
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Form),
}

impl Body {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Body::Multipart(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>, body: Body) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::default(),
            body,
        }
    }
}

/// A response as received, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Transform applied to every request before it is sent
pub trait RequestStage {
    fn apply(&self, request: Request, session: &Session) -> Request;
}

/// Transform applied to every outcome before the caller sees it.
/// Stages may mutate the session store.
pub trait ResponseStage {
    fn apply(
        &self,
        outcome: Result<Response, ApiError>,
        session: &SessionStore,
    ) -> Result<Response, ApiError>;
}

/// `Accept: application/json`, plus a JSON content type for JSON bodies
pub struct DefaultHeaders;

impl RequestStage for DefaultHeaders {
    fn apply(&self, mut request: Request, _session: &Session) -> Request {
        request.headers.set_default("Accept", "application/json");
        if matches!(request.body, Body::Json(_)) {
            request
                .headers
                .set_default("Content-Type", "application/json");
        }
        request
    }
}

pub struct BearerAuth;

impl RequestStage for BearerAuth {
    fn apply(&self, mut request: Request, session: &Session) -> Request {
        if let Some(token) = session.token() {
            request
                .headers
                .set("Authorization", format!("Bearer {}", token));
        }
        request
    }
}

/// Drop any preset content type on multipart bodies. Must run after the
/// defaults are applied.
pub struct MultipartContentType;

impl RequestStage for MultipartContentType {
    fn apply(&self, mut request: Request, _session: &Session) -> Request {
        if request.body.is_multipart() {
            request.headers.remove("Content-Type");
        }
        request
    }
}

/// Turn any non-2xx response into [`ApiError::Status`]
pub struct StatusCheck;

impl ResponseStage for StatusCheck {
    fn apply(
        &self,
        outcome: Result<Response, ApiError>,
        _session: &SessionStore,
    ) -> Result<Response, ApiError> {
        match outcome {
            Ok(resp) if !resp.is_success() => Err(ApiError::Status {
                status: resp.status,
                body: resp.body,
            }),
            other => other,
        }
    }
}

/// Sign out on 401 and pass the failure on unchanged
pub struct UnauthorizedLogout;

impl ResponseStage for UnauthorizedLogout {
    fn apply(
        &self,
        outcome: Result<Response, ApiError>,
        session: &SessionStore,
    ) -> Result<Response, ApiError> {
        if let Err(err) = &outcome {
            if err.is_unauthorized() {
                tracing::warn!("server rejected the session token, signing out");
                if let Err(e) = session.logout() {
                    tracing::warn!(error = %e, "could not persist forced sign-out");
                }
            }
        }
        outcome
    }
}

pub struct Gateway {
    base_url: String,
    session: Rc<SessionStore>,
    transport: Box<dyn Transport>,
    request_stages: Vec<Box<dyn RequestStage>>,
    response_stages: Vec<Box<dyn ResponseStage>>,
}

impl Gateway {
    /// Gateway with the standard request and response stages
    pub fn new(base_url: &str, session: Rc<SessionStore>, transport: Box<dyn Transport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            transport,
            request_stages: vec![
                Box::new(DefaultHeaders),
                Box::new(BearerAuth),
                Box::new(MultipartContentType),
            ],
            response_stages: vec![Box::new(StatusCheck), Box::new(UnauthorizedLogout)],
        }
    }

    pub fn session(&self) -> &Rc<SessionStore> {
        &self.session
    }

    /// Resolve a path against the base origin. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Run the outgoing stages over `request`
    pub fn prepare(&self, request: Request) -> Request {
        let session = self.session.snapshot();
        self.request_stages
            .iter()
            .fold(request, |req, stage| stage.apply(req, &session))
    }

    /// Send a request through the full pipeline
    pub fn execute(&self, request: Request) -> Result<Response, ApiError> {
        let request = self.prepare(request);
        tracing::debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let outcome = self.transport.send(&request);
        match &outcome {
            Ok(resp) => tracing::debug!(status = resp.status, url = %request.url, "received response"),
            Err(e) => tracing::debug!(error = %e, url = %request.url, "request failed"),
        }

        self.response_stages
            .iter()
            .fold(outcome, |out, stage| stage.apply(out, &self.session))
    }

    pub fn send(&self, method: Method, path: &str, body: Body) -> Result<Response, ApiError> {
        self.execute(Request::new(method, self.url(path), body))
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::Get, path, Body::Empty)?.json()
    }

    pub fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = Body::Json(serde_json::to_value(body)?);
        self.send(Method::Post, path, body)?.json()
    }

    pub fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = Body::Json(serde_json::to_value(body)?);
        self.send(Method::Put, path, body)?.json()
    }

    pub fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, ApiError> {
        self.send(Method::Post, path, Body::Multipart(form))?.json()
    }

    /// POST with no body, ignoring whatever the server returns
    pub fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::Post, path, Body::Empty).map(|_| ())
    }

    pub fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::Delete, path, Body::Empty).map(|_| ())
    }
}
