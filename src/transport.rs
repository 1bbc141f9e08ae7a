//! Network transport underneath the gateway.

use crate::gateway::{ApiError, Body, Request, Response};

/// Sends a finished request. Any HTTP status is a successful send; only
/// failing to get a response at all is an error.
pub trait Transport {
    fn send(&self, request: &Request) -> Result<Response, ApiError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
    with_credentials: bool,
}

impl UreqTransport {
    /// With credentials, one agent (and its cookie jar) serves every call.
    /// Without, each call starts from an empty jar.
    pub fn new(with_credentials: bool) -> Self {
        Self {
            agent: ureq::Agent::new(),
            with_credentials,
        }
    }

    fn agent(&self) -> ureq::Agent {
        if self.with_credentials {
            self.agent.clone()
        } else {
            ureq::Agent::new()
        }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> Result<Response, ApiError> {
        let mut req = self
            .agent()
            .request(request.method.as_str(), &request.url);
        for (name, value) in request.headers.iter() {
            req = req.set(name, value);
        }

        let result = match &request.body {
            Body::Empty => req.call(),
            Body::Json(value) => req.send_string(&serde_json::to_string(value)?),
            Body::Multipart(form) => {
                let boundary = format!("gold-admin-{}", uuid::Uuid::new_v4().simple());
                let bytes = form.encode(&boundary);
                req.set(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={}", boundary),
                )
                .send_bytes(&bytes)
            }
        };

        match result {
            Ok(r) => {
                let status = r.status();
                let body = r
                    .into_string()
                    .map_err(|e| ApiError::Transport(format!("reading response body: {}", e)))?;
                Ok(Response { status, body })
            }
            Err(ureq::Error::Status(status, r)) => {
                let body = r.into_string().unwrap_or_default();
                Ok(Response { status, body })
            }
            Err(e) => Err(ApiError::Transport(e.to_string())),
        }
    }
}
