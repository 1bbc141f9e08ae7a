//! Outbound social links shown in the app.

use super::{lenient_string, lenient_timestamp, Payload};
use crate::gateway::{ApiError, Gateway};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Links created here are always of this type
pub const LINK_TYPE: &str = "social";

/// The app shows at most this many social links
pub const MAX_SOCIAL_LINKS: usize = 5;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no more than {} social links can be added", MAX_SOCIAL_LINKS)]
    LimitReached,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Link {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Link {
    pub fn is_social(&self) -> bool {
        self.kind.as_deref() == Some(LINK_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkDraft {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl LinkDraft {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: LINK_TYPE,
        }
    }
}

/// Social links only; other link types share the endpoint but are not
/// managed here
pub fn list(gateway: &Gateway) -> Result<Vec<Link>, ApiError> {
    let payload: Payload<Vec<Link>> = gateway.get("/outside-links?per_page=15&page=1")?;
    Ok(payload
        .into_inner()
        .into_iter()
        .filter(Link::is_social)
        .collect())
}

/// Add a link, refusing once [`MAX_SOCIAL_LINKS`] already exist
pub fn create(gateway: &Gateway, draft: &LinkDraft) -> Result<(), LinkError> {
    let existing = list(gateway)?.len();
    if existing >= MAX_SOCIAL_LINKS {
        tracing::debug!(existing, "social link limit reached");
        return Err(LinkError::LimitReached);
    }
    gateway.post_json::<_, Value>("/outside-links", draft)?;
    Ok(())
}

pub fn update(gateway: &Gateway, id: u64, draft: &LinkDraft) -> Result<(), ApiError> {
    gateway
        .put_json::<_, Value>(&format!("/outside-links/{}", id), draft)
        .map(|_| ())
}

pub fn delete(gateway: &Gateway, id: u64) -> Result<(), ApiError> {
    gateway.delete(&format!("/outside-links/{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::gateway;
    use crate::gateway::{Body, Method};
    use serde_json::json;

    fn listing(social: usize) -> String {
        let mut links: Vec<Value> = (1..=social)
            .map(|id| json!({"id": id, "name": "X", "value": "https://x.com", "type": "social"}))
            .collect();
        links.push(json!({"id": 99, "name": "Store", "value": "https://store", "type": "store"}));
        json!({ "data": links }).to_string()
    }

    #[test]
    fn test_draft_always_social() {
        let draft = LinkDraft::new("Instagram", "https://instagram.com/gold");
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({"name": "Instagram", "value": "https://instagram.com/gold", "type": "social"})
        );
    }

    #[test]
    fn test_list_keeps_social_links_only() {
        let (gw, transport) = gateway();
        transport.reply(
            200,
            r#"{"data":[{"id":1,"name":"X","value":"https://x.com/g","type":"social",
                "created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"},
                {"id":2,"name":"Other","value":null,"type":null}]}"#,
        );
        let links = list(&gw).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, 1);
        assert!(transport.last().url.ends_with("/outside-links?per_page=15&page=1"));
    }

    #[test]
    fn test_create_below_limit_posts() {
        let (gw, transport) = gateway();
        transport.reply(200, &listing(MAX_SOCIAL_LINKS - 1));

        create(&gw, &LinkDraft::new("Y", "https://y.com")).unwrap();
        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].method, Method::Post);
        assert!(sent[1].url.ends_with("/outside-links"));
    }

    #[test]
    fn test_create_at_limit_is_refused() {
        let (gw, transport) = gateway();
        transport.reply(200, &listing(MAX_SOCIAL_LINKS));

        let err = create(&gw, &LinkDraft::new("Y", "https://y.com")).unwrap_err();
        assert!(matches!(err, LinkError::LimitReached));
        // Only the listing went out
        assert_eq!(transport.sent.borrow().len(), 1);
        assert_eq!(transport.last().method, Method::Get);
    }

    #[test]
    fn test_update_and_delete_endpoints() {
        let (gw, transport) = gateway();
        update(&gw, 1, &LinkDraft::new("X", "https://x.com/gold")).unwrap();
        let sent = transport.last();
        assert_eq!(sent.method, Method::Put);
        assert!(sent.url.ends_with("/outside-links/1"));
        let Body::Json(body) = &sent.body else {
            panic!("expected json body");
        };
        assert_eq!(body["type"], "social");

        delete(&gw, 1).unwrap();
        assert_eq!(transport.last().method, Method::Delete);
    }
}
