use super::{lenient_string, lenient_timestamp, Payload};
use crate::gateway::{ApiError, Gateway};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A marketplace customer account
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Account {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Case-insensitive substring match on name or email. An empty query
    /// matches everyone.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query) || self.email.to_lowercase().contains(&query)
    }
}

/// Accounts whose name or email contains `query`
pub fn search(accounts: Vec<Account>, query: &str) -> Vec<Account> {
    accounts.into_iter().filter(|a| a.matches(query)).collect()
}

pub fn list(gateway: &Gateway) -> Result<Vec<Account>, ApiError> {
    let payload: Payload<Vec<Account>> = gateway.get("/users")?;
    Ok(payload.into_inner())
}

pub fn delete(gateway: &Gateway, id: u64) -> Result<(), ApiError> {
    gateway.delete(&format!("/users/{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::gateway;
    use crate::gateway::Method;

    #[test]
    fn test_list_users() {
        let (gw, transport) = gateway();
        transport.reply(
            200,
            r#"{"data":[{"id":4,"name":"Sara","email":"s@x.com","city":null,
                "country":"EG","status":"active","phone":null,
                "created_at":"2024-03-01T09:00:00.000000Z"}]}"#,
        );

        let users = list(&gw).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].country.as_deref(), Some("EG"));
        assert!(users[0].created_at.is_some());
    }

    #[test]
    fn test_null_fields_do_not_break_the_listing() {
        let (gw, transport) = gateway();
        transport.reply(
            200,
            r#"{"data":[{"id":1,"name":"Omar","email":null,"status":null},
                {"id":2,"name":"Hana","email":"h@x.com","status":"onboarding"}]}"#,
        );

        let users = list(&gw).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].status, "");
        assert_eq!(users[0].email, "");
        assert_eq!(users[1].status, "onboarding");
    }

    #[test]
    fn test_search_by_name_or_email() {
        let (gw, transport) = gateway();
        transport.reply(
            200,
            r#"[{"id":1,"name":"Sara Adel","email":"sara@x.com"},
                {"id":2,"name":"Omar","email":"omar@GOLD.com"},
                {"id":3,"name":"Hana","email":"hana@x.com"}]"#,
        );
        let users = list(&gw).unwrap();

        let ids = |found: Vec<Account>| found.iter().map(|a| a.id).collect::<Vec<_>>();
        assert_eq!(ids(search(users.clone(), "SARA")), vec![1]);
        assert_eq!(ids(search(users.clone(), "gold.com")), vec![2]);
        assert_eq!(ids(search(users.clone(), "x.com")), vec![1, 3]);
        assert_eq!(ids(search(users.clone(), "")), vec![1, 2, 3]);
        assert!(search(users, "nobody").is_empty());
    }

    #[test]
    fn test_delete_user() {
        let (gw, transport) = gateway();
        delete(&gw, 4).unwrap();
        let sent = transport.last();
        assert_eq!(sent.method, Method::Delete);
        assert!(sent.url.ends_with("/users/4"));
    }
}
