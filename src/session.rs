//! Session store: who is signed in, and with which bearer token.
//!
//! The store is the only shared mutable state in the client. It changes
//! through exactly two entry points, [`SessionStore::login`] and
//! [`SessionStore::logout`], and each of them writes the whole state to
//! durable storage right after updating memory. Readers get an owned
//! [`Session`] snapshot.

use crate::storage::{Storage, StorageError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Namespace key of the persisted session record
pub const STORAGE_KEY: &str = "auth-storage";

/// Layout version of the persisted record
const STORAGE_VERSION: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
}

/// Identity of the signed-in staff member as returned by `/login`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    /// The first listed role, which is the one access checks look at
    pub fn primary_role(&self) -> Option<&Role> {
        self.roles.first()
    }
}

/// Immutable view of the session at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: Option<String>,
    pub current_user: Option<User>,
    pub is_authenticated: bool,
}

impl Session {
    /// Requires a usable token as well as the flag
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated && self.token().is_some()
    }

    /// The bearer token. An empty string counts as no token.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }
}

#[derive(Deserialize, Serialize)]
struct Persisted {
    state: Session,
    #[serde(default)]
    version: u32,
}

pub struct SessionStore {
    state: RefCell<Session>,
    storage: Box<dyn Storage>,
}

impl SessionStore {
    /// Open a store over `storage`, rehydrating any previously saved session.
    ///
    /// A missing, unreadable or malformed record yields an empty session;
    /// the problem is logged and startup continues.
    pub fn open(storage: Box<dyn Storage>) -> Self {
        let state = match storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => decode(&raw),
            Ok(None) => Session::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read saved session, starting signed out");
                Session::default()
            }
        };

        if state.is_authenticated() {
            tracing::debug!(
                user = state.current_user().map(|u| u.email.as_str()),
                "restored saved session"
            );
        }

        Self {
            state: RefCell::new(state),
            storage,
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Replace the session with `token` and `user`.
    ///
    /// No checks are made on `user`; callers vet role membership first.
    /// Memory is updated even when the durable write fails.
    pub fn login(&self, token: impl Into<String>, user: User) -> Result<(), StorageError> {
        let next = Session {
            token: Some(token.into()),
            current_user: Some(user),
            is_authenticated: true,
        };
        tracing::info!(
            user = next.current_user().map(|u| u.email.as_str()),
            "signed in"
        );
        *self.state.borrow_mut() = next;
        self.persist()
    }

    /// Clear the session. Calling this while signed out is a no-op apart
    /// from rewriting the empty record.
    pub fn logout(&self) -> Result<(), StorageError> {
        let was_authenticated = self.is_authenticated();
        *self.state.borrow_mut() = Session::default();
        if was_authenticated {
            tracing::info!("signed out");
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), StorageError> {
        let record = Persisted {
            state: self.snapshot(),
            version: STORAGE_VERSION,
        };
        let raw = serde_json::to_string(&record)?;
        self.storage.set(STORAGE_KEY, &raw)
    }
}

fn decode(raw: &str) -> Session {
    let record: Persisted = match serde_json::from_str(raw) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "discarding malformed saved session");
            return Session::default();
        }
    };

    if record.version != STORAGE_VERSION {
        tracing::warn!(
            version = record.version,
            "discarding saved session with unknown layout version"
        );
        return Session::default();
    }

    let state = record.state;
    if state.is_authenticated && state.token().is_none() {
        tracing::warn!("saved session claims authentication without a token, ignoring it");
        return Session::default();
    }
    state
}

#[cfg(test)]
pub(crate) fn test_user(role_id: u64) -> User {
    User {
        id: 7,
        name: "Mona".to_string(),
        email: "mona@example.com".to_string(),
        phone: Some("0100000000".to_string()),
        avatar: None,
        permissions: ["products.approve".to_string()].into_iter().collect(),
        roles: vec![Role {
            id: role_id,
            name: if role_id == 1 { "admin" } else { "member" }.to_string(),
        }],
    }
}
