//! Sign-in against `/login`.

use super::Envelope;
use crate::gateway::{ApiError, Form, Gateway};
use crate::guard::RoleAllowList;
use crate::session::User;
use crate::storage::StorageError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("this account's role may not use the admin console")]
    Forbidden,
    #[error("the server did not return a session token")]
    MissingToken,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("signed in, but the session could not be saved: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Deserialize)]
struct Credentials {
    token: String,
    user: User,
}

/// Exchange email and password for a session.
///
/// The session store is only touched when the account's first role is on
/// the allow-list.
pub fn login(
    gateway: &Gateway,
    allowed: &RoleAllowList,
    email: &str,
    password: &str,
) -> Result<User, LoginError> {
    let form = Form::new().text("email", email).text("password", password);
    let resp: Envelope<Credentials> = gateway.post_form("/login", form)?;
    let Credentials { token, user } = resp.data;
    if token.is_empty() {
        return Err(LoginError::MissingToken);
    }

    if !allowed.permits(&user) {
        tracing::warn!(
            user = %user.email,
            role = user.primary_role().map(|r| r.id),
            "sign-in refused for role outside the allow-list"
        );
        return Err(LoginError::Forbidden);
    }

    gateway.session().login(token, user.clone())?;
    Ok(user)
}

pub fn logout(gateway: &Gateway) -> Result<(), StorageError> {
    gateway.session().logout()
}
