//! Actor identity and ownership guards.
//!
//! Tokens are verified upstream; the gateway forwards the caller's id and
//! role as request headers and this crate turns them into an [`Actor`].

use std::fmt;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};

use bookshelf_http::error::AppError;
use bookshelf_kernel::settings::AuthSettings;

/// Opaque user reference issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Unknown roles fall back to the unprivileged `User`
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// The authenticated caller of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(id),
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(id),
            role: Role::Admin,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner of the record, or privileged
    pub fn can_modify(&self, owner: &UserId) -> bool {
        &self.user_id == owner || self.is_privileged()
    }
}

/// Header names carrying the forwarded identity
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
    pub user: String,
    pub role: String,
}

impl From<&AuthSettings> for IdentityHeaders {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            user: settings.user_header.to_ascii_lowercase(),
            role: settings.role_header.to_ascii_lowercase(),
        }
    }
}

impl Default for IdentityHeaders {
    fn default() -> Self {
        Self::from(&AuthSettings::default())
    }
}

impl<S> FromRequestParts<S> for Actor
where
    IdentityHeaders: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let headers = IdentityHeaders::from_ref(state);

        let user_id = parts
            .headers
            .get(headers.user.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                tracing::debug!(header = %headers.user, "request without forwarded identity");
                AppError::unauthorized("authentication required")
            })?;

        let role = parts
            .headers
            .get(headers.role.as_str())
            .and_then(|value| value.to_str().ok())
            .map(Role::parse)
            .unwrap_or(Role::User);

        Ok(Actor {
            user_id: UserId::new(user_id),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn owner_and_admin_can_modify() {
        let owner = UserId::new("u1");
        assert!(Actor::user("u1").can_modify(&owner));
        assert!(!Actor::user("u2").can_modify(&owner));
        assert!(Actor::admin("root").can_modify(&owner));
    }

    #[test]
    fn role_parsing_defaults_to_user() {
        assert_eq!(Role::parse("ADMIN"), Role::Admin);
        assert_eq!(Role::parse("editor"), Role::User);
    }

    #[tokio::test]
    async fn extracts_actor_from_headers() {
        let mut parts = parts(&[("x-user-id", "u1"), ("x-user-role", "admin")]);
        let actor = Actor::from_request_parts(&mut parts, &IdentityHeaders::default())
            .await
            .unwrap();
        assert_eq!(actor, Actor::admin("u1"));
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let mut parts = parts(&[("x-user-role", "admin")]);
        let err = Actor::from_request_parts(&mut parts, &IdentityHeaders::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn custom_header_names_are_honoured() {
        let settings = AuthSettings {
            user_header: "X-Forwarded-User".to_string(),
            role_header: "X-Forwarded-Role".to_string(),
        };
        let mut parts = parts(&[("x-forwarded-user", "u9")]);
        let actor = Actor::from_request_parts(&mut parts, &IdentityHeaders::from(&settings))
            .await
            .unwrap();
        assert_eq!(actor, Actor::user("u9"));
    }
}
