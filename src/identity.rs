//! Identity collaborator boundary.
//!
//! The engines never read ambient session storage. Whoever owns the login
//! hands an `Identity` (user id + role) to each entry point explicitly.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::models::Role;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Access token is not a three-part JWT")]
    MalformedToken,
    #[error("Access token payload is not valid base64url JSON")]
    InvalidPayload,
    #[error("Access token has no user_id claim")]
    MissingUserId,
}

/// Source of the current user id and role. Read-only from the engines' side.
pub trait IdentityProvider: Send + Sync {
    fn user_id(&self) -> &str;
    /// `None` when the collaborator's role string is not one we know.
    fn role(&self) -> Option<Role>;
}

/// Immutable per-session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Option<Role>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role: Some(role),
        }
    }

    /// Build from the raw role string the login flow stored.
    pub fn from_role_str(user_id: impl Into<String>, role: &str) -> Self {
        let role = Role::parse_lenient(role);
        if role.is_none() {
            tracing::warn!("Unrecognized role string, using default routing");
        }
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Read the `user_id` claim from an access token's payload.
    ///
    /// The signature is NOT verified; the API server does that. This only
    /// recovers the id the portal needs for query parameters.
    pub fn from_access_token(token: &str, role: &str) -> Result<Self, IdentityError> {
        let mut parts = token.trim().split('.');
        let (Some(_header), Some(payload), Some(_sig), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(IdentityError::MalformedToken);
        };

        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| IdentityError::InvalidPayload)?;
        let claims: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|_| IdentityError::InvalidPayload)?;

        let user_id = match claims.get("user_id") {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(IdentityError::MissingUserId),
        };

        Ok(Self::from_role_str(user_id, role))
    }
}

impl IdentityProvider for Identity {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn role(&self) -> Option<Role> {
        self.role
    }
}
