//! Caller identity

use serde::{Deserialize, Serialize};

/// An authenticated caller, as established by an upstream authentication step or by
/// validating a previously issued credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Opaque username in the identity provider's format (email, LDAP DN, principal string).
    pub username: String,

    /// Unique id of the caller, when the identity provider supplies one.
    pub uid: String,

    /// Group names used for tier resolution.
    pub groups: Vec<String>,

    /// Whether the caller was authenticated.
    pub is_authenticated: bool,

    /// Credential identifier, set only when the context came from validating a credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl UserContext {
    /// Build an authenticated caller from upstream identity claims.
    #[must_use]
    pub fn authenticated(
        username: impl Into<String>,
        uid: impl Into<String>,
        groups: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            username: username.into(),
            uid: uid.into(),
            groups: groups.into_iter().map(Into::into).collect(),
            is_authenticated: true,
            jti: None,
        }
    }

    /// The context returned for a credential that did not authenticate.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::default()
    }
}
