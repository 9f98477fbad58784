//! Identity control plane
//!
//! The control plane owns namespaces and identities and is the only party that can mint or
//! verify bearer credentials. This module defines the operations the credential lifecycle
//! needs from it and a Kubernetes implementation.

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use tiergate::{BearerToken, naming::Labels};

pub mod errors;
mod kubernetes;

pub use errors::ControlPlaneError;
pub use kubernetes::KubernetesControlPlane;

/// Result of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The object was created by this call.
    Created,

    /// The object was already present.
    AlreadyExists,
}

/// Result of an identity deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The identity was deleted by this call.
    Deleted,

    /// There was no identity to delete.
    NotFound,
}

/// A credential minted by the control plane.
#[derive(Debug, Clone)]
pub struct MintedCredential {
    /// Raw bearer token.
    pub token: BearerToken,

    /// Absolute expiry computed by the control plane.
    pub expires_at: Timestamp,
}

/// Namespaced identity a credential is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRef {
    /// Namespace of the identity.
    pub namespace: String,

    /// Identity name.
    pub name: String,
}

/// Principal reported by token introspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    /// Principal username as reported by the control plane.
    pub username: String,

    /// Principal uid.
    pub uid: String,

    /// Groups the principal belongs to.
    pub groups: Vec<String>,

    /// Set when the principal is a provisioned identity rather than a human user.
    pub identity: Option<IdentityRef>,
}

/// Outcome of presenting a token to the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Introspection {
    /// Whether the control plane accepted the token.
    pub authenticated: bool,

    /// The authenticated principal; empty when not authenticated.
    pub principal: Principal,
}

impl Introspection {
    /// A rejected token.
    #[must_use]
    pub fn rejected() -> Self {
        Self::default()
    }

    /// An accepted token for `principal`.
    #[must_use]
    pub fn accepted(principal: Principal) -> Self {
        Self {
            authenticated: true,
            principal,
        }
    }
}

/// Operations consumed from the identity control plane.
#[automock]
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create the namespace if it does not exist.
    async fn ensure_namespace(
        &self,
        name: &str,
        labels: &Labels,
    ) -> Result<EnsureOutcome, ControlPlaneError>;

    /// Create the identity in `namespace` if it does not exist.
    async fn ensure_identity(
        &self,
        namespace: &str,
        name: &str,
        labels: &Labels,
    ) -> Result<EnsureOutcome, ControlPlaneError>;

    /// Send the create for an identity without consulting any local cache. An identity that
    /// already exists still counts as success.
    async fn create_identity(
        &self,
        namespace: &str,
        name: &str,
        labels: &Labels,
    ) -> Result<EnsureOutcome, ControlPlaneError>;

    /// Mint a credential bound to an identity, scoped to `audience`, living for `ttl`.
    async fn mint_credential(
        &self,
        namespace: &str,
        identity: &str,
        audience: &str,
        ttl: SignedDuration,
    ) -> Result<MintedCredential, ControlPlaneError>;

    /// Delete an identity, invalidating every credential bound to it.
    async fn delete_identity(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeleteOutcome, ControlPlaneError>;

    /// Verify a token. An empty `audiences` slice accepts tokens of any audience.
    async fn introspect(
        &self,
        token: &str,
        audiences: &[String],
    ) -> Result<Introspection, ControlPlaneError>;
}

const SERVICE_ACCOUNT_PREFIX: &str = "system:serviceaccount:";

/// Parse an identity-backed principal username (`system:serviceaccount:{namespace}:{name}`).
#[must_use]
pub fn parse_identity_username(username: &str) -> Option<IdentityRef> {
    let rest = username.strip_prefix(SERVICE_ACCOUNT_PREFIX)?;
    let (namespace, name) = rest.split_once(':')?;

    if namespace.is_empty() || name.is_empty() || name.contains(':') {
        return None;
    }

    Some(IdentityRef {
        namespace: namespace.to_string(),
        name: name.to_string(),
    })
}

/// Principal username of an identity.
#[must_use]
pub fn identity_username(namespace: &str, name: &str) -> String {
    format!("{SERVICE_ACCOUNT_PREFIX}{namespace}:{name}")
}
