//! Credential validation.

use std::{sync::Arc, time::Duration};

use jiff::Timestamp;
use tiergate::{
    CredentialStatus, UserContext,
    claims::{extract_jti, token_hash},
    naming::audience,
};
use tracing::{debug, error, warn};

use crate::{
    control_plane::{ControlPlane, ControlPlaneError, Introspection},
    store::CredentialStore,
};

/// What validation does when the deny-list cannot be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DenyListPolicy {
    /// Reject the credential.
    #[default]
    FailClosed,

    /// Accept the credential on the control plane's word alone.
    FailOpen,
}

/// Verifies bearer credentials with the control plane and the local deny-list.
#[derive(Clone)]
pub struct CredentialValidator {
    control_plane: Arc<dyn ControlPlane>,
    store: Arc<dyn CredentialStore>,
    audiences: Vec<String>,
    policy: DenyListPolicy,
    timeout: Duration,
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("audiences", &self.audiences)
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CredentialValidator {
    /// Build a validator accepting the audience of `tenant`.
    #[must_use]
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        store: Arc<dyn CredentialStore>,
        tenant: &str,
        policy: DenyListPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            control_plane,
            store,
            audiences: vec![audience(tenant)],
            policy,
            timeout,
        }
    }

    /// Validate a bearer token.
    ///
    /// Anything short of a positive answer, including timeouts and control-plane errors,
    /// yields an unauthenticated context.
    pub async fn validate(&self, token: &str) -> UserContext {
        if token.is_empty() {
            return UserContext::unauthenticated();
        }

        if let Ok(user) = tokio::time::timeout(self.timeout, self.verify(token)).await {
            return user;
        }

        error!(timeout = ?self.timeout, "credential validation timed out");

        UserContext::unauthenticated()
    }

    async fn verify(&self, token: &str) -> UserContext {
        let introspection = match self.introspect(token).await {
            Ok(introspection) => introspection,
            Err(error) => {
                error!(%error, "control plane failed to introspect credential");
                return UserContext::unauthenticated();
            }
        };

        if !introspection.authenticated {
            return UserContext::unauthenticated();
        }

        let principal = introspection.principal;

        if principal.identity.is_some() && self.is_denied(token).await {
            return UserContext::unauthenticated();
        }

        UserContext {
            username: principal.username,
            uid: principal.uid,
            groups: principal.groups,
            is_authenticated: true,
            jti: extract_jti(token).ok(),
        }
    }

    /// Scoped to this instance's audience first, then unscoped for caller tokens minted
    /// elsewhere.
    async fn introspect(&self, token: &str) -> Result<Introspection, ControlPlaneError> {
        let scoped = self.control_plane.introspect(token, &self.audiences).await?;

        if scoped.authenticated {
            return Ok(scoped);
        }

        debug!("credential rejected for instance audience, retrying without audience");

        self.control_plane.introspect(token, &[]).await
    }

    async fn is_denied(&self, token: &str) -> bool {
        match self.store.find_by_token_hash(&token_hash(token)).await {
            Ok(Some(record)) => {
                let denied = record.status(Timestamp::now()) == CredentialStatus::Expired;

                if denied {
                    debug!(id = %record.id, "credential is revoked");
                }

                denied
            }
            Ok(None) => false,
            Err(error) => match self.policy {
                DenyListPolicy::FailClosed => {
                    error!(%error, "deny-list unavailable, rejecting credential");
                    true
                }
                DenyListPolicy::FailOpen => {
                    warn!(%error, "deny-list unavailable, accepting credential");
                    false
                }
            },
        }
    }
}
