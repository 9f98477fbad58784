//! Identity provisioning.

use std::sync::Arc;

use tiergate::{
    TierResolver,
    naming::{identity_labels, identity_name, namespace_labels},
};
use tracing::info;

use crate::{
    control_plane::{ControlPlane, DeleteOutcome, EnsureOutcome},
    credentials::{CredentialServiceError, Stage},
};

/// Ensures tier namespaces and per-user identities exist at the control plane.
///
/// Every ensure is idempotent: an object that already exists, including one created by a
/// concurrent request, counts as success.
#[derive(Clone)]
pub struct IdentityProvisioner {
    control_plane: Arc<dyn ControlPlane>,
    tiers: Arc<dyn TierResolver>,
    tenant: String,
}

impl std::fmt::Debug for IdentityProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvisioner")
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

impl IdentityProvisioner {
    /// Build a provisioner for `tenant`.
    #[must_use]
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        tiers: Arc<dyn TierResolver>,
        tenant: impl Into<String>,
    ) -> Self {
        Self {
            control_plane,
            tiers,
            tenant: tenant.into(),
        }
    }

    /// Ensure the namespace of `tier` exists and return its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the tier is unknown or the control plane fails.
    pub async fn ensure_namespace(&self, tier: &str) -> Result<String, CredentialServiceError> {
        let namespace = self.tiers.namespace_for_tier(tier)?;

        let outcome = self
            .control_plane
            .ensure_namespace(&namespace, &namespace_labels(&self.tenant, tier))
            .await
            .map_err(CredentialServiceError::control_plane(
                Stage::EnsureNamespace,
                &namespace,
            ))?;

        if outcome == EnsureOutcome::Created {
            info!(%namespace, tier, "created tier namespace");
        }

        Ok(namespace)
    }

    /// Ensure the identity of `username` exists in `namespace` and return its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the username has no usable characters or the control plane fails.
    pub async fn ensure_identity(
        &self,
        namespace: &str,
        username: &str,
        tier: &str,
    ) -> Result<String, CredentialServiceError> {
        let identity = identity_name(username)?;

        let outcome = self
            .control_plane
            .ensure_identity(namespace, &identity, &identity_labels(&self.tenant, tier))
            .await
            .map_err(CredentialServiceError::control_plane(
                Stage::EnsureIdentity,
                format!("{namespace}/{identity}"),
            ))?;

        if outcome == EnsureOutcome::Created {
            info!(namespace, %identity, "created identity");
        }

        Ok(identity)
    }

    /// Delete and recreate the identity of `username`, invalidating every credential bound to
    /// it. Nothing is recreated when the identity did not exist.
    ///
    /// The recreate always reaches the control plane: a cached view may still list the
    /// identity that was just deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion or recreation fails.
    pub async fn recreate_identity(
        &self,
        namespace: &str,
        username: &str,
        tier: &str,
    ) -> Result<DeleteOutcome, CredentialServiceError> {
        let identity = identity_name(username)?;
        let target = format!("{namespace}/{identity}");

        let outcome = self
            .control_plane
            .delete_identity(namespace, &identity)
            .await
            .map_err(CredentialServiceError::control_plane(
                Stage::DeleteIdentity,
                &target,
            ))?;

        if outcome == DeleteOutcome::Deleted {
            self.control_plane
                .create_identity(namespace, &identity, &identity_labels(&self.tenant, tier))
                .await
                .map_err(CredentialServiceError::control_plane(
                    Stage::RecreateIdentity,
                    &target,
                ))?;

            info!(namespace, %identity, "recreated identity");
        }

        Ok(outcome)
    }
}
