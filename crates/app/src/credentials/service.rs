//! Credential service.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use serde::Serialize;
use tiergate::{CredentialKind, CredentialRequest, CredentialView, TierResolver, UserContext};
use tracing::{info, warn};

use crate::{
    control_plane::{ControlPlane, DeleteOutcome},
    credentials::{
        CredentialIssuer, CredentialServiceError, CredentialValidator, DenyListPolicy,
        IdentityProvisioner, IssuedCredential,
    },
    store::CredentialStore,
};

const PARTIAL_REVOCATION: &str =
    "credentials invalidated at the control plane, but their records could not be marked expired";

/// Outcome of revoking every credential of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevokedCredentials {
    /// Tier namespace the user's identity lives in.
    pub namespace: String,

    /// Whether an identity existed and was recreated.
    pub identity_recreated: bool,

    /// Number of named-credential records marked expired.
    pub records_expired: u64,
}

/// Settings for [`TieredCredentialService`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Tenant (instance) name; prefixes namespaces and audiences.
    pub tenant: String,

    /// Deny-list behaviour when the store is unavailable during validation.
    pub deny_list_policy: DenyListPolicy,

    /// Upper bound on a single validation.
    pub validation_timeout: Duration,
}

/// Credential lifecycle operations used by the boundary layer.
#[automock]
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Mint a credential that is never recorded.
    async fn issue_ephemeral(
        &self,
        user: &UserContext,
        expiration: Option<SignedDuration>,
    ) -> Result<IssuedCredential, CredentialServiceError>;

    /// Mint a credential and record its metadata. `request.name` is required.
    async fn issue_named(
        &self,
        user: &UserContext,
        request: CredentialRequest,
    ) -> Result<IssuedCredential, CredentialServiceError>;

    /// The caller's named credentials in their current tier, newest first.
    async fn list(&self, user: &UserContext)
    -> Result<Vec<CredentialView>, CredentialServiceError>;

    /// One of the caller's named credentials.
    async fn get_one(
        &self,
        user: &UserContext,
        id: &str,
    ) -> Result<CredentialView, CredentialServiceError>;

    /// Expire one named credential's record. The credential itself stays valid at the control
    /// plane until it expires or [`CredentialService::revoke_all`] runs; validation rejects it
    /// through the deny-list in the meantime.
    async fn revoke_one(&self, user: &UserContext, id: &str) -> Result<(), CredentialServiceError>;

    /// Invalidate every credential of the caller by recreating their identity, then expire
    /// their records.
    async fn revoke_all(
        &self,
        user: &UserContext,
    ) -> Result<RevokedCredentials, CredentialServiceError>;

    /// Validate a bearer token.
    async fn validate(&self, token: &str) -> UserContext;
}

/// [`CredentialService`] over a tier resolver, a control plane and a metadata store.
#[derive(Clone)]
pub struct TieredCredentialService {
    tiers: Arc<dyn TierResolver>,
    provisioner: IdentityProvisioner,
    issuer: CredentialIssuer,
    validator: CredentialValidator,
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for TieredCredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCredentialService")
            .field("issuer", &self.issuer)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl TieredCredentialService {
    /// Wire the issuer, provisioner and validator over shared dependencies.
    #[must_use]
    pub fn new(
        settings: &ServiceSettings,
        tiers: Arc<dyn TierResolver>,
        control_plane: Arc<dyn ControlPlane>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let provisioner =
            IdentityProvisioner::new(control_plane.clone(), tiers.clone(), &settings.tenant);

        Self {
            issuer: CredentialIssuer::new(
                tiers.clone(),
                provisioner.clone(),
                control_plane.clone(),
                store.clone(),
                &settings.tenant,
            ),
            validator: CredentialValidator::new(
                control_plane,
                store.clone(),
                &settings.tenant,
                settings.deny_list_policy,
                settings.validation_timeout,
            ),
            tiers,
            provisioner,
            store,
        }
    }

    fn require_authenticated(user: &UserContext) -> Result<(), CredentialServiceError> {
        if user.is_authenticated {
            Ok(())
        } else {
            Err(CredentialServiceError::Unauthenticated)
        }
    }

    /// Resolve the caller's tier and namespace without provisioning anything.
    fn locate(&self, user: &UserContext) -> Result<(String, String), CredentialServiceError> {
        Self::require_authenticated(user)?;

        let tier = self.tiers.tier_for_groups(&user.groups)?;
        let namespace = self.tiers.namespace_for_tier(&tier)?;

        Ok((tier, namespace))
    }
}

#[async_trait]
impl CredentialService for TieredCredentialService {
    async fn issue_ephemeral(
        &self,
        user: &UserContext,
        expiration: Option<SignedDuration>,
    ) -> Result<IssuedCredential, CredentialServiceError> {
        self.issuer
            .issue(
                user,
                CredentialKind::Ephemeral,
                CredentialRequest {
                    name: None,
                    description: None,
                    expiration,
                },
            )
            .await
    }

    async fn issue_named(
        &self,
        user: &UserContext,
        request: CredentialRequest,
    ) -> Result<IssuedCredential, CredentialServiceError> {
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .ok_or(CredentialServiceError::Validation(
                "name is required for named credentials",
            ))?;

        self.issuer
            .issue(
                user,
                CredentialKind::Named,
                CredentialRequest {
                    name: Some(name),
                    ..request
                },
            )
            .await
    }

    async fn list(
        &self,
        user: &UserContext,
    ) -> Result<Vec<CredentialView>, CredentialServiceError> {
        let (_tier, namespace) = self.locate(user)?;
        let now = Timestamp::now();

        let records = self.store.list_for_user(&namespace, &user.username).await?;

        Ok(records
            .into_iter()
            .map(|record| record.with_status(now))
            .collect())
    }

    async fn get_one(
        &self,
        user: &UserContext,
        id: &str,
    ) -> Result<CredentialView, CredentialServiceError> {
        let (_tier, namespace) = self.locate(user)?;

        let record = self.store.get(&namespace, &user.username, id).await?;

        Ok(record.with_status(Timestamp::now()))
    }

    async fn revoke_one(&self, user: &UserContext, id: &str) -> Result<(), CredentialServiceError> {
        let (_tier, namespace) = self.locate(user)?;

        let changed = self
            .store
            .mark_expired(&namespace, &user.username, id, Timestamp::now())
            .await?;

        if changed {
            info!(%namespace, id, "revoked named credential");
        }

        Ok(())
    }

    async fn revoke_all(
        &self,
        user: &UserContext,
    ) -> Result<RevokedCredentials, CredentialServiceError> {
        let (tier, namespace) = self.locate(user)?;

        let outcome = self
            .provisioner
            .recreate_identity(&namespace, &user.username, &tier)
            .await?;

        let records_expired = self
            .store
            .mark_all_expired_for_user(&namespace, &user.username, Timestamp::now())
            .await
            .map_err(|source| {
                warn!(error = %source, %namespace, "{PARTIAL_REVOCATION}");

                CredentialServiceError::Store {
                    context: PARTIAL_REVOCATION,
                    source,
                }
            })?;

        info!(%namespace, records_expired, "revoked all credentials");

        Ok(RevokedCredentials {
            namespace,
            identity_recreated: outcome == DeleteOutcome::Deleted,
            records_expired,
        })
    }

    async fn validate(&self, token: &str) -> UserContext {
        self.validator.validate(token).await
    }
}
