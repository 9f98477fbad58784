//! Credential issuance.

use std::sync::Arc;

use jiff::Timestamp;
use serde::Serialize;
use tiergate::{
    Credential, CredentialKind, CredentialRequest, CredentialView, NewCredentialRecord,
    TierResolver, UserContext,
    claims::{extract_jti, token_hash},
    expiration::resolve_expiration,
    naming::audience,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    control_plane::ControlPlane,
    credentials::{CredentialServiceError, IdentityProvisioner, Stage},
    store::CredentialStore,
};

/// A freshly issued credential and, for named credentials, its stored metadata.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredential {
    /// The credential itself.
    #[serde(flatten)]
    pub credential: Credential,

    /// Stored metadata; absent for ephemeral credentials and when persistence failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<CredentialView>,

    /// Set when the credential was issued but its metadata could not be saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Mints credentials for provisioned identities.
#[derive(Clone)]
pub struct CredentialIssuer {
    tiers: Arc<dyn TierResolver>,
    provisioner: IdentityProvisioner,
    control_plane: Arc<dyn ControlPlane>,
    store: Arc<dyn CredentialStore>,
    audience: String,
}

impl std::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl CredentialIssuer {
    /// Build an issuer minting credentials scoped to the audience of `tenant`.
    #[must_use]
    pub fn new(
        tiers: Arc<dyn TierResolver>,
        provisioner: IdentityProvisioner,
        control_plane: Arc<dyn ControlPlane>,
        store: Arc<dyn CredentialStore>,
        tenant: &str,
    ) -> Self {
        Self {
            tiers,
            provisioner,
            control_plane,
            store,
            audience: audience(tenant),
        }
    }

    /// Issue a credential for `user`.
    ///
    /// The expiration is checked before anything is provisioned. For named credentials the
    /// metadata write is best-effort: once minted, a credential is returned even if it could
    /// not be recorded, with [`IssuedCredential::warning`] set.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid expirations, unresolvable tiers and control-plane
    /// failures.
    pub async fn issue(
        &self,
        user: &UserContext,
        kind: CredentialKind,
        request: CredentialRequest,
    ) -> Result<IssuedCredential, CredentialServiceError> {
        if !user.is_authenticated {
            return Err(CredentialServiceError::Unauthenticated);
        }

        let expiration = resolve_expiration(request.expiration, kind)?;
        let tier = self.tiers.tier_for_groups(&user.groups)?;
        let namespace = self.provisioner.ensure_namespace(&tier).await?;

        let identity = self
            .provisioner
            .ensure_identity(&namespace, &user.username, &tier)
            .await?;

        let minted = self
            .control_plane
            .mint_credential(&namespace, &identity, &self.audience, expiration)
            .await
            .map_err(CredentialServiceError::control_plane(
                Stage::MintCredential,
                format!("{namespace}/{identity}"),
            ))?;

        let jti = match extract_jti(minted.token.expose()) {
            Ok(jti) => Some(jti),
            Err(error) => {
                debug!(%error, "minted credential carries no jti");
                None
            }
        };

        info!(%namespace, %identity, %tier, ?kind, expires_at = %minted.expires_at, "issued credential");

        let credential = Credential {
            token: minted.token,
            expiration,
            expires_at: minted.expires_at,
            jti,
        };

        let Some(name) = request.name.filter(|_| kind == CredentialKind::Named) else {
            return Ok(IssuedCredential {
                credential,
                record: None,
                warning: None,
            });
        };

        let record = NewCredentialRecord {
            id: credential
                .jti
                .clone()
                .unwrap_or_else(|| Uuid::now_v7().to_string()),
            username: user.username.clone(),
            namespace,
            name,
            description: request.description,
            created_at: Timestamp::now(),
            expires_at: credential.expires_at,
            token_hash: token_hash(credential.token.expose()),
        };

        match self.store.add(record).await {
            Ok(stored) => {
                info!(id = %stored.id, namespace = %stored.namespace, "recorded named credential");

                Ok(IssuedCredential {
                    credential,
                    record: Some(stored.with_status(Timestamp::now())),
                    warning: None,
                })
            }
            Err(error) => {
                warn!(%error, "named credential issued but its metadata could not be saved");

                Ok(IssuedCredential {
                    credential,
                    record: None,
                    warning: Some(format!(
                        "credential issued but its metadata could not be saved: {error}"
                    )),
                })
            }
        }
    }
}
