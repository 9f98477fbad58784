//! Credential service errors.

use std::fmt;

use thiserror::Error;
use tiergate::{ExpirationError, NamingError, TierError};

use crate::{control_plane::ControlPlaneError, store::StoreError};

/// Control-plane step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Creating the tier namespace.
    EnsureNamespace,

    /// Creating the user's identity.
    EnsureIdentity,

    /// Minting a credential.
    MintCredential,

    /// Deleting the user's identity.
    DeleteIdentity,

    /// Recreating the user's identity after deletion.
    RecreateIdentity,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnsureNamespace => "ensure namespace",
            Self::EnsureIdentity => "ensure identity",
            Self::MintCredential => "mint credential for",
            Self::DeleteIdentity => "delete identity",
            Self::RecreateIdentity => "recreate identity",
        })
    }
}

/// Credential service error variants.
#[derive(Debug, Error)]
pub enum CredentialServiceError {
    /// The caller is not authenticated.
    #[error("caller is not authenticated")]
    Unauthenticated,

    /// The request violates an input constraint.
    #[error("invalid request: {0}")]
    Validation(&'static str),

    /// The requested expiration is invalid.
    #[error(transparent)]
    Expiration(#[from] ExpirationError),

    /// The username cannot be turned into an identity name.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// The caller's tier could not be resolved.
    #[error(transparent)]
    Tier(#[from] TierError),

    /// A control-plane step failed.
    #[error("control plane failed to {stage} {target}")]
    ControlPlane {
        /// Failed step.
        stage: Stage,

        /// Namespace or `namespace/identity` the step targeted.
        target: String,

        /// Underlying error.
        #[source]
        source: ControlPlaneError,
    },

    /// The credential does not exist for this user.
    #[error("credential not found")]
    NotFound,

    /// The metadata store failed.
    #[error("{context}")]
    Store {
        /// What the caller should know about the state left behind.
        context: &'static str,

        /// Underlying error.
        #[source]
        source: StoreError,
    },
}

impl CredentialServiceError {
    pub(crate) fn control_plane(
        stage: Stage,
        target: impl Into<String>,
    ) -> impl FnOnce(ControlPlaneError) -> Self {
        let target = target.into();

        move |source| Self::ControlPlane {
            stage,
            target,
            source,
        }
    }

    /// Whether the error is the caller's fault.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Expiration(_) | Self::Naming(_)
        )
    }
}

impl From<StoreError> for CredentialServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            source => Self::Store {
                context: "credential store error",
                source,
            },
        }
    }
}
