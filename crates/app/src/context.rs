//! App Context

use std::{path::PathBuf, sync::Arc};

use thiserror::Error;
use tiergate::{ConfigTierResolver, TierError, TierResolver};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    control_plane::{ControlPlane, ControlPlaneError, KubernetesControlPlane},
    credentials::{CredentialService, ServiceSettings, TieredCredentialService},
    store::{self, CredentialStore, StoreError},
};

/// Errors raised while wiring the application.
#[derive(Debug, Error)]
pub enum AppInitError {
    /// The tier mapping could not be loaded.
    #[error("failed to load tier mapping from {path}")]
    Tiers {
        /// Mapping file.
        path: PathBuf,

        /// Underlying error.
        #[source]
        source: TierError,
    },

    /// The control plane could not be reached.
    #[error("failed to connect to control plane")]
    ControlPlane(#[source] ControlPlaneError),

    /// The credential store could not be opened.
    #[error("failed to connect to credential store")]
    Database(#[source] StoreError),

    /// The credential store schema could not be created.
    #[error("failed to migrate credential store")]
    Migrate(#[source] StoreError),
}

/// Long-lived application services.
#[derive(Clone)]
pub struct AppContext {
    /// Credential lifecycle operations.
    pub credentials: Arc<dyn CredentialService>,

    /// Direct store access for administrative commands.
    pub store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}

impl AppContext {
    /// Build the application from configuration.
    ///
    /// Loads the tier mapping, connects to the control plane and the credential store, and
    /// creates the store schema if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error when any dependency cannot be initialised.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppInitError> {
        let tenant = config.control_plane.instance_name.clone();
        let tiers = load_tiers(config, &tenant)?;

        let control_plane: Arc<dyn ControlPlane> = Arc::new(
            KubernetesControlPlane::connect(&tenant, config.control_plane.timeout())
                .await
                .map_err(AppInitError::ControlPlane)?,
        );

        let store = store::connect(
            &config.database.database_url,
            config.database.pool_settings(),
        )
        .await
        .map_err(AppInitError::Database)?;

        store.migrate().await.map_err(AppInitError::Migrate)?;

        let settings = ServiceSettings {
            tenant,
            deny_list_policy: config.validation.deny_list_policy,
            validation_timeout: config.validation.timeout(),
        };

        info!(
            tenant = %settings.tenant,
            deny_list_policy = ?settings.deny_list_policy,
            validation_timeout = ?settings.validation_timeout,
            "credential service ready"
        );

        Ok(Self {
            credentials: Arc::new(TieredCredentialService::new(
                &settings,
                tiers,
                control_plane,
                store.clone(),
            )),
            store,
        })
    }

    /// Release pooled connections.
    pub async fn close(&self) {
        self.store.close().await;
    }
}

fn load_tiers(config: &AppConfig, tenant: &str) -> Result<Arc<dyn TierResolver>, AppInitError> {
    let path = &config.tiers.tier_mapping_path;

    let mut resolver =
        ConfigTierResolver::from_path(tenant, path).map_err(|source| AppInitError::Tiers {
            path: path.clone(),
            source,
        })?;

    if !config.tiers.strict_tier_resolution {
        warn!(
            default_tier = %config.tiers.default_tier,
            "strict tier resolution disabled, unmatched callers get the default tier"
        );

        resolver = resolver.lenient(config.tiers.default_tier.clone());
    }

    info!(
        path = %path.display(),
        tiers = resolver.tiers().len(),
        strict = resolver.is_strict(),
        "loaded tier mapping"
    );

    Ok(Arc::new(resolver))
}
