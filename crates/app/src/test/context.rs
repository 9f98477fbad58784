//! Service wired to the in-process control plane.

use std::{sync::Arc, time::Duration};

use testresult::TestResult;

use crate::{
    credentials::{DenyListPolicy, ServiceSettings, TieredCredentialService},
    store::{CredentialStore, SqliteCredentialStore},
    test::{FakeControlPlane, tier_resolver},
};

pub(crate) struct TestContext {
    pub(crate) service: TieredCredentialService,
    pub(crate) control_plane: Arc<FakeControlPlane>,
}

impl TestContext {
    /// Fresh context backed by a migrated in-memory `SQLite` store.
    pub(crate) async fn new() -> TestResult<Self> {
        let store = SqliteCredentialStore::in_memory().await?;

        store.migrate().await?;

        Self::with_store(store).await
    }

    pub(crate) async fn with_store(store: impl CredentialStore + 'static) -> TestResult<Self> {
        let control_plane = Arc::new(FakeControlPlane::default());

        let service = TieredCredentialService::new(
            &ServiceSettings {
                tenant: "maas".to_string(),
                deny_list_policy: DenyListPolicy::FailClosed,
                validation_timeout: Duration::from_secs(5),
            },
            tier_resolver(),
            control_plane.clone(),
            Arc::new(store),
        );

        Ok(Self {
            service,
            control_plane,
        })
    }
}
