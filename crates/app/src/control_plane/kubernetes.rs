//! Kubernetes control plane
//!
//! Tier namespaces are `Namespace` objects, identities are `ServiceAccount` objects, credentials
//! come from the `TokenRequest` subresource and introspection is a `TokenReview`.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use jiff::{SignedDuration, Timestamp};
use k8s_openapi::{
    api::{
        authentication::v1::{TokenRequest, TokenRequestSpec, TokenReview, TokenReviewSpec},
        core::v1::{Namespace, ServiceAccount},
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use kube::{
    Api, Client, Resource,
    api::{DeleteParams, PostParams},
    runtime::{
        WatchStreamExt,
        reflector::{self, ObjectRef, Store},
        watcher,
    },
};
use tiergate::naming::{INSTANCE_LABEL, Labels};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::control_plane::{
    ControlPlane, ControlPlaneError, DeleteOutcome, EnsureOutcome, Introspection, MintedCredential,
    Principal, parse_identity_username,
};

const CONFLICT: u16 = 409;
const NOT_FOUND: u16 = 404;

/// [`ControlPlane`] backed by the Kubernetes API.
///
/// Namespaces and service accounts labelled with this instance are mirrored into local
/// reflector caches, so the common "already provisioned" case costs no API round trip.
pub struct KubernetesControlPlane {
    client: Client,
    namespaces: Store<Namespace>,
    identities: Store<ServiceAccount>,
    watchers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for KubernetesControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesControlPlane")
            .field("watchers", &self.watchers.len())
            .finish_non_exhaustive()
    }
}

impl KubernetesControlPlane {
    /// Connect using the ambient kubeconfig or in-cluster configuration.
    ///
    /// Every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if no client configuration can be inferred.
    pub async fn connect(instance: &str, timeout: Duration) -> Result<Self, ControlPlaneError> {
        let mut config = kube::Config::infer()
            .await
            .map_err(ControlPlaneError::Config)?;

        config.connect_timeout = Some(timeout);
        config.read_timeout = Some(timeout);
        config.write_timeout = Some(timeout);

        let client = Client::try_from(config)?;

        info!(instance, "connected to control plane");

        Ok(Self::with_client(client, instance))
    }

    /// Build on an existing client and start the watch-fed caches.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_client(client: Client, instance: &str) -> Self {
        let selector = format!("{INSTANCE_LABEL}={instance}");

        let (namespaces, namespace_watcher) =
            spawn_reflector(Api::<Namespace>::all(client.clone()), &selector);

        let (identities, identity_watcher) =
            spawn_reflector(Api::<ServiceAccount>::all(client.clone()), &selector);

        Self {
            client,
            namespaces,
            identities,
            watchers: vec![namespace_watcher, identity_watcher],
        }
    }

    fn service_accounts(&self, namespace: &str) -> Api<ServiceAccount> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl Drop for KubernetesControlPlane {
    fn drop(&mut self) {
        for watcher in &self.watchers {
            watcher.abort();
        }
    }
}

fn spawn_reflector<K>(api: Api<K>, selector: &str) -> (Store<K>, JoinHandle<()>)
where
    K: Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    let (reader, writer) = reflector::store();

    let stream = reflector::reflector(
        writer,
        watcher(api, watcher::Config::default().labels(selector)),
    )
    .default_backoff()
    .touched_objects();

    let kind = K::kind(&()).to_string();

    let handle = tokio::spawn(async move {
        stream
            .for_each(|event| {
                if let Err(error) = event {
                    warn!(%kind, %error, "control-plane watch interrupted");
                }

                futures::future::ready(())
            })
            .await;
    });

    (reader, handle)
}

fn metadata(name: &str, namespace: Option<&str>, labels: &Labels) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(ToString::to_string),
        labels: Some(labels.clone()),
        ..ObjectMeta::default()
    }
}

fn ensure_outcome<T>(result: Result<T, kube::Error>) -> Result<EnsureOutcome, ControlPlaneError> {
    match result {
        Ok(_) => Ok(EnsureOutcome::Created),
        Err(kube::Error::Api(response)) if response.code == CONFLICT => {
            Ok(EnsureOutcome::AlreadyExists)
        }
        Err(error) => Err(error.into()),
    }
}

#[async_trait]
impl ControlPlane for KubernetesControlPlane {
    async fn ensure_namespace(
        &self,
        name: &str,
        labels: &Labels,
    ) -> Result<EnsureOutcome, ControlPlaneError> {
        if self.namespaces.get(&ObjectRef::new(name)).is_some() {
            debug!(namespace = name, "namespace found in cache");
            return Ok(EnsureOutcome::AlreadyExists);
        }

        let namespace = Namespace {
            metadata: metadata(name, None, labels),
            ..Namespace::default()
        };

        ensure_outcome(
            Api::<Namespace>::all(self.client.clone())
                .create(&PostParams::default(), &namespace)
                .await,
        )
    }

    async fn ensure_identity(
        &self,
        namespace: &str,
        name: &str,
        labels: &Labels,
    ) -> Result<EnsureOutcome, ControlPlaneError> {
        if self
            .identities
            .get(&ObjectRef::new(name).within(namespace))
            .is_some()
        {
            debug!(namespace, identity = name, "identity found in cache");
            return Ok(EnsureOutcome::AlreadyExists);
        }

        self.create_identity(namespace, name, labels).await
    }

    async fn create_identity(
        &self,
        namespace: &str,
        name: &str,
        labels: &Labels,
    ) -> Result<EnsureOutcome, ControlPlaneError> {
        let identity = ServiceAccount {
            metadata: metadata(name, Some(namespace), labels),
            ..ServiceAccount::default()
        };

        ensure_outcome(
            self.service_accounts(namespace)
                .create(&PostParams::default(), &identity)
                .await,
        )
    }

    async fn mint_credential(
        &self,
        namespace: &str,
        identity: &str,
        audience: &str,
        ttl: SignedDuration,
    ) -> Result<MintedCredential, ControlPlaneError> {
        let request = TokenRequest {
            spec: TokenRequestSpec {
                audiences: vec![audience.to_string()],
                expiration_seconds: Some(ttl.as_secs()),
                bound_object_ref: None,
            },
            ..TokenRequest::default()
        };

        let response = self
            .service_accounts(namespace)
            .create_token_request(identity, &PostParams::default(), &request)
            .await?;

        let status = response
            .status
            .ok_or(ControlPlaneError::IncompleteResponse("token request status"))?;

        let seconds = status.expiration_timestamp.0.timestamp();
        let expires_at = Timestamp::from_second(seconds).map_err(|_out_of_range| {
            ControlPlaneError::IncompleteResponse("token expiration timestamp")
        })?;

        Ok(MintedCredential {
            token: tiergate::BearerToken::new(status.token),
            expires_at,
        })
    }

    async fn delete_identity(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeleteOutcome, ControlPlaneError> {
        match self
            .service_accounts(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(kube::Error::Api(response)) if response.code == NOT_FOUND => {
                Ok(DeleteOutcome::NotFound)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn introspect(
        &self,
        token: &str,
        audiences: &[String],
    ) -> Result<Introspection, ControlPlaneError> {
        let review = TokenReview {
            spec: TokenReviewSpec {
                token: Some(token.to_string()),
                audiences: (!audiences.is_empty()).then(|| audiences.to_vec()),
            },
            ..TokenReview::default()
        };

        let response = Api::<TokenReview>::all(self.client.clone())
            .create(&PostParams::default(), &review)
            .await?;

        let status = response.status.unwrap_or_default();

        if !status.authenticated.unwrap_or(false) {
            if let Some(error) = status.error {
                debug!(%error, "token review rejected token");
            }

            return Ok(Introspection::rejected());
        }

        let user = status.user.unwrap_or_default();
        let username = user.username.unwrap_or_default();

        Ok(Introspection::accepted(Principal {
            identity: parse_identity_username(&username),
            username,
            uid: user.uid.unwrap_or_default(),
            groups: user.groups.unwrap_or_default(),
        }))
    }
}
