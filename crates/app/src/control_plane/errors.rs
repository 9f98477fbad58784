//! Control-plane errors.

use thiserror::Error;

/// Errors raised by [`ControlPlane`](super::ControlPlane) implementations.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// Client configuration could not be inferred from the environment.
    #[error("failed to load control-plane client configuration")]
    Config(#[source] kube::config::InferConfigError),

    /// The control plane rejected or failed the request.
    #[error("control-plane request failed")]
    Kube(#[source] kube::Error),

    /// The control plane answered without a field the caller depends on.
    #[error("control plane returned an incomplete response: {0}")]
    IncompleteResponse(&'static str),

    /// The control plane refused the request for a reason other than conflict or absence.
    #[error("control plane rejected the request: {0}")]
    Rejected(String),
}

impl From<kube::Error> for ControlPlaneError {
    fn from(error: kube::Error) -> Self {
        Self::Kube(error)
    }
}
