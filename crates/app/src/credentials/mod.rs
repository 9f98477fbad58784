//! Credential lifecycle
//!
//! Tier resolution, identity provisioning, issuance, validation and revocation, composed
//! behind [`CredentialService`].

pub mod errors;
mod issuer;
mod provisioner;
mod service;
mod validator;

pub use errors::{CredentialServiceError, Stage};
pub use issuer::{CredentialIssuer, IssuedCredential};
pub use provisioner::IdentityProvisioner;
pub use service::*;
pub use validator::{CredentialValidator, DenyListPolicy};
