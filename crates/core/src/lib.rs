//! Tiergate
//!
//! Domain model for tier-scoped credential issuance: callers, tiers, identity naming,
//! expiration rules and the persisted metadata of named credentials.

pub mod claims;
pub mod credentials;
pub mod expiration;
pub mod naming;
pub mod tiers;
pub mod user;

pub use credentials::{
    BearerToken, Credential, CredentialRecord, CredentialRequest, CredentialStatus,
    CredentialView, NewCredentialRecord,
};
pub use expiration::{CredentialKind, ExpirationError};
pub use naming::NamingError;
pub use tiers::{ConfigTierResolver, Tier, TierError, TierResolver};
pub use user::UserContext;
