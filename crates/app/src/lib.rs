//! Tier-scoped credential issuance, validation and revocation.
//!
//! Credentials are short-lived bearer tokens minted by a Kubernetes-style control plane for a
//! per-user identity living in the caller's tier namespace. Named credentials are recorded in a
//! SQL store so they can be listed and revoked.

pub mod config;
pub mod context;
pub mod control_plane;
pub mod credentials;
pub mod observability;
pub mod store;

#[cfg(test)]
mod test;
