//! Test support.

use std::sync::Arc;

use tiergate::{ConfigTierResolver, TierResolver, UserContext};

mod context;
pub(crate) mod store;

pub(crate) use context::TestContext;
pub(crate) use control_plane::FakeControlPlane;
pub(crate) use db::TestDb;

/// Tier mapping shared by service tests.
pub(crate) const TIERS: &str = r"
- name: free
  groups:
    - system:authenticated
- name: premium
  level: 10
  groups:
    - premium-users
";

/// Strict resolver over [`TIERS`] for tenant `maas`.
pub(crate) fn tier_resolver() -> Arc<dyn TierResolver> {
    Arc::new(ConfigTierResolver::from_yaml("maas", TIERS).expect("test tiers should parse"))
}

/// A free-tier caller.
pub(crate) fn alice() -> UserContext {
    UserContext::authenticated("alice@example.com", "alice-uid", ["system:authenticated"])
}
