//! Validation Config

use std::time::Duration;

use clap::Args;

use crate::credentials::DenyListPolicy;

/// Credential validation settings.
#[derive(Debug, Clone, Args)]
pub struct ValidationConfig {
    /// Behaviour when the deny-list cannot be consulted
    #[arg(
        long,
        env = "DENY_LIST_POLICY",
        value_enum,
        default_value_t = DenyListPolicy::FailClosed
    )]
    pub deny_list_policy: DenyListPolicy,

    /// Upper bound on a single validation in seconds
    #[arg(
        long,
        env = "VALIDATION_TIMEOUT_SECONDS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub validation_timeout_seconds: u64,
}

impl ValidationConfig {
    /// Validation deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_seconds)
    }
}
