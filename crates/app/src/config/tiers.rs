//! Tiers Config

use std::path::PathBuf;

use clap::{ArgAction, Args};

/// Tier mapping settings.
#[derive(Debug, Clone, Args)]
pub struct TiersConfig {
    /// Path to the YAML tier mapping
    #[arg(long, env = "TIER_MAPPING_PATH")]
    pub tier_mapping_path: PathBuf,

    /// Reject callers whose groups match no tier instead of using the default tier
    #[arg(
        long,
        env = "STRICT_TIER_RESOLUTION",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub strict_tier_resolution: bool,

    /// Tier used for unmatched callers when resolution is not strict
    #[arg(long, env = "DEFAULT_TIER", default_value = "free")]
    pub default_tier: String,
}
