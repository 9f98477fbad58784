//! Control Plane Config

use std::time::Duration;

use clap::Args;

/// Control-plane connection settings.
#[derive(Debug, Clone, Args)]
pub struct ControlPlaneConfig {
    /// Instance (tenant) name; prefixes tier namespaces and the credential audience
    #[arg(long, env = "INSTANCE_NAME")]
    pub instance_name: String,

    /// Timeout for control-plane requests in seconds
    #[arg(
        long,
        env = "CONTROL_PLANE_TIMEOUT_SECONDS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub control_plane_timeout_seconds: u64,
}

impl ControlPlaneConfig {
    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.control_plane_timeout_seconds)
    }
}
