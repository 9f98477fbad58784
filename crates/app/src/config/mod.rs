//! Application configuration.
//!
//! Every setting is a command-line flag with an environment-variable fallback; a `.env` file in
//! the working directory is loaded first when present.

use clap::Args;

pub mod control_plane;
pub mod db;
pub mod logging;
pub mod tiers;
pub mod validation;

pub use control_plane::ControlPlaneConfig;
pub use db::DatabaseConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use tiers::TiersConfig;
pub use validation::ValidationConfig;

/// Everything needed to build an [`AppContext`](crate::context::AppContext).
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Credential store settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Control-plane connection settings.
    #[command(flatten)]
    pub control_plane: ControlPlaneConfig,

    /// Tier mapping settings.
    #[command(flatten)]
    pub tiers: TiersConfig,

    /// Credential validation settings.
    #[command(flatten)]
    pub validation: ValidationConfig,
}

/// Load `.env` from the working directory, if there is one.
pub fn load_dotenv() {
    _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use testresult::TestResult;

    use crate::credentials::DenyListPolicy;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        logging: LoggingConfig,

        #[command(flatten)]
        app: AppConfig,
    }

    const REQUIRED: [&str; 7] = [
        "tiergate-app",
        "--database-url",
        "sqlite::memory:",
        "--instance-name",
        "maas",
        "--tier-mapping-path",
        "tiers.yaml",
    ];

    #[test]
    fn defaults_apply_when_only_required_flags_are_given() -> TestResult {
        let harness = Harness::try_parse_from(REQUIRED)?;

        assert!(matches!(harness.logging.log_format, LogFormat::Compact));
        assert_eq!(harness.app.database.pool_settings().max_open, 25);
        assert_eq!(harness.app.database.pool_settings().max_idle, 5);
        assert_eq!(
            harness.app.database.pool_settings().max_lifetime,
            Duration::from_secs(300)
        );
        assert_eq!(harness.app.control_plane.timeout(), Duration::from_secs(10));
        assert!(harness.app.tiers.strict_tier_resolution);
        assert_eq!(harness.app.tiers.default_tier, "free");
        assert_eq!(
            harness.app.validation.deny_list_policy,
            DenyListPolicy::FailClosed
        );
        assert_eq!(harness.app.validation.timeout(), Duration::from_secs(5));

        Ok(())
    }

    #[test]
    fn flags_override_defaults() -> TestResult {
        let harness = Harness::try_parse_from(REQUIRED.into_iter().chain([
            "--log-format",
            "json",
            "--strict-tier-resolution",
            "false",
            "--default-tier",
            "basic",
            "--deny-list-policy",
            "fail-open",
            "--db-max-idle-conns",
            "8",
            "--db-max-open-conns",
            "10",
        ]))?;

        assert!(matches!(harness.logging.log_format, LogFormat::Json));
        assert!(!harness.app.tiers.strict_tier_resolution);
        assert_eq!(harness.app.tiers.default_tier, "basic");
        assert_eq!(
            harness.app.validation.deny_list_policy,
            DenyListPolicy::FailOpen
        );
        assert_eq!(harness.app.database.pool_settings().max_idle, 8);
        assert_eq!(harness.app.database.pool_settings().max_open, 10);

        Ok(())
    }

    #[test]
    fn idle_connections_are_capped_at_the_open_limit() -> TestResult {
        let harness = Harness::try_parse_from(REQUIRED.into_iter().chain([
            "--db-max-idle-conns",
            "50",
            "--db-max-open-conns",
            "10",
        ]))?;

        let pool = harness.app.database.pool_settings();

        assert_eq!(pool.max_open, 10);
        assert_eq!(pool.max_idle, 10);

        Ok(())
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let result = Harness::try_parse_from(
            REQUIRED
                .into_iter()
                .chain(["--validation-timeout-seconds", "0"]),
        );

        assert!(result.is_err(), "zero timeout should not parse");
    }
}
