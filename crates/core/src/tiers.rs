//! Tier resolution
//!
//! Tiers come from a YAML document mapping group names to access classes:
//!
//! ```yaml
//! - name: free
//!   groups: [system:authenticated]
//! - name: premium
//!   level: 10
//!   groups: [premium-users]
//! ```

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::naming::{is_dns_label, tier_namespace};

/// Tier resolution errors.
#[derive(Debug, Error)]
pub enum TierError {
    /// None of the caller's groups belong to a tier.
    #[error("no tier matches groups {groups:?}")]
    NoMatchingTier {
        /// The caller's groups.
        groups: Vec<String>,
    },

    /// The tier name is not part of the mapping.
    #[error("unknown tier {0:?}")]
    UnknownTier(String),

    /// The mapping document could not be read.
    #[error("failed to read tier mapping {path}")]
    Read {
        /// Path of the mapping document.
        path: PathBuf,

        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The mapping document is not valid YAML of the expected shape.
    #[error("failed to parse tier mapping")]
    Parse(#[source] serde_norway::Error),

    /// The mapping parsed but breaks a structural rule.
    #[error("invalid tier mapping: {0}")]
    InvalidMapping(String),
}

/// A named access class and the groups that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Tier identifier, used in namespace names.
    pub name: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Precedence when a caller belongs to several tiers; higher wins.
    #[serde(default)]
    pub level: i32,

    /// Group names that map to this tier.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Maps caller groups to a tier and tiers to namespaces.
pub trait TierResolver: Send + Sync {
    /// Resolve the tier for a caller's groups.
    ///
    /// # Errors
    ///
    /// Returns [`TierError::NoMatchingTier`] when no tier applies.
    fn tier_for_groups(&self, groups: &[String]) -> Result<String, TierError>;

    /// Namespace that holds the identities of `tier`.
    ///
    /// # Errors
    ///
    /// Returns [`TierError::UnknownTier`] for tiers that are not configured.
    fn namespace_for_tier(&self, tier: &str) -> Result<String, TierError>;
}

/// [`TierResolver`] backed by a static tier mapping.
#[derive(Debug, Clone)]
pub struct ConfigTierResolver {
    tenant: String,
    tiers: Vec<Tier>,
    strict: bool,
    default_tier: String,
}

impl ConfigTierResolver {
    /// Build a strict resolver for `tenant` over `tiers`.
    ///
    /// # Errors
    ///
    /// Returns [`TierError::InvalidMapping`] when a tier has an empty, duplicate or non-DNS name,
    /// or no groups.
    pub fn new(tenant: impl Into<String>, tiers: Vec<Tier>) -> Result<Self, TierError> {
        validate(&tiers)?;

        Ok(Self {
            tenant: tenant.into(),
            tiers,
            strict: true,
            default_tier: "free".to_string(),
        })
    }

    /// Parse a YAML mapping document.
    ///
    /// # Errors
    ///
    /// Returns [`TierError::Parse`] or [`TierError::InvalidMapping`].
    pub fn from_yaml(tenant: impl Into<String>, yaml: &str) -> Result<Self, TierError> {
        let tiers: Vec<Tier> = serde_norway::from_str(yaml).map_err(TierError::Parse)?;

        Self::new(tenant, tiers)
    }

    /// Read and parse a YAML mapping document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`TierError::Read`] in addition to the errors of [`Self::from_yaml`].
    pub fn from_path(tenant: impl Into<String>, path: &Path) -> Result<Self, TierError> {
        let yaml = fs::read_to_string(path).map_err(|source| TierError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(tenant, &yaml)
    }

    /// Fall back to `default_tier` instead of failing when no tier matches.
    #[must_use]
    pub fn lenient(mut self, default_tier: impl Into<String>) -> Self {
        self.strict = false;
        self.default_tier = default_tier.into();
        self
    }

    /// Whether unmatched groups are an error.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Configured tiers, in declaration order.
    #[must_use]
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

impl TierResolver for ConfigTierResolver {
    fn tier_for_groups(&self, groups: &[String]) -> Result<String, TierError> {
        let mut best: Option<&Tier> = None;

        for tier in &self.tiers {
            if !tier.groups.iter().any(|group| groups.contains(group)) {
                continue;
            }

            // Strictly greater keeps the first declared tier on equal levels.
            if best.is_none_or(|current| tier.level > current.level) {
                best = Some(tier);
            }
        }

        if let Some(tier) = best {
            return Ok(tier.name.clone());
        }

        if self.strict {
            return Err(TierError::NoMatchingTier {
                groups: groups.to_vec(),
            });
        }

        warn!(
            ?groups,
            default_tier = %self.default_tier,
            "no tier matches groups, using default tier"
        );

        Ok(self.default_tier.clone())
    }

    fn namespace_for_tier(&self, tier: &str) -> Result<String, TierError> {
        let known = self.tiers.iter().any(|candidate| candidate.name == tier)
            || (!self.strict && tier == self.default_tier);

        if !known {
            return Err(TierError::UnknownTier(tier.to_string()));
        }

        Ok(tier_namespace(&self.tenant, tier))
    }
}

fn validate(tiers: &[Tier]) -> Result<(), TierError> {
    let mut seen = HashSet::new();

    for tier in tiers {
        if tier.name.is_empty() {
            return Err(TierError::InvalidMapping("tier name is empty".to_string()));
        }

        if !is_dns_label(&tier.name) {
            return Err(TierError::InvalidMapping(format!(
                "tier name {:?} is not a DNS label",
                tier.name
            )));
        }

        if !seen.insert(tier.name.as_str()) {
            return Err(TierError::InvalidMapping(format!(
                "tier {:?} is declared more than once",
                tier.name
            )));
        }

        if tier.groups.is_empty() {
            return Err(TierError::InvalidMapping(format!(
                "tier {:?} has no groups",
                tier.name
            )));
        }
    }

    Ok(())
}
