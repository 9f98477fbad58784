//! Control-plane naming
//!
//! Usernames arrive in whatever format the identity provider uses (emails, LDAP DNs,
//! principal strings). Identities and namespaces at the control plane must be DNS-1123
//! labels, so every name handed to the control plane goes through this module.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Maximum length of a DNS-1123 label.
pub const MAX_NAME_LEN: usize = 63;

/// Number of hex characters of the username hash appended to identity names.
pub const HASH_SUFFIX_LEN: usize = 8;

/// Label carrying the tenant (instance) name.
pub const INSTANCE_LABEL: &str = "tiergate.io/instance";

/// Label carrying the tier name.
pub const TIER_LABEL: &str = "tiergate.io/tier";

/// Label marking objects provisioned by the credential issuer.
pub const COMPONENT_LABEL: &str = "app.kubernetes.io/component";

const COMPONENT: &str = "credential-issuer";

/// Control-plane labels.
pub type Labels = BTreeMap<String, String>;

/// Errors raised while deriving control-plane names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// The username contains no characters that survive sanitization.
    #[error("invalid username {0:?}: no usable characters")]
    InvalidUsername(String),
}

/// Derive the identity name for a raw username.
///
/// The result is lower-case, contains only `[a-z0-9-]`, starts and ends with an alphanumeric
/// character, is at most [`MAX_NAME_LEN`] characters long and ends with a short hash of the
/// raw username so that distinct usernames sharing a sanitized prefix never collide.
///
/// # Errors
///
/// Returns [`NamingError::InvalidUsername`] when nothing of the username survives
/// sanitization.
pub fn identity_name(username: &str) -> Result<String, NamingError> {
    let mut name = sanitize_label(username);

    if name.is_empty() {
        return Err(NamingError::InvalidUsername(username.to_string()));
    }

    let base_max = MAX_NAME_LEN - 1 - HASH_SUFFIX_LEN;

    if name.len() > base_max {
        // Sanitized names are pure ASCII, so byte truncation is a char boundary.
        name.truncate(base_max);

        while name.ends_with('-') {
            name.pop();
        }
    }

    Ok(format!("{name}-{}", short_hash(username)))
}

/// Namespace holding every identity of a tier: `{tenant}-tier-{tier}`.
#[must_use]
pub fn tier_namespace(tenant: &str, tier: &str) -> String {
    format!("{tenant}-tier-{tier}")
}

/// Audience claim requested for every credential minted by this tenant.
#[must_use]
pub fn audience(tenant: &str) -> String {
    format!("{tenant}-sa")
}

/// Labels applied to a tier namespace on creation.
#[must_use]
pub fn namespace_labels(tenant: &str, tier: &str) -> Labels {
    Labels::from([
        (COMPONENT_LABEL.to_string(), COMPONENT.to_string()),
        (INSTANCE_LABEL.to_string(), tenant.to_string()),
        (TIER_LABEL.to_string(), tier.to_string()),
    ])
}

/// Labels applied to an identity on creation.
///
/// Usernames are not valid label values, so nothing user-derived is attached.
#[must_use]
pub fn identity_labels(tenant: &str, tier: &str) -> Labels {
    namespace_labels(tenant, tier)
}

/// Whether `value` is a valid DNS-1123 label.
#[must_use]
pub fn is_dns_label(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_NAME_LEN
        && value
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-')
        && !value.starts_with('-')
        && !value.ends_with('-')
}

/// Lower-case, replace runs of characters outside `[a-z0-9-]` with a single `-`, collapse
/// repeated `-` and trim `-` from both ends.
fn sanitize_label(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    let mut separator = false;

    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if separator && !name.is_empty() {
                name.push('-');
            }

            separator = false;
            name.push(ch);
        } else {
            separator = true;
        }
    }

    name
}

fn short_hash(raw: &str) -> String {
    let mut hex = format!("{:x}", Sha256::digest(raw.as_bytes()));

    hex.truncate(HASH_SUFFIX_LEN);

    hex
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn identity_name_sanitizes_email() -> TestResult {
        let name = identity_name("Alice.Smith@Example.com")?;

        assert!(name.starts_with("alice-smith-example-com-"), "got {name}");
        assert_eq!(name.len(), "alice-smith-example-com-".len() + HASH_SUFFIX_LEN);
        assert!(is_dns_label(&name), "{name} should be a DNS label");

        Ok(())
    }

    #[test]
    fn identity_name_collapses_and_trims_separators() -> TestResult {
        let name = identity_name("--CN=Bob,,OU=Eng--")?;

        assert!(name.starts_with("cn-bob-ou-eng-"), "got {name}");
        assert!(is_dns_label(&name), "{name} should be a DNS label");

        Ok(())
    }

    #[test]
    fn identity_name_is_deterministic() -> TestResult {
        assert_eq!(identity_name("carol@example.com")?, identity_name("carol@example.com")?);

        Ok(())
    }

    #[test]
    fn identity_name_distinguishes_usernames_with_same_sanitized_form() -> TestResult {
        let dotted = identity_name("john.doe@example.com")?;
        let underscored = identity_name("john_doe@example.com")?;
        let upper = identity_name("JOHN.DOE@EXAMPLE.COM")?;

        assert_ne!(dotted, underscored);
        assert_ne!(dotted, upper);
        assert_ne!(underscored, upper);

        Ok(())
    }

    #[test]
    fn identity_name_truncates_long_usernames() -> TestResult {
        let prefix = "a".repeat(80);
        let first = identity_name(&format!("{prefix}-one"))?;
        let second = identity_name(&format!("{prefix}-two"))?;

        assert_eq!(first.len(), MAX_NAME_LEN);
        assert_eq!(second.len(), MAX_NAME_LEN);
        assert_ne!(first, second, "hash suffix must separate truncated names");
        assert!(is_dns_label(&first), "{first} should be a DNS label");

        Ok(())
    }

    #[test]
    fn identity_name_does_not_leave_dash_before_suffix_after_truncation() -> TestResult {
        // 53 chars then a separator lands exactly on the truncation boundary.
        let username = format!("{}.{}", "b".repeat(53), "c".repeat(20));
        let name = identity_name(&username)?;

        assert!(!name.contains("--"), "got {name}");
        assert!(is_dns_label(&name), "{name} should be a DNS label");

        Ok(())
    }

    #[test]
    fn identity_name_rejects_unusable_usernames() {
        assert_eq!(
            identity_name("@@@"),
            Err(NamingError::InvalidUsername("@@@".to_string()))
        );
        assert!(identity_name("").is_err());
    }

    #[test]
    fn identity_name_handles_non_ascii() -> TestResult {
        let name = identity_name("zoë@example.com")?;

        assert!(name.starts_with("zo-example-com-"), "got {name}");

        Ok(())
    }

    #[test]
    fn tier_namespace_and_audience_follow_tenant() {
        assert_eq!(tier_namespace("maas", "premium"), "maas-tier-premium");
        assert_eq!(audience("maas"), "maas-sa");
    }

    #[test]
    fn labels_carry_tenant_and_tier() {
        let labels = namespace_labels("maas", "free");

        assert_eq!(labels.get(INSTANCE_LABEL).map(String::as_str), Some("maas"));
        assert_eq!(labels.get(TIER_LABEL).map(String::as_str), Some("free"));
        assert_eq!(identity_labels("maas", "free"), labels);
    }

    #[test]
    fn dns_label_validation() {
        assert!(is_dns_label("free"));
        assert!(is_dns_label("tier-2"));
        assert!(!is_dns_label(""));
        assert!(!is_dns_label("-free"));
        assert!(!is_dns_label("Free"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }
}
