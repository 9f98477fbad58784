//! Credentials and their persisted metadata

use std::fmt;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::expiration::format_duration;

/// Raw bearer token material.
///
/// Never printed by `Debug`; wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap raw token material.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// The raw token, for handing back to the caller exactly once.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(**redacted**)")
    }
}

impl Drop for BearerToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Serialize for BearerToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A freshly minted credential.
#[derive(Debug, Clone, Serialize)]
pub struct Credential {
    /// Raw bearer token.
    pub token: BearerToken,

    /// Requested lifetime, in compact friendly form (e.g. `4h`).
    #[serde(serialize_with = "serialize_duration")]
    pub expiration: SignedDuration,

    /// Instant the control plane reports the credential expires.
    pub expires_at: Timestamp,

    /// Credential identifier extracted from the token, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

fn serialize_duration<S: serde::Serializer>(
    duration: &SignedDuration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*duration))
}

/// Options accepted when issuing a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CredentialRequest {
    /// Display name; required for named credentials.
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form description stored alongside named credentials.
    #[serde(default)]
    pub description: Option<String>,

    /// Requested lifetime; `None` or zero selects the default.
    #[serde(default)]
    pub expiration: Option<SignedDuration>,
}

/// Status of a named credential at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    /// Not yet expired.
    Active,

    /// At or past its expiry, or revoked.
    Expired,
}

impl CredentialStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted metadata of a named credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialRecord {
    /// Credential identifier.
    pub id: String,

    /// Owner of the credential.
    pub username: String,

    /// Tier namespace the credential was minted in.
    pub namespace: String,

    /// Display name.
    pub name: String,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Issue instant.
    pub created_at: Timestamp,

    /// Expiry instant. Revocation moves this to the revocation instant.
    pub expires_at: Timestamp,

    /// Instant the credential was revoked, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
}

impl CredentialRecord {
    /// Status computed against `now`. A record expiring exactly at `now` is expired.
    #[must_use]
    pub fn status(&self, now: Timestamp) -> CredentialStatus {
        if self.revoked_at.is_some() || now >= self.expires_at {
            CredentialStatus::Expired
        } else {
            CredentialStatus::Active
        }
    }

    /// Attach the status computed against `now`.
    #[must_use]
    pub fn with_status(self, now: Timestamp) -> CredentialView {
        let status = self.status(now);

        CredentialView {
            record: self,
            status,
        }
    }
}

/// A credential record together with its computed status, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialView {
    /// Stored metadata.
    #[serde(flatten)]
    pub record: CredentialRecord,

    /// Status at read time.
    pub status: CredentialStatus,
}

/// Metadata written for a newly issued named credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredentialRecord {
    /// Credential identifier.
    pub id: String,

    /// Owner of the credential.
    pub username: String,

    /// Tier namespace the credential was minted in.
    pub namespace: String,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Issue instant.
    pub created_at: Timestamp,

    /// Expiry instant.
    pub expires_at: Timestamp,

    /// SHA-256 of the raw token, used for deny-list lookups.
    pub token_hash: String,
}

impl NewCredentialRecord {
    /// The record as it reads back from storage.
    #[must_use]
    pub fn to_record(&self) -> CredentialRecord {
        CredentialRecord {
            id: self.id.clone(),
            username: self.username.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn record(expires_at: Timestamp) -> CredentialRecord {
        CredentialRecord {
            id: "jti-1".to_string(),
            username: "alice".to_string(),
            namespace: "maas-tier-free".to_string(),
            name: "ci".to_string(),
            description: None,
            created_at: Timestamp::UNIX_EPOCH,
            expires_at,
            revoked_at: None,
        }
    }

    #[test]
    fn bearer_token_debug_is_redacted() {
        let token = BearerToken::new("secret-material".to_string());

        assert_eq!(format!("{token:?}"), "BearerToken(**redacted**)");
        assert_eq!(token.expose(), "secret-material");
    }

    #[test]
    fn status_is_expired_at_exact_expiry() -> TestResult {
        let expires_at: Timestamp = "2026-01-01T00:00:00Z".parse()?;
        let record = record(expires_at);

        assert_eq!(
            record.status(expires_at - SignedDuration::from_secs(1)),
            CredentialStatus::Active
        );
        assert_eq!(record.status(expires_at), CredentialStatus::Expired);

        Ok(())
    }

    #[test]
    fn revoked_record_is_expired() -> TestResult {
        let expires_at: Timestamp = "2030-01-01T00:00:00Z".parse()?;
        let mut record = record(expires_at);

        record.revoked_at = Some(Timestamp::UNIX_EPOCH);

        assert_eq!(record.status(Timestamp::UNIX_EPOCH), CredentialStatus::Expired);

        Ok(())
    }

    #[test]
    fn view_serializes_status_inline() -> TestResult {
        let expires_at: Timestamp = "2030-01-01T00:00:00Z".parse()?;
        let view = record(expires_at).with_status(Timestamp::UNIX_EPOCH);
        let json = serde_json::to_value(&view)?;

        assert_eq!(json["status"], "active");
        assert_eq!(json["name"], "ci");
        assert!(json.get("description").is_none(), "empty description is omitted");

        Ok(())
    }
}
