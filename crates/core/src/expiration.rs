//! Credential expiration rules

use jiff::{SignedDuration, fmt::friendly::SpanPrinter};
use thiserror::Error;

/// Shortest lifetime a credential may be issued with.
pub const MIN_EXPIRATION: SignedDuration = SignedDuration::from_mins(10);

/// Lifetime of an ephemeral credential when none is requested.
pub const DEFAULT_EPHEMERAL_EXPIRATION: SignedDuration = SignedDuration::from_hours(4);

/// Lifetime of a named credential when none is requested (30 days).
pub const DEFAULT_NAMED_EXPIRATION: SignedDuration = SignedDuration::from_hours(30 * 24);

/// The two credential classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Minted and returned; nothing is persisted.
    Ephemeral,

    /// Minted and recorded in the metadata store.
    Named,
}

impl CredentialKind {
    /// Lifetime used when the caller does not request one.
    #[must_use]
    pub const fn default_expiration(self) -> SignedDuration {
        match self {
            Self::Ephemeral => DEFAULT_EPHEMERAL_EXPIRATION,
            Self::Named => DEFAULT_NAMED_EXPIRATION,
        }
    }
}

/// Expiration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpirationError {
    /// The expiration could not be parsed as a duration.
    #[error("invalid expiration format {input:?}: expected a duration such as 30m, 4h or 1h30m")]
    InvalidFormat {
        /// The rejected input.
        input: String,
    },

    /// A negative duration was requested.
    #[error("expiration must be positive, got {requested}")]
    Negative {
        /// The requested lifetime, formatted.
        requested: String,
    },

    /// The requested lifetime is shorter than [`MIN_EXPIRATION`].
    #[error("expiration must be at least {minimum}, got {requested}")]
    BelowMinimum {
        /// The requested lifetime, formatted.
        requested: String,

        /// The enforced floor, formatted.
        minimum: String,
    },
}

/// Parse a textual expiration.
///
/// The empty string and `0` mean "use the default" and yield `None`.
///
/// # Errors
///
/// Returns [`ExpirationError::InvalidFormat`] for bare numbers, unknown units or embedded
/// whitespace.
pub fn parse_expiration(raw: &str) -> Result<Option<SignedDuration>, ExpirationError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() || trimmed == "0" {
        return Ok(None);
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(ExpirationError::InvalidFormat {
            input: raw.to_string(),
        });
    }

    trimmed
        .parse::<SignedDuration>()
        .map(Some)
        .map_err(|_parse_error| ExpirationError::InvalidFormat {
            input: raw.to_string(),
        })
}

/// Resolve the lifetime to request for a credential of `kind`.
///
/// Missing or zero lifetimes resolve to the kind's default; anything below
/// [`MIN_EXPIRATION`] is rejected.
///
/// # Errors
///
/// Returns [`ExpirationError::Negative`] or [`ExpirationError::BelowMinimum`].
pub fn resolve_expiration(
    requested: Option<SignedDuration>,
    kind: CredentialKind,
) -> Result<SignedDuration, ExpirationError> {
    let Some(requested) = requested.filter(|duration| !duration.is_zero()) else {
        return Ok(kind.default_expiration());
    };

    if requested.is_negative() {
        return Err(ExpirationError::Negative {
            requested: format_duration(requested),
        });
    }

    if requested < MIN_EXPIRATION {
        return Err(ExpirationError::BelowMinimum {
            requested: format_duration(requested),
            minimum: format_duration(MIN_EXPIRATION),
        });
    }

    Ok(requested)
}

/// Format a duration in the compact friendly form, e.g. `4h` or `1h 30m`.
#[must_use]
pub fn format_duration(duration: SignedDuration) -> String {
    SpanPrinter::new().duration_to_string(&duration)
}
