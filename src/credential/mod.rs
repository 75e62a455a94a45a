//! Credential resolution for the GitHub token
//! Sources in precedence order: explicit argument, primary env var, secondary env var.

use std::fmt;

use crate::config::Environment;
use crate::error::CredentialError;

/// Primary environment variable, also the name injected into the sandbox
pub const PRIMARY_TOKEN_ENV: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

/// Fallback environment variable
pub const SECONDARY_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Prefix of classic personal access tokens
const CLASSIC_PREFIX: &str = "ghp_";
const CLASSIC_LEN: usize = 40;

/// Opaque bearer token. Debug and Display never show the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the few places that must hand it on
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked preview safe for debug logs, e.g. `ghp_****`
    pub fn masked(&self) -> String {
        match self.0.split_once('_') {
            Some((prefix, _)) if prefix.len() <= 12 => format!("{}_****", prefix),
            _ => "****".to_string(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// Where the token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    PrimaryEnv,
    SecondaryEnv,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Explicit => write!(f, "command line"),
            CredentialSource::PrimaryEnv => write!(f, "{}", PRIMARY_TOKEN_ENV),
            CredentialSource::SecondaryEnv => write!(f, "{}", SECONDARY_TOKEN_ENV),
        }
    }
}

/// Outcome of the advisory format check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFormat {
    Conventional,
    Unrecognized,
}

#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub credential: Credential,
    pub source: CredentialSource,
    pub format: TokenFormat,
}

/// Resolve the token. A format mismatch only warns; the value is still used.
pub fn resolve(explicit: Option<&str>, env: &Environment) -> Result<ResolvedCredential, CredentialError> {
    let explicit = explicit.map(str::trim).filter(|t| !t.is_empty());

    let (token, source) = if let Some(token) = explicit {
        (token, CredentialSource::Explicit)
    } else if let Some(token) = env.get(PRIMARY_TOKEN_ENV) {
        (token.trim(), CredentialSource::PrimaryEnv)
    } else if let Some(token) = env.get(SECONDARY_TOKEN_ENV) {
        (token.trim(), CredentialSource::SecondaryEnv)
    } else {
        return Err(CredentialError::Missing);
    };

    let credential = Credential::new(token);
    let format = check_format(token);
    if format == TokenFormat::Unrecognized {
        tracing::warn!(
            source = %source,
            "token does not look like a classic personal access token (ghp_ + 36 characters); using it anyway"
        );
    }
    tracing::debug!(source = %source, token = %credential.masked(), "resolved GitHub token");

    Ok(ResolvedCredential {
        credential,
        source,
        format,
    })
}

/// Classic PAT shape: `ghp_` followed by 36 ASCII alphanumerics
pub fn check_format(token: &str) -> TokenFormat {
    let conventional = token.len() == CLASSIC_LEN
        && token.starts_with(CLASSIC_PREFIX)
        && token[CLASSIC_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric());

    if conventional {
        TokenFormat::Conventional
    } else {
        TokenFormat::Unrecognized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> String {
        format!("ghp_{}", "A".repeat(36))
    }

    #[test]
    fn test_check_format() {
        assert_eq!(check_format(&classic()), TokenFormat::Conventional);
        assert_eq!(check_format("ghp_short"), TokenFormat::Unrecognized);
        assert_eq!(
            check_format(&format!("github_pat_{}", "B".repeat(60))),
            TokenFormat::Unrecognized
        );
        assert_eq!(check_format(&format!("ghp_{}-", "A".repeat(35))), TokenFormat::Unrecognized);
    }

    #[test]
    fn test_debug_is_redacted() {
        let cred = Credential::new(classic());
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("AAAA"));
        assert_eq!(debug, "Credential(ghp_****)");
    }

    #[test]
    fn test_unrecognized_format_still_resolves() {
        let env = Environment::default();
        let resolved = resolve(Some("not-a-pat"), &env).unwrap();
        assert_eq!(resolved.credential.expose(), "not-a-pat");
        assert_eq!(resolved.format, TokenFormat::Unrecognized);
    }

    #[test]
    fn test_blank_explicit_falls_through() {
        let env = Environment::from_pairs([(SECONDARY_TOKEN_ENV, "fallback")]);
        let resolved = resolve(Some("  "), &env).unwrap();
        assert_eq!(resolved.source, CredentialSource::SecondaryEnv);
    }
}
