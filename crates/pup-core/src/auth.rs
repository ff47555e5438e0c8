//! Token authentication
//!
//! Callers present `Authorization: token <credential>`. The credential set is
//! a flat allow-list fixed at startup.

use std::sync::Arc;
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;

/// Scheme prefix expected in the `Authorization` header
pub const TOKEN_SCHEME: &str = "token";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No credential presented
    #[error("unauthorized")]
    Unauthorized,
    /// Credential presented but not in the allow-list
    #[error("forbidden")]
    Forbidden,
}

/// Immutable allow-list of valid tokens
#[derive(Clone)]
pub struct AuthTokens {
    tokens: Arc<[String]>,
}

impl AuthTokens {
    /// Build from raw tokens, trimming whitespace and dropping empties
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            tokens: tokens.into(),
        }
    }

    /// Parse a comma-separated list such as `PUPCYCLER_AUTH_TOKENS`
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for AuthTokens {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

// Never print the tokens themselves.
impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("count", &self.tokens.len())
            .finish()
    }
}

/// Request gate comparing a presented `Authorization` value against the
/// allow-list in constant time
#[derive(Clone)]
pub struct Authenticator {
    expected: Arc<[Vec<u8>]>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("tokens", &self.expected.len())
            .finish()
    }
}

impl Authenticator {
    pub fn new(tokens: AuthTokens) -> Self {
        let expected: Vec<Vec<u8>> = tokens
            .tokens
            .iter()
            .map(|tok| format!("{TOKEN_SCHEME} {tok}").into_bytes())
            .collect();
        Self {
            expected: expected.into(),
        }
    }

    /// True when no token can ever be admitted
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    /// Check a raw `Authorization` header value.
    ///
    /// Every configured token is compared, so the time taken does not depend
    /// on which (if any) token matched.
    pub fn authenticate(&self, header: Option<&str>) -> Result<(), AuthError> {
        let presented = header.map(str::trim).unwrap_or_default();
        if presented.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        let presented = presented.as_bytes();
        let matched = self
            .expected
            .iter()
            .fold(Choice::from(0), |acc, candidate| {
                acc | candidate.as_slice().ct_eq(presented)
            });

        if bool::from(matched) {
            Ok(())
        } else {
            tracing::debug!("rejected credential");
            Err(AuthError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(AuthTokens::new(["abc", "def"]))
    }

    #[test]
    fn test_missing_or_blank_header_is_unauthorized() {
        let auth = authenticator();
        assert_eq!(auth.authenticate(None), Err(AuthError::Unauthorized));
        assert_eq!(auth.authenticate(Some("")), Err(AuthError::Unauthorized));
        assert_eq!(auth.authenticate(Some("   ")), Err(AuthError::Unauthorized));
    }

    #[test]
    fn test_any_configured_token_is_admitted() {
        let auth = authenticator();
        assert_eq!(auth.authenticate(Some("token abc")), Ok(()));
        assert_eq!(auth.authenticate(Some("token def")), Ok(()));
        assert_eq!(auth.authenticate(Some("  token def \n")), Ok(()));
    }

    #[test]
    fn test_scheme_and_token_must_match_exactly() {
        let auth = authenticator();
        for header in ["token xyz", "Token abc", "TOKEN abc", "Bearer abc", "abc", "token abcd", "token"] {
            assert_eq!(auth.authenticate(Some(header)), Err(AuthError::Forbidden), "{header}");
        }
    }

    #[test]
    fn test_tokens_are_trimmed_and_empties_dropped() {
        let tokens = AuthTokens::from_csv(" abc, ,def ,");
        assert_eq!(tokens.len(), 2);
        let auth = Authenticator::new(tokens);
        assert_eq!(auth.authenticate(Some("token def")), Ok(()));
        assert_eq!(auth.authenticate(Some("token")), Err(AuthError::Forbidden));
    }

    #[test]
    fn test_empty_allow_list_admits_nobody() {
        let auth = Authenticator::new(AuthTokens::default());
        assert_eq!(auth.authenticate(Some("token abc")), Err(AuthError::Forbidden));
    }

    #[test]
    fn test_debug_hides_tokens() {
        let tokens = AuthTokens::new(["supersecret"]);
        assert!(!format!("{tokens:?}").contains("supersecret"));
        assert!(!format!("{:?}", Authenticator::new(tokens)).contains("supersecret"));
    }
}
