//! Authentication for the fetch client.
//!
//! Provides the `AuthProvider` seam and a bearer-token implementation with
//! secure credential handling.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

use crate::errors::{FetchError, FetchResult};

/// Authentication provider trait.
///
/// Implementations attach credentials to outgoing request headers.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Apply authentication to request headers.
    fn apply_auth(&self, headers: &mut HashMap<String, String>);

    /// Get the authentication scheme name.
    fn scheme(&self) -> &str;

    /// Validate the credentials.
    fn validate(&self) -> FetchResult<()>;
}

/// Bearer-token authentication provider.
pub struct TokenAuth {
    token: SecretString,
}

impl TokenAuth {
    /// Creates a new token authentication provider.
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    /// Creates from a string token.
    pub fn from_string(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
        }
    }

    /// Gets a hint of the token for debugging (last 4 characters).
    pub fn token_hint(&self) -> String {
        let token = self.token.expose_secret();
        let count = token.chars().count();
        if count > 4 {
            let tail: String = token.chars().skip(count - 4).collect();
            format!("...{}", tail)
        } else {
            "****".to_string()
        }
    }
}

#[async_trait]
impl AuthProvider for TokenAuth {
    fn apply_auth(&self, headers: &mut HashMap<String, String>) {
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.token.expose_secret()),
        );
    }

    fn scheme(&self) -> &str {
        "Bearer"
    }

    fn validate(&self) -> FetchResult<()> {
        if self.token.expose_secret().is_empty() {
            return Err(FetchError::Authentication {
                message: "Credential token cannot be empty".to_string(),
                credential_hint: None,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuth")
            .field("token", &"[REDACTED]")
            .field("token_hint", &self.token_hint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_auth_apply() {
        let auth = TokenAuth::from_string("tk_test_12345");
        let mut headers = HashMap::new();

        auth.apply_auth(&mut headers);

        assert_eq!(
            headers.get("Authorization"),
            Some(&"Bearer tk_test_12345".to_string())
        );
    }

    #[test]
    fn test_token_auth_scheme() {
        let auth = TokenAuth::from_string("tk_test");
        assert_eq!(auth.scheme(), "Bearer");
    }

    #[test]
    fn test_token_auth_validate_success() {
        let auth = TokenAuth::from_string("tk_test_12345");
        assert!(auth.validate().is_ok());
    }

    #[test]
    fn test_token_auth_validate_empty() {
        let auth = TokenAuth::from_string("");
        assert!(auth.validate().is_err());
    }

    #[test]
    fn test_token_hint() {
        let auth = TokenAuth::from_string("tk_test_12345");
        assert_eq!(auth.token_hint(), "...2345");
    }

    #[test]
    fn test_token_hint_short_token() {
        let auth = TokenAuth::from_string("abc");
        assert_eq!(auth.token_hint(), "****");
    }

    #[test]
    fn test_token_hint_multibyte_token() {
        let auth = TokenAuth::from_string("tk_secret_ключ");
        // Must not panic slicing inside a multibyte character.
        assert_eq!(auth.token_hint(), "...ключ");
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = TokenAuth::from_string("tk_secret_token");
        let debug_str = format!("{:?}", auth);

        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("tk_secret_token"));
    }
}
