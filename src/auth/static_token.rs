//! Static token provider for pre-obtained access tokens.

use async_trait::async_trait;
use std::error::Error as StdError;

use super::TokenProviderInner;

/// A token provider that always returns the same access token.
///
/// Static tokens expire and are never refreshed; once Drive rejects
/// the token every listing and download fails as remote-unavailable.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProviderInner for StaticTokenProvider {
    async fn get_token(
        &self,
        _scopes: &[&str],
    ) -> Result<Option<String>, Box<dyn StdError + Send + Sync>> {
        if self.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_ignores_scopes() {
        let provider = StaticTokenProvider::new("drive_token".to_string());

        let token1 = provider
            .get_token(&["https://www.googleapis.com/auth/drive"])
            .await
            .unwrap();
        let token2 = provider.get_token(&[]).await.unwrap();

        assert_eq!(token1, Some("drive_token".to_string()));
        assert_eq!(token1, token2);
    }

    #[tokio::test]
    async fn test_empty_static_token_yields_none() {
        let provider = StaticTokenProvider::new(String::new());
        assert_eq!(provider.get_token(&["scope"]).await.unwrap(), None);
    }
}
