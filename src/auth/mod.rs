//! Token providers for Google Drive authentication
//!
//! Two token sources are supported:
//! - Installed-application OAuth flow with the token persisted to a file
//! - Static tokens (pre-obtained access tokens, testing)

pub mod installed;
pub mod static_token;

use async_trait::async_trait;
use google_apis_common::GetToken;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;

use crate::config::AuthConfig;
use crate::error::{DriveFsError, Result};

pub use installed::InstalledFlowProvider;
pub use static_token::StaticTokenProvider;

/// Inner trait for token providers.
///
/// Object-safe so providers can be selected from configuration at runtime.
#[async_trait]
pub trait TokenProviderInner: Send + Sync {
    /// Get a token for the given scopes.
    ///
    /// Returns `Ok(Some(token))` if a token is available,
    /// `Ok(None)` if no token is needed/available,
    /// or `Err` if token fetching failed.
    async fn get_token(
        &self,
        scopes: &[&str],
    ) -> std::result::Result<Option<String>, Box<dyn StdError + Send + Sync>>;
}

/// Adapts a [`TokenProviderInner`] to google-apis-common's `GetToken`.
#[derive(Clone)]
pub struct TokenProviderWrapper {
    inner: Arc<dyn TokenProviderInner>,
}

impl TokenProviderWrapper {
    pub fn new<T: TokenProviderInner + 'static>(provider: T) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }
}

impl GetToken for TokenProviderWrapper {
    fn get_token<'a>(
        &'a self,
        scopes: &'a [&str],
    ) -> Pin<
        Box<
            dyn Future<Output = std::result::Result<Option<String>, Box<dyn StdError + Send + Sync>>>
                + Send
                + 'a,
        >,
    > {
        let inner = self.inner.clone();
        Box::pin(async move { inner.get_token(scopes).await })
    }
}

/// Build the token provider selected by `config`
pub async fn build_token_provider(config: &AuthConfig) -> Result<TokenProviderWrapper> {
    match config {
        AuthConfig::Installed {
            credentials_path,
            token_path,
        } => {
            info!("Using installed-app OAuth flow, token file {:?}", token_path);
            let provider = InstalledFlowProvider::from_files(credentials_path, token_path)
                .await
                .map_err(|e| DriveFsError::Auth(e.to_string()))?;
            Ok(TokenProviderWrapper::new(provider))
        }
        AuthConfig::Static { token } => {
            info!("Using static access token");
            Ok(TokenProviderWrapper::new(StaticTokenProvider::new(
                token.clone(),
            )))
        }
    }
}
