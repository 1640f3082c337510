//! Installed-application OAuth token provider.
//!
//! Reads an OAuth client secret, runs the interactive authorization
//! flow on first use and persists the resulting token to a file so
//! later runs reuse it without prompting.

use async_trait::async_trait;
use google_drive3::yup_oauth2::{
    read_application_secret, InstalledFlowAuthenticator, InstalledFlowReturnMethod,
};
use hyper_util::client::legacy::connect::HttpConnector;
use std::error::Error as StdError;
use std::path::Path;

use super::TokenProviderInner;

type Authenticator = google_drive3::yup_oauth2::authenticator::Authenticator<
    hyper_rustls::HttpsConnector<HttpConnector>,
>;

/// A token provider backed by the installed-app OAuth flow.
///
/// The authorization URL is printed and the code is read from stdin
/// when no usable token exists in the token file. Refresh is automatic.
pub struct InstalledFlowProvider {
    auth: Authenticator,
}

impl InstalledFlowProvider {
    /// Create a provider from a client secret file and a token cache file.
    pub async fn from_files(
        credentials_path: &Path,
        token_path: &Path,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let secret = read_application_secret(credentials_path).await?;

        let auth =
            InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::Interactive)
                .persist_tokens_to_disk(token_path)
                .build()
                .await?;

        Ok(Self { auth })
    }
}

#[async_trait]
impl TokenProviderInner for InstalledFlowProvider {
    async fn get_token(
        &self,
        scopes: &[&str],
    ) -> Result<Option<String>, Box<dyn StdError + Send + Sync>> {
        let token = self.auth.token(scopes).await?;
        Ok(token.token().map(|t| t.to_string()))
    }
}
