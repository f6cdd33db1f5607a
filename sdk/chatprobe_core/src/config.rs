//! Environment-supplied connection settings.
//!
//! The test runner decides which deployment to probe and which credential to
//! present; the core only reads the two variables at construction time and
//! has no other environment coupling.

use crate::auth::Credential;
use crate::client::ApiClient;
use crate::error::{ClientError, ClientResult};

/// Variable holding the base address of the deployment under test.
pub const BASE_URL_ENV: &str = "CHATPROBE_BASE_URL";

/// Variable holding the bearer token accepted by the deployment.
pub const API_TOKEN_ENV: &str = "CHATPROBE_API_TOKEN";

/// Connection settings for one deployment under test.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<Credential>,
}

impl ApiConfig {
    /// Read the base address and token from the environment.
    ///
    /// The base address is required; the token is optional so that
    /// unauthenticated scenarios can run against open deployments.
    pub fn from_env() -> ClientResult<Self> {
        let base_url = std::env::var(BASE_URL_ENV)
            .map_err(|_| ClientError::MissingConfig(format!("{BASE_URL_ENV} is not set")))?;
        let token = std::env::var(API_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .map(Credential::bearer);

        Ok(Self { base_url, token })
    }

    /// The same deployment with the credential replaced.
    ///
    /// Negative-auth scenarios use this to present a token the deployment
    /// will reject while keeping every other setting identical.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            base_url: self.base_url.clone(),
            token: Some(Credential::bearer(token)),
        }
    }

    /// Build a client for this deployment.
    pub fn client(&self) -> ClientResult<ApiClient> {
        let mut builder = ApiClient::builder().base_url(&self.base_url);
        if let Some(token) = &self.token {
            builder = builder.credential(token.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() -> (Option<String>, Option<String>) {
        let saved = (
            std::env::var(BASE_URL_ENV).ok(),
            std::env::var(API_TOKEN_ENV).ok(),
        );
        std::env::remove_var(BASE_URL_ENV);
        std::env::remove_var(API_TOKEN_ENV);
        saved
    }

    fn restore_env(saved: (Option<String>, Option<String>)) {
        match saved.0 {
            Some(val) => std::env::set_var(BASE_URL_ENV, val),
            None => std::env::remove_var(BASE_URL_ENV),
        }
        match saved.1 {
            Some(val) => std::env::set_var(API_TOKEN_ENV, val),
            None => std::env::remove_var(API_TOKEN_ENV),
        }
    }

    #[test]
    #[serial]
    fn from_env_requires_base_url() {
        let saved = clear_env();

        let result = ApiConfig::from_env();
        assert!(matches!(result, Err(ClientError::MissingConfig(_))));

        restore_env(saved);
    }

    #[test]
    #[serial]
    fn from_env_reads_both_variables() {
        let saved = clear_env();
        std::env::set_var(BASE_URL_ENV, "https://qa.example.com");
        std::env::set_var(API_TOKEN_ENV, "env-token");

        let config = ApiConfig::from_env().expect("both variables set");
        assert_eq!(config.base_url, "https://qa.example.com");
        assert!(config.token.is_some());

        restore_env(saved);
    }

    #[test]
    #[serial]
    fn token_is_optional() {
        let saved = clear_env();
        std::env::set_var(BASE_URL_ENV, "https://qa.example.com");

        let config = ApiConfig::from_env().expect("base URL set");
        assert!(config.token.is_none());

        restore_env(saved);
    }

    #[test]
    #[serial]
    fn with_token_replaces_credential_only() {
        let saved = clear_env();
        std::env::set_var(BASE_URL_ENV, "https://qa.example.com");
        std::env::set_var(API_TOKEN_ENV, "valid-token");

        let config = ApiConfig::from_env().expect("both variables set");
        let invalid = config.with_token("invalid_token");
        assert_eq!(invalid.base_url, config.base_url);
        assert!(invalid.token.is_some());

        restore_env(saved);
    }
}
