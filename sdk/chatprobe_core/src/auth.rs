use crate::config::API_TOKEN_ENV;
use crate::error::{ClientError, ClientResult};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};

/// An opaque bearer credential.
///
/// The token is attached to requests as an `Authorization` header and never
/// inspected or parsed. `Debug` output redacts it.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Read the token from the `CHATPROBE_API_TOKEN` environment variable.
    pub fn from_env() -> ClientResult<Self> {
        match std::env::var(API_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => Ok(Self::bearer(token)),
            _ => Err(ClientError::MissingConfig(format!(
                "{API_TOKEN_ENV} is not set"
            ))),
        }
    }

    /// The `Authorization` header value for this credential.
    pub(crate) fn header_value(&self) -> ClientResult<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0.expose_secret()))
            .map_err(|_| {
                ClientError::Auth("token contains bytes not permitted in a header".into())
            })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(****)")
    }
}
