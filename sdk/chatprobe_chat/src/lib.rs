#![doc = include_str!("../README.md")]

pub mod chat;
pub mod fixtures;

/// Test utilities shared across modules.
#[cfg(test)]
pub(crate) mod test_utils {
    use chatprobe_core::auth::Credential;
    use chatprobe_core::client::ApiClient;
    use wiremock::MockServer;

    /// Bearer token the mock deployments accept.
    pub const TEST_API_KEY: &str = "test-api-key";

    /// Create a test client pointed at a mock server.
    pub fn setup_mock_client(server: &MockServer) -> ApiClient {
        ApiClient::builder()
            .base_url(server.uri())
            .credential(Credential::bearer(TEST_API_KEY))
            .build()
            .expect("should build client")
    }
}
