//! Forum API authentication.

use reqwest::RequestBuilder;
use serde::Deserialize;

use crate::identity::SYSTEM_USERNAME;

/// API key credentials for the forum's admin API.
///
/// The [`Debug`] impl redacts the key to keep it out of log output.
#[derive(Clone, Deserialize)]
pub struct ForumCredentials {
    api_key: String,
    #[serde(default = "default_api_username")]
    api_username: String,
}

fn default_api_username() -> String {
    SYSTEM_USERNAME.to_string()
}

impl std::fmt::Debug for ForumCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForumCredentials")
            .field("api_key", &"[REDACTED]")
            .field("api_username", &self.api_username)
            .finish()
    }
}

impl ForumCredentials {
    /// Credentials acting as `api_username`.
    pub fn new(api_key: impl Into<String>, api_username: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_username: api_username.into(),
        }
    }

    /// Credentials acting as the system account.
    pub fn system(api_key: impl Into<String>) -> Self {
        Self::new(api_key, SYSTEM_USERNAME)
    }

    #[must_use]
    pub fn api_username(&self) -> &str {
        &self.api_username
    }

    /// Attach the `Api-Key` and `Api-Username` headers.
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("Api-Username", &self.api_username)
    }
}
