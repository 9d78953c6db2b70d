use url::Url;

use crate::error::{PageliftError, Result};

/// Environment variable consulted when no credential is passed explicitly.
pub const CREDENTIAL_ENV: &str = "PAGELIFT_API_KEY";

/// Service endpoint used when none is supplied.
pub const DEFAULT_ENDPOINT: &str = "https://api.pagelift.dev";

/// Connection configuration: resolved once, immutable afterwards, owned by
/// the [`Client`](crate::Client) that holds it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    credential: String,
    endpoint: Url,
}

impl ClientConfig {
    /// Resolve against the process environment. An explicit credential
    /// wins; otherwise [`CREDENTIAL_ENV`] is consulted.
    pub fn resolve(credential: Option<&str>, endpoint: Option<&str>) -> Result<Self> {
        Self::resolve_with_env(credential, endpoint, |key| std::env::var(key).ok())
    }

    /// Resolution with an injectable environment lookup. The lookup is only
    /// consulted when the explicit credential is absent or empty (an empty
    /// string counts as absent). Construction fails when neither source
    /// yields a credential.
    pub fn resolve_with_env<F>(
        credential: Option<&str>,
        endpoint: Option<&str>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credential = match credential.filter(|c| !c.is_empty()) {
            Some(c) => c.to_string(),
            None => env(CREDENTIAL_ENV)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    PageliftError::configuration(format!(
                        "no credential available: pass one explicitly or set {CREDENTIAL_ENV}"
                    ))
                })?,
        };

        let raw = endpoint.unwrap_or(DEFAULT_ENDPOINT);
        let endpoint = Url::parse(raw).map_err(|e| {
            PageliftError::configuration(format!("invalid endpoint {raw:?}: {e}"))
        })?;

        Ok(Self {
            credential,
            endpoint,
        })
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}
