use http::{header::AUTHORIZATION, HeaderMap};
use serde::Deserialize;

use graphward_authz::Credentials;

/// Where one guard's credentials live in the request.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    /// Guard the extracted token is handed to.
    pub guard: String,

    #[serde(default = "default_header_name")]
    pub header_name: String,

    /// Prefix stripped from the header value, e.g. `Bearer`.
    #[serde(default)]
    pub header_prefix: String,
}

fn default_header_name() -> String {
    AUTHORIZATION.to_string()
}

impl CredentialConfig {
    pub fn bearer(guard: impl Into<String>) -> Self {
        Self {
            guard: guard.into(),
            header_name: default_header_name(),
            header_prefix: "Bearer".to_string(),
        }
    }
}

/// Pull each configured guard's raw token out of the request headers.
///
/// A header that is absent, non-UTF-8, or missing the configured prefix
/// simply contributes no credential; the guards decide what that means.
pub fn extract_credentials(configs: &[CredentialConfig], headers: &HeaderMap) -> Credentials {
    let mut credentials = Credentials::default();
    for config in configs {
        let Some(header) = headers.get(config.header_name.as_str()) else {
            continue;
        };
        let Ok(raw) = header.to_str() else {
            tracing::debug!(header = %config.header_name, "credential header is not valid UTF-8");
            continue;
        };
        let token = if config.header_prefix.is_empty() {
            raw.trim()
        } else {
            match raw.strip_prefix(&config.header_prefix) {
                Some(rest) => rest.trim_start(),
                None => continue,
            }
        };
        if !token.is_empty() {
            credentials.insert(config.guard.as_str(), token);
        }
    }
    credentials
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer  abc123".parse().unwrap());

        let credentials = extract_credentials(&[CredentialConfig::bearer("api")], &headers);
        assert_eq!(credentials.token("api"), Some("abc123"));
    }

    #[test]
    fn a_missing_prefix_contributes_no_credential() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "abc123".parse().unwrap());

        let credentials = extract_credentials(&[CredentialConfig::bearer("api")], &headers);
        assert_eq!(credentials.token("api"), None);
    }

    #[test]
    fn guards_can_read_different_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "web-token".parse().unwrap());
        headers.insert("x-api-key", "api-token".parse().unwrap());

        let configs = vec![
            CredentialConfig {
                guard: "web".to_string(),
                header_name: "authorization".to_string(),
                header_prefix: String::new(),
            },
            CredentialConfig {
                guard: "api".to_string(),
                header_name: "x-api-key".to_string(),
                header_prefix: String::new(),
            },
        ];
        let credentials = extract_credentials(&configs, &headers);
        assert_eq!(credentials.token("web"), Some("web-token"));
        assert_eq!(credentials.token("api"), Some("api-token"));
    }
}
