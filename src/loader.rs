//! Document loading from files, strings and HTTP URLs.

use std::path::Path;

use serde_json::Value;

use crate::config::RegistryConfig;
use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Parse a registry configuration from a JSON value.
///
/// # Errors
///
/// Returns `LoadError::InvalidDocument` if the value doesn't describe a
/// registry configuration.
pub fn parse_config(value: Value) -> Result<RegistryConfig, LoadError> {
    serde_json::from_value(value).map_err(|e| LoadError::InvalidDocument {
        message: format!("registry config: {}", e),
    })
}

/// Load a registry configuration from a file path.
pub fn load_config(path: &Path) -> Result<RegistryConfig, LoadError> {
    parse_config(load_json(path)?)
}

/// Load a registry configuration from a JSON string.
pub fn load_config_str(content: &str) -> Result<RegistryConfig, LoadError> {
    let value = serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    parse_config(value)
}

/// Load a JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let response = response
        .error_for_status()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    response.json().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })
}

/// Load a registry configuration from an HTTP/HTTPS URL.
#[cfg(feature = "remote")]
pub fn load_config_url(url: &str) -> Result<RegistryConfig, LoadError> {
    parse_config(load_json_url(url)?)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a registry configuration from a file path or URL.
///
/// URLs require the `remote` feature.
pub fn load_config_auto(source: &str) -> Result<RegistryConfig, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_config_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::InvalidDocument {
                message: format!("remote loading is disabled: {}", source),
            })
        }
    } else {
        load_config(Path::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "base_type": "Pet",
        "discriminator": "kind",
        "base": { "name": "Pet", "fields": [{ "name": "id", "read_only": true }] },
        "variants": [{ "type": "Dog" }]
    }"#;

    #[test]
    fn is_url_detection() {
        assert!(is_url("http://example.com/registry.json"));
        assert!(is_url("https://example.com/registry.json"));
        assert!(!is_url("registry.json"));
        assert!(!is_url("/abs/registry.json"));
    }

    #[test]
    fn load_config_str_parses() {
        let config = load_config_str(CONFIG).unwrap();
        assert_eq!(config.base_type.as_str(), "Pet");
        assert_eq!(config.variants.unwrap().len(), 1);
    }

    #[test]
    fn load_config_str_rejects_bad_json() {
        let result = load_config_str("{ not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_config_str_rejects_wrong_shape() {
        let result = load_config_str(r#"{ "base_type": "Pet", "discriminator": 5 }"#);
        assert!(matches!(result, Err(LoadError::InvalidDocument { .. })));
    }

    #[test]
    fn load_json_missing_file() {
        let result = load_json(Path::new("/nonexistent/registry.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_config_auto_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = load_config_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.discriminator, "kind");
    }

    #[cfg(feature = "remote")]
    #[test]
    fn load_config_url_fetches_document() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/registry.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CONFIG)
            .create();

        let url = format!("{}/registry.json", server.url());
        let config = load_config_auto(&url).unwrap();

        mock.assert();
        assert_eq!(config.base_type.as_str(), "Pet");
    }

    #[cfg(feature = "remote")]
    #[test]
    fn load_config_url_reports_http_errors() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing.json").with_status(404).create();

        let url = format!("{}/missing.json", server.url());
        let result = load_config_url(&url);
        assert!(matches!(result, Err(LoadError::NetworkError { .. })));
    }
}
