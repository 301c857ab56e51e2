//! Gateway configuration and the credentials derived from it.

use oauth2::{ClientId, ClientSecret, RefreshToken, TokenUrl};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use drivegate_common::{Error, Result};

/// Grant type sent with the refresh credential unless configured otherwise.
pub const DEFAULT_GRANT_TYPE: &str = "refresh_token";

/// Download chunk size (100 MiB).
pub const DEFAULT_DOWNLOAD_CHUNK_SIZE: usize = 100 * 1024 * 1024;

fn default_grant_type() -> String {
    DEFAULT_GRANT_TYPE.to_string()
}

fn default_download_chunk_size() -> usize {
    DEFAULT_DOWNLOAD_CHUNK_SIZE
}

/// On-disk gateway configuration.
///
/// Secrets are held in `oauth2` newtypes so `Debug` output redacts them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Base URL of the REST API (e.g. `https://www.googleapis.com`).
    pub drive_api_url: String,
    /// Base URL of the OAuth2 service; `/token` is appended.
    pub oauth2_url: String,
    /// OAuth2 client ID.
    pub client_id: ClientId,
    /// OAuth2 client secret.
    pub client_secret: ClientSecret,
    /// Long-lived refresh credential.
    pub refresh_token: RefreshToken,
    /// Grant type sent to the token endpoint.
    #[serde(default = "default_grant_type")]
    pub grant_type: String,
    /// Maximum bytes read from the remote body per download chunk.
    #[serde(default = "default_download_chunk_size")]
    pub download_chunk_size: usize,
}

impl DriveConfig {
    /// Read and validate a JSON configuration file.
    ///
    /// # Errors
    /// - File cannot be read
    /// - JSON is malformed or missing required fields
    /// - Any URL fails to parse, or the chunk size is zero
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: DriveConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce usable credentials.
    pub fn validate(&self) -> Result<()> {
        if self.download_chunk_size == 0 {
            return Err(Error::Config(
                "download_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.grant_type.trim().is_empty() {
            return Err(Error::Config("grant_type must not be empty".to_string()));
        }
        self.credentials().map(|_| ())
    }

    /// Build the immutable credentials used by every gateway call.
    pub fn credentials(&self) -> Result<Credentials> {
        let api_base = Url::parse(&self.drive_api_url)
            .map_err(|e| Error::Config(format!("Invalid drive_api_url: {}", e)))?;
        if api_base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "drive_api_url cannot be used as a base: {}",
                self.drive_api_url
            )));
        }

        let token_url = TokenUrl::new(format!("{}/token", self.oauth2_url.trim_end_matches('/')))
            .map_err(|e| Error::Config(format!("Invalid oauth2_url: {}", e)))?;

        Ok(Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
            grant_type: self.grant_type.clone(),
            token_url,
            api_base,
        })
    }
}

/// Immutable, process-wide credentials for the remote API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub refresh_token: RefreshToken,
    pub grant_type: String,
    /// Full token endpoint (`{oauth2_url}/token`).
    pub token_url: TokenUrl,
    /// REST API base URL.
    pub api_base: Url,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "drive_api_url": "https://www.googleapis.com",
            "oauth2_url": "https://oauth2.googleapis.com/",
            "client_id": "client",
            "client_secret": "shh",
            "refresh_token": "refresh"
        }"#
    }

    #[test]
    fn test_defaults_applied() {
        let config: DriveConfig = serde_json::from_str(sample_json()).unwrap();

        assert_eq!(config.grant_type, DEFAULT_GRANT_TYPE);
        assert_eq!(config.download_chunk_size, DEFAULT_DOWNLOAD_CHUNK_SIZE);
    }

    #[test]
    fn test_token_url_appends_token_path() {
        let config: DriveConfig = serde_json::from_str(sample_json()).unwrap();
        let credentials = config.credentials().unwrap();

        assert_eq!(
            credentials.token_url.as_str(),
            "https://oauth2.googleapis.com/token"
        );
        assert_eq!(credentials.api_base.as_str(), "https://www.googleapis.com/");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config: DriveConfig = serde_json::from_str(sample_json()).unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("shh"));
        assert!(!debug.contains("\"refresh\""));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config: DriveConfig = serde_json::from_str(sample_json()).unwrap();
        config.download_chunk_size = 0;

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        let mut config: DriveConfig = serde_json::from_str(sample_json()).unwrap();
        config.drive_api_url = "not a url".to_string();

        assert!(matches!(config.credentials(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let config = DriveConfig::load(file.path()).unwrap();
        assert_eq!(config.client_id.as_str(), "client");
    }

    #[test]
    fn test_load_missing_file() {
        let result = DriveConfig::load(Path::new("/nonexistent/drivegate.json"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
