//! Configuration manager for platform-age.

use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8888";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELIX_URL: &str = "https://api.twitch.tv/helix";
const TWITCH_AUTH_URL: &str = "https://id.twitch.tv/oauth2";
const DIRECTORY_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Socket the HTTP server listens on.
    pub address: SocketAddr,
    /// Whole request deadline, in seconds.
    pub timeout_secs: u64,
    #[serde(skip_deserializing)]
    pub version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to the account directory.
    #[serde(skip_serializing)]
    pub directory: Directory,
    /// Related to logs, traces and metrics.
    #[serde(skip_serializing)]
    pub telemetry: Telemetry,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").into(),
            address: DEFAULT_ADDRESS
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8888))),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            directory: Directory::default(),
            telemetry: Telemetry::default(),
        }
    }
}

/// Which directory answers lookups.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    #[default]
    Twitch,
    /// Seeded in-memory accounts, for local development.
    Fake,
}

/// Directory (Twitch Helix) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directory {
    pub kind: DirectoryKind,
    /// Application client ID.
    pub client_id: Option<String>,
    /// Used to request an app token when `access_token` is missing.
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    /// Base URL of the Helix API.
    pub api_url: String,
    /// Base URL of the OAuth2 server.
    pub auth_url: String,
    /// Timeout of a single directory request, in seconds.
    pub timeout_secs: u64,
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            kind: DirectoryKind::default(),
            client_id: None,
            client_secret: None,
            access_token: None,
            api_url: HELIX_URL.into(),
            auth_url: TWITCH_AUTH_URL.into(),
            timeout_secs: DIRECTORY_TIMEOUT_SECS,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    /// Expose Prometheus metrics on `/metrics`.
    pub metrics: bool,
    /// OTLP gRPC endpoint receiving traces and logs.
    pub otlp_endpoint: Option<String>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            metrics: true,
            otlp_endpoint: None,
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`) and carries no trailing slash.
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.as_str().trim_end_matches('/').to_owned())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location, then applies environment overrides.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let mut config = match File::open(file_path) {
            Ok(file) => match serde_yaml::from_reader(file) {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        config.apply(|key| std::env::var(key).ok())?;
        Ok(Arc::new(config))
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let mut config: Configuration = serde_yaml::from_str(yaml)?;
        config.version = VERSION.to_owned();
        Ok(config)
    }

    /// Apply secrets from environment and normalize URLs.
    fn apply(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), url::ParseError> {
        // set app version.
        self.version = VERSION.to_owned();

        if let Some(id) = env("TWITCH_CLIENT_ID") {
            self.directory.client_id = Some(id);
        }
        if let Some(secret) = env("TWITCH_CLIENT_SECRET") {
            self.directory.client_secret = Some(secret);
        }
        if let Some(token) = env("TWITCH_ACCESS_TOKEN") {
            self.directory.access_token = Some(token);
        }

        self.directory.api_url = self.normalize_url(&self.directory.api_url)?;
        self.directory.auth_url = self.normalize_url(&self.directory.auth_url)?;
        Ok(())
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.address.port(), 8888);
        assert_eq!(config.directory.kind, DirectoryKind::Twitch);
        assert_eq!(config.directory.api_url, HELIX_URL);
        assert!(config.telemetry.metrics);
    }

    #[test]
    fn test_from_yaml() {
        let config = Configuration::from_yaml(
            r#"
name: ages
address: 127.0.0.1:3000
directory:
  kind: fake
  client_id: abc
telemetry:
  metrics: false
  otlp_endpoint: http://localhost:4317
"#,
        )
        .unwrap();

        assert_eq!(config.name, "ages");
        assert_eq!(config.address.to_string(), "127.0.0.1:3000");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.directory.kind, DirectoryKind::Fake);
        assert_eq!(config.directory.client_id.as_deref(), Some("abc"));
        assert_eq!(config.directory.auth_url, TWITCH_AUTH_URL);
        assert!(!config.telemetry.metrics);
        assert_eq!(
            config.telemetry.otlp_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = Configuration::from_yaml(
            "directory:\n  client_id: file\n  api_url: helix.example.com/\n",
        )
        .unwrap();

        config
            .apply(|key| match key {
                "TWITCH_CLIENT_ID" => Some("env-id".into()),
                "TWITCH_CLIENT_SECRET" => Some("env-secret".into()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.directory.client_id.as_deref(), Some("env-id"));
        assert_eq!(config.directory.client_secret.as_deref(), Some("env-secret"));
        assert_eq!(config.directory.access_token, None);
        assert_eq!(config.directory.api_url, "https://helix.example.com");
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Configuration::default()
            .path(PathBuf::from("does/not/exist.yaml"))
            .read()
            .unwrap();
        assert_eq!(config.version, VERSION);
    }
}
