//! Configuration types and loading
//!
//! Precedence: env vars > host config file > packaged defaults.
//! The packaged `config/imgur.toml` is merged under the host file one table
//! at a time, so a host file only needs the keys it changes. The client
//! secret is resolved from IMGUR_CLIENT_SECRET, then `client_secret_file`,
//! then the TOML value.

use common::Secret;
use imgur_auth::ClientCredentials;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Packaged default configuration
pub const DEFAULT_CONFIG: &str = include_str!("../config/imgur.toml");

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub imgur: ImgurConfig,
    pub routes: RoutesConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub timeout_secs: u64,
    pub max_connections: usize,
}

/// Imgur client and token storage settings
#[derive(Debug, Deserialize)]
pub struct ImgurConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    /// Name of the token storage backend
    pub token_storage: String,
    pub storage_key: String,
    pub storage_path: PathBuf,
    pub api_base_url: String,
    pub persist_refreshed_tokens: bool,
}

/// Paths of the named routes the gateway serves
#[derive(Debug, Clone, Deserialize)]
pub struct RoutesConfig {
    pub authenticate: String,
}

impl ImgurConfig {
    /// Application credentials, failing if either half is missing.
    pub fn credentials(&self) -> common::Result<ClientCredentials> {
        if self.client_id.trim().is_empty() {
            return Err(common::Error::MissingCredential("client_id"));
        }
        let secret = match &self.client_secret {
            Some(s) if !s.is_blank() => s.clone(),
            _ => return Err(common::Error::MissingCredential("client_secret")),
        };
        Ok(ClientCredentials {
            client_id: self.client_id.clone(),
            client_secret: secret,
        })
    }
}

impl Config {
    /// Load configuration from a TOML file merged over the packaged defaults,
    /// then overlay environment variables and validate.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse a host TOML document merged over the packaged defaults.
    pub fn from_toml(contents: &str) -> common::Result<Self> {
        let host: toml::Table = toml::from_str(contents)?;
        let defaults: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        let merged = merge_tables(defaults, host);
        let mut config: Config = toml::Value::Table(merged).try_into()?;

        if let Ok(id) = std::env::var("IMGUR_CLIENT_ID") {
            config.imgur.client_id = id;
        }

        // Resolve client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("IMGUR_CLIENT_SECRET") {
            config.imgur.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.imgur.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.imgur.client_secret = Some(Secret::new(secret));
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        self.imgur.credentials()?;

        if !self.imgur.api_base_url.starts_with("http://")
            && !self.imgur.api_base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "api_base_url must start with http:// or https://, got: {}",
                self.imgur.api_base_url
            )));
        }

        if self.imgur.token_storage.trim().is_empty() {
            return Err(common::Error::Config(
                "token_storage must name a storage backend".into(),
            ));
        }

        if self.imgur.storage_key.is_empty() {
            return Err(common::Error::Config("storage_key must not be empty".into()));
        }

        if !self.routes.authenticate.starts_with('/') {
            return Err(common::Error::Config(format!(
                "routes.authenticate must be an absolute path, got: {}",
                self.routes.authenticate
            )));
        }

        let reserved = ["/health", "/metrics", "/imgur/account"];
        if reserved.contains(&self.routes.authenticate.as_str())
            || self.routes.authenticate.starts_with("/3/")
        {
            return Err(common::Error::Config(format!(
                "routes.authenticate collides with a built-in route: {}",
                self.routes.authenticate
            )));
        }

        if self.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("imgur-gateway.toml")
    }

    /// Write the packaged default configuration to `path` for the host to
    /// customise. Returns `false` without touching the file if it exists.
    pub fn publish_default(path: &Path) -> common::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, DEFAULT_CONFIG)?;
        Ok(true)
    }
}

/// Merge `host` over `defaults`. Tables present in both are merged key by
/// key (host wins); any other value from `host` replaces the default whole.
fn merge_tables(mut defaults: toml::Table, host: toml::Table) -> toml::Table {
    for (key, value) in host {
        match (defaults.get_mut(&key), value) {
            (Some(toml::Value::Table(base)), toml::Value::Table(overlay)) => {
                debug!(table = %key, keys = overlay.len(), "merging config table over defaults");
                for (k, v) in overlay {
                    base.insert(k, v);
                }
            }
            (_, value) => {
                defaults.insert(key, value);
            }
        }
    }
    defaults
}
