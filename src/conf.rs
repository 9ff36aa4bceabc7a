use std::{path::PathBuf, str::FromStr};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::templates::TemplateServerContext;

/* -------------------------------------------------------------------------- */
/*                                   Errors                                   */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no translator definitions")]
    NoTranslators,
    #[error("multiple prefix mappings for repo owner {owner:?}: {first:?} and {second:?}")]
    ConflictingOwner {
        owner: String,
        first: String,
        second: String,
    },
    #[error("missing integration ID")]
    MissingIntegrationId,
    #[error("config has no GitHub App private key")]
    MissingPrivateKey,
    #[error("failed to read private key file {path:?}: {source}")]
    PrivateKeyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid GitHub App private key: {0}")]
    InvalidPrivateKey(jsonwebtoken::errors::Error),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
    #[error("invalid upstream API URL {0:?}: {1}")]
    InvalidApiUrl(String, url::ParseError),
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/* -------------------------------------------------------------------------- */
/*                                  Defaults                                  */
/* -------------------------------------------------------------------------- */

fn default_name() -> String {
    "gogetter".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_general() -> ServerConfigGeneral {
    ServerConfigGeneral {
        name: default_name(),
        hostname: None,
        bind: default_bind(),
        port: default_port(),
        log_file: None,
    }
}

fn default_upstream() -> ServerConfigUpstream {
    ServerConfigUpstream {
        api_url: default_api_url(),
        integration_id: 0,
        private_key: None,
        private_key_file: None,
        hook_secret: None,
        timeout: default_timeout(),
        refresh_interval: None,
    }
}

/* -------------------------------------------------------------------------- */
/*                                  Sections                                  */
/* -------------------------------------------------------------------------- */

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfigGeneral {
    #[serde(default = "default_name")]
    pub name: String,
    /// Public hostname of the service.
    pub hostname: Option<String>,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub log_file: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfigUpstream {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// GitHub App ID.
    #[serde(default)]
    pub integration_id: u64,
    /// PEM encoded App private key.
    pub private_key: Option<String>,
    pub private_key_file: Option<PathBuf>,
    pub hook_secret: Option<String>,
    /// Seconds before an upstream request is abandoned.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Seconds between full rediscoveries. Unset means startup only.
    pub refresh_interval: Option<u64>,
}

/// Assigns one package prefix to one or more upstream account logins.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    pub prefix: String,
    #[serde(default)]
    pub owners: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_general")]
    pub general: ServerConfigGeneral,
    #[serde(default = "default_upstream")]
    pub upstream: ServerConfigUpstream,
    #[serde(default)]
    pub translators: Vec<TranslatorConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            general: default_general(),
            upstream: default_upstream(),
            translators: Vec::new(),
        }
    }
}

/// Environment variables override the config file, eg..
/// `GOGETTER__UPSTREAM__INTEGRATION_ID=1234` sets `upstream.integration_id`
pub fn environment() -> Environment {
    Environment::with_prefix("GOGETTER")
        .separator("__")
        .try_parsing(true)
}

impl ServerConfig {
    /// Layers `env` over the optional config file. Not validated.
    pub fn load(path: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut settings_builder = Config::builder();

        if let Some(v) = path {
            settings_builder = settings_builder.add_source(File::with_name(v));
        }

        let settings = settings_builder.add_source(env).build()?;
        Ok(settings.try_deserialize::<ServerConfig>()?)
    }

    /// Checks everything needed to talk to GitHub and build a registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.translators.iter().all(|t| t.owners.is_empty()) {
            return Err(ConfigError::NoTranslators);
        }

        if self.upstream.integration_id == 0 {
            return Err(ConfigError::MissingIntegrationId);
        }

        if self.upstream.private_key.is_none() && self.upstream.private_key_file.is_none() {
            return Err(ConfigError::MissingPrivateKey);
        }

        self.api_url()?;

        Ok(())
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        // Trailing slash so that Url::join keeps any path prefix (GHE uses /api/v3)
        let raw = match self.upstream.api_url.ends_with('/') {
            true => self.upstream.api_url.clone(),
            false => format!("{}/", self.upstream.api_url),
        };

        Url::from_str(&raw).map_err(|e| ConfigError::InvalidApiUrl(raw, e))
    }

    /// The App private key, read from disk when only a path was given.
    pub fn private_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = &self.upstream.private_key {
            return Ok(key.clone());
        }

        match &self.upstream.private_key_file {
            Some(path) => {
                std::fs::read_to_string(path).map_err(|source| ConfigError::PrivateKeyFile {
                    path: path.clone(),
                    source,
                })
            }
            None => Err(ConfigError::MissingPrivateKey),
        }
    }

    pub fn template_server_context(&self, prefixes: Vec<String>) -> TemplateServerContext {
        TemplateServerContext {
            name: self.general.name.to_string(),
            hostname: self.general.hostname.clone(),
            prefixes,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
