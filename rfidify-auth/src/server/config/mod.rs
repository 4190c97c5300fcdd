use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use crate::error::AuthError;

#[derive(Debug, Deserialize, Clone)]
pub struct Configuration {
    #[serde(default)]
    pub server: ServerConfiguration,
    pub spotify: SpotifyConfiguration,
    #[serde(default)]
    pub storage: StorageConfiguration,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfiguration {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Pending authorizations older than this are discarded
    #[serde(default = "default_authorization_ttl")]
    pub authorization_ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpotifyConfiguration {
    pub client_id: String,
    pub client_secret: String,

    /// Redirect target used when the initiating caller does not name one
    pub redirect_uri: String,

    #[serde(default = "default_accounts_base_url")]
    pub accounts_base_url: String,

    #[serde(default = "default_web_api_base_url")]
    pub web_api_base_url: String,

    #[serde(default = "default_scopes")]
    pub scopes: String,

    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_seconds: i64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfiguration {
    #[serde(default = "default_persist_tokens")]
    pub persist_tokens: bool,

    /// Defaults to `<data dir>/rfidify/tokens.json`
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            authorization_ttl_seconds: default_authorization_ttl(),
        }
    }
}

impl Default for StorageConfiguration {
    fn default() -> Self {
        Self {
            persist_tokens: default_persist_tokens(),
            token_path: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_authorization_ttl() -> u64 {
    600
}

fn default_accounts_base_url() -> String {
    spotify_api::ACCOUNTS_BASE_URL.to_string()
}

fn default_web_api_base_url() -> String {
    spotify_api::WEB_API_BASE_URL.to_string()
}

fn default_scopes() -> String {
    [
        "user-read-playback-state",
        "user-modify-playback-state",
        "playlist-read-private",
        "playlist-read-collaborative",
    ]
    .join(" ")
}

fn default_refresh_margin() -> i64 {
    60
}

fn default_request_timeout() -> u64 {
    10
}

fn default_persist_tokens() -> bool {
    true
}

impl Configuration {
    pub fn new() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(config::File::with_name("config"));
        }

        builder = builder.add_source(config::Environment::with_prefix("RFIDIFY").separator("__"));

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.spotify.client_id.is_empty() {
            return Err(AuthError::Configuration(
                "spotify.client_id is required".to_string(),
            ));
        }
        if self.spotify.client_secret.is_empty() {
            return Err(AuthError::Configuration(
                "spotify.client_secret is required".to_string(),
            ));
        }

        for (name, value) in [
            ("spotify.accounts_base_url", &self.spotify.accounts_base_url),
            ("spotify.web_api_base_url", &self.spotify.web_api_base_url),
            ("spotify.redirect_uri", &self.spotify.redirect_uri),
        ] {
            let url = Url::parse(value)
                .map_err(|e| AuthError::Configuration(format!("{} is invalid: {}", name, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AuthError::Configuration(format!(
                    "{} must be a valid HTTP(S) URL",
                    name
                )));
            }
        }

        if !(0..=3600).contains(&self.spotify.refresh_margin_seconds) {
            return Err(AuthError::Configuration(
                "spotify.refresh_margin_seconds must be between 0 and 3600".to_string(),
            ));
        }

        Ok(())
    }

    /// Where persisted tokens live, if persistence is enabled
    pub fn token_path(&self) -> Result<Option<PathBuf>, AuthError> {
        if !self.storage.persist_tokens {
            return Ok(None);
        }

        if let Some(path) = &self.storage.token_path {
            return Ok(Some(path.clone()));
        }

        let data_dir = dirs::data_local_dir().ok_or_else(|| {
            AuthError::Configuration("Could not find data directory".to_string())
        })?;
        Ok(Some(data_dir.join("rfidify").join("tokens.json")))
    }
}
