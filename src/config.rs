//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{BridgePolicy, GoogleSettings};
use crate::error::Error;
use crate::Result;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Habitual REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Directory holding the session jar and redirect state
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub google: GoogleConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Google OAuth client registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,

    /// Desktop OAuth clients are issued a (non-confidential) secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default = "default_callback_port")]
    pub callback_port: u16,

    /// Landing URL registered for redirect sign-ins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    #[serde(default = "default_popup_timeout_secs")]
    pub popup_timeout_secs: u64,

    /// How long a redirect sign-in may take before its return is refused
    #[serde(default = "default_redirect_ttl_secs")]
    pub redirect_ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,

    /// Mark session cookies secure; defaults to whether the API is served over https
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_exchange_timeout_secs")]
    pub exchange_timeout_secs: u64,

    #[serde(default)]
    pub fallback_on_popup_closed: bool,

    /// Where to go after a successful sign-in
    #[serde(default = "default_home_route")]
    pub home_route: String,
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_data_dir() -> PathBuf {
    config_dir().join("data")
}

fn default_callback_port() -> u16 {
    8085
}

fn default_popup_timeout_secs() -> u64 {
    120
}

fn default_redirect_ttl_secs() -> i64 {
    600
}

fn default_session_ttl_days() -> i64 {
    7
}

fn default_exchange_timeout_secs() -> u64 {
    10
}

fn default_home_route() -> String {
    "/dashboard".to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            callback_port: default_callback_port(),
            redirect_uri: None,
            popup_timeout_secs: default_popup_timeout_secs(),
            redirect_ttl_secs: default_redirect_ttl_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
            secure: None,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            exchange_timeout_secs: default_exchange_timeout_secs(),
            fallback_on_popup_closed: false,
            home_route: default_home_route(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            data_dir: default_data_dir(),
            google: GoogleConfig::default(),
            session: SessionConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl Config {
    pub fn google_settings(&self) -> GoogleSettings {
        let mut settings = GoogleSettings::new(self.google.client_id.clone());
        settings.client_secret = self.google.client_secret.clone();
        settings.callback_port = self.google.callback_port;
        settings.redirect_uri = self.google.redirect_uri.clone();
        settings.popup_timeout = Duration::from_secs(self.google.popup_timeout_secs);
        settings.flight_ttl = chrono::Duration::seconds(self.google.redirect_ttl_secs);
        settings
    }

    pub fn bridge_policy(&self) -> BridgePolicy {
        BridgePolicy {
            exchange_timeout: Duration::from_secs(self.bridge.exchange_timeout_secs),
            fallback_on_popup_closed: self.bridge.fallback_on_popup_closed,
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session.ttl_days)
    }

    pub fn secure_cookies(&self) -> bool {
        self.session
            .secure
            .unwrap_or_else(|| self.api_base_url.starts_with("https://"))
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn flight_path(&self) -> PathBuf {
        self.data_dir.join("redirect_flight.json")
    }

    /// Check the settings sign-in cannot work without
    pub fn validate(&self) -> Result<()> {
        if self.google.client_id.trim().is_empty() {
            return Err(Error::Config(
                "google.client_id is not set. Run 'habitual init' first.".to_string(),
            ));
        }
        url::Url::parse(&self.api_base_url)
            .map_err(|e| Error::Config(format!("api_base_url is not a valid URL: {}", e)))?;
        if self.session.ttl_days <= 0 {
            return Err(Error::Config("session.ttl_days must be positive".to_string()));
        }
        Ok(())
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".habitual")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from file
pub fn load() -> Result<Config> {
    let path = config_path();

    if !path.exists() {
        return Err(Error::Config(format!(
            "Config not found at {:?}. Run 'habitual init' first.",
            path
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Load configuration, falling back to defaults when no file exists
pub fn load_or_default() -> Result<Config> {
    if config_path().exists() {
        load()
    } else {
        Ok(Config::default())
    }
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    let path = config_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

/// Interactive first-run setup
pub fn onboard() -> Result<()> {
    use crate::ui;
    use inquire::{Confirm, Text};

    ui::print_header("Setup");
    println!("  Let's connect Habitual to your Google OAuth client.\n");

    let mut config = load_or_default()?;

    let prompt_failed = |e: inquire::InquireError| Error::Config(format!("Prompt failed: {}", e));

    config.api_base_url = Text::new("Habitual API base URL:")
        .with_default(&config.api_base_url)
        .prompt()
        .map_err(prompt_failed)?;

    config.google.client_id = Text::new("Google OAuth client ID:")
        .with_default(&config.google.client_id)
        .prompt()
        .map_err(prompt_failed)?;

    let secret = Text::new("Google OAuth client secret (leave empty if none):")
        .prompt()
        .map_err(prompt_failed)?;
    config.google.client_secret = Some(secret.trim().to_string()).filter(|s| !s.is_empty());

    config.bridge.fallback_on_popup_closed = Confirm::new(
        "Switch to a full redirect when the sign-in window is closed?",
    )
    .with_default(false)
    .prompt()
    .map_err(prompt_failed)?;

    config.validate()?;

    ui::print_thinking("Saving configuration");
    save(&config)?;
    std::fs::create_dir_all(&config.data_dir)?;

    println!();
    ui::print_success("Setup complete!");
    ui::print_step("Run 'habitual login' to sign in.");

    Ok(())
}
