// Configuration loading and validation
use crate::domain::normalizer::{ColumnMap, DuplicateColumn};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error(transparent)]
    DuplicateColumn(#[from] DuplicateColumn),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub monday: MondaySettings,
    #[serde(default)]
    pub columns: ColumnMap,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub map: MapSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MondaySettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub board_id: String,
    /// Account subdomain used for links back to items (`<subdomain>.monday.com`)
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 60 }
    }
}

#[derive(Debug, Deserialize, Clone, serde::Serialize, PartialEq)]
#[serde(default)]
pub struct MapSettings {
    pub cluster_markers: bool,
    pub tile_url: String,
    pub attribution: String,
    pub zoom: u8,
    pub currency_symbol: String,
    pub auto_refresh_secs: u64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            cluster_markers: true,
            tile_url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors &copy; CARTO".to_string(),
            zoom: 4,
            currency_symbol: "$".to_string(),
            auto_refresh_secs: 60,
        }
    }
}

impl Default for MondaySettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: String::new(),
            board_id: String::new(),
            subdomain: None,
            api_version: None,
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.monday.com/v2".to_string()
}

fn default_page_size() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Reject settings the dashboard cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monday.token.trim().is_empty() {
            return Err(ConfigError::Missing("monday.token"));
        }
        if self.monday.board_id.trim().is_empty() {
            return Err(ConfigError::Missing("monday.board_id"));
        }
        validate_columns(&self.columns)
    }
}

/// The location column is required and no column may feed two recognized fields
pub fn validate_columns(columns: &ColumnMap) -> Result<(), ConfigError> {
    if columns.location.trim().is_empty() {
        return Err(ConfigError::Missing("columns.location"));
    }
    columns.check_duplicates()?;
    Ok(())
}

/// Load configuration from `config/dashboard.*`, `ORDERS_MAP__*` variables and the
/// conventional `MONDAY_*` variables, in increasing priority
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("ORDERS_MAP")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("columns.extras")
                .try_parsing(true),
        )
        .set_override_option("monday.token", env("MONDAY_API_TOKEN"))?
        .set_override_option("monday.board_id", env("MONDAY_BOARD_ID"))?
        .set_override_option("monday.subdomain", env("MONDAY_SUBDOMAIN"))?
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
