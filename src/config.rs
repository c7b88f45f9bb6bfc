use std::{fs, path::PathBuf, time::Duration};

use fractic_server_error::ServerError;
use serde_derive::Deserialize;

use crate::{
    entities::DateAnchor,
    errors::{ConfigReadError, InvalidConfig},
};

pub const API_URL_ENV_VAR: &str = "RESERVATIONS_API_URL";
pub const CACHE_DIR_ENV_VAR: &str = "RESERVATIONS_CACHE_DIR";

/// Aggregator settings. Every field has a default, so an empty RON struct
/// `()` is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Reservations requested per page.
    pub page_limit: u64,
    pub max_pages: u32,
    pub cache_namespace: String,
    /// Directory of the file cache. Without it the cache lives in memory.
    pub cache_dir: Option<PathBuf>,
    /// Properties fetched for the `all` filter. Empty lets the backend
    /// decide.
    pub property_ids: Vec<String>,
    pub window_past_days: u32,
    pub window_future_days: u32,
    pub date_anchor: DateAnchor,
    pub token_env_var: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            request_timeout_secs: 30,
            page_limit: 500,
            max_pages: 20,
            cache_namespace: "reservations".to_string(),
            cache_dir: None,
            property_ids: Vec::new(),
            window_past_days: 365,
            window_future_days: 365,
            date_anchor: DateAnchor::Arrival,
            token_env_var: "RESERVATIONS_API_TOKEN".to_string(),
        }
    }
}

impl AggregatorConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ServerError> {
        ron::from_str(s).map_err(|e| InvalidConfig::with_debug(&e))
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigReadError::with_debug(&path.display().to_string(), &e))?;
        Self::from_ron_str(&contents)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup(API_URL_ENV_VAR) {
            self.api_base_url = url;
        }
        if let Some(dir) = lookup(CACHE_DIR_ENV_VAR) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
