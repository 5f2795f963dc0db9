//! Gateway configuration
//!
//! Read from JSON (or TOML for `.toml` paths). API keys are never part of the
//! file; they come from the environment, see [`GatewayConfig::apply_env`].

use geostride_core::providers::store::TAIPEI_SPAWN;
use geostride_core::{Coordinate, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::{GatewayError, Result, DEFAULT_HOST, DEFAULT_PORT};

pub const GOOGLE_PLACES_KEY_VAR: &str = "GOOGLE_PLACES_API_KEY";
pub const NARRATOR_KEY_VAR: &str = "NARRATOR_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,

    pub port: u16,

    /// Where unknown actors appear on first contact. `None` rejects them.
    pub spawn_point: Option<Coordinate>,

    pub geocoder: GeocoderSettings,

    pub narrator: NarratorSettings,

    pub pipeline: PipelineConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            spawn_point: Some(TAIPEI_SPAWN),
            geocoder: GeocoderSettings::default(),
            narrator: NarratorSettings::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_spawn_point(mut self, spawn_point: Option<Coordinate>) -> Self {
        self.spawn_point = spawn_point;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GatewayError::InvalidConfig(format!("bad listen address: {}", e)))
    }

    /// Load from JSON, or TOML when the extension is `.toml`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = if is_toml(path) {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.pipeline.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill provider secrets from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty(GOOGLE_PLACES_KEY_VAR) {
            self.geocoder.api_key = Some(key);
        }
        if let Some(key) = non_empty(NARRATOR_KEY_VAR) {
            self.narrator.api_key = Some(key);
        }
        self
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocoderProvider {
    /// Bundled gazetteer, no network
    #[default]
    Static,
    GooglePlaces,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub provider: GeocoderProvider,

    /// Places API region bias
    pub region: String,

    pub language: String,

    /// Override for the Places API base URL
    pub base_url: Option<String>,

    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            provider: GeocoderProvider::Static,
            region: "tw".to_string(),
            language: "zh-TW".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarratorProvider {
    #[default]
    Template,
    /// Any OpenAI-compatible `/chat/completions` endpoint
    Chat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorSettings {
    pub provider: NarratorProvider,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,

    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for NarratorSettings {
    fn default() -> Self {
        Self {
            provider: NarratorProvider::Template,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 200,
            api_key: None,
        }
    }
}
