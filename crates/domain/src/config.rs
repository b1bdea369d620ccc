//! Mount-time configuration and the layered model-parameter store.
//!
//! Parameters exist in layers: a global `[default_config]` layer from the
//! mount-time file, a per-model layer written through `/config`, and a
//! per-session layer written through `/conversations/<id>/config`. Layers
//! merge right-biased: a field set in the more specific layer wins.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Model name that aliases the configured default wherever it appears.
pub const DEFAULT_MODEL_ALIAS: &str = "default";

const FALLBACK_MODEL: &str = "gpt-4o";
const FALLBACK_SEARCH_ENDPOINT: &str = "ipc:///tmp/llmfs-search.ipc";
const FALLBACK_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Everything is a file, even you.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One layer of model parameters. Every field is optional so layers can be
/// merged; an unset field defers to the layer below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelParameters {
    /// Sampling temperature, 0.0 – 2.0.
    pub temperature: Option<f64>,
    /// System prompt prepended to every query.
    pub system_prompt: Option<String>,
}

impl ModelParameters {
    /// Fold `other` on top of `self`: fields set in `other` win.
    pub fn merge(&mut self, other: &ModelParameters) {
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.system_prompt.is_some() {
            self.system_prompt = other.system_prompt.clone();
        }
    }

    /// `self ⊕ other` as a new value.
    pub fn merged(&self, other: &ModelParameters) -> ModelParameters {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.system_prompt.is_none()
    }

    /// Check a TOML table against the parameter schema.
    ///
    /// `temperature` must be a number in [0.0, 2.0] and `system_prompt` a
    /// string. Unknown keys are logged and ignored rather than rejected, so
    /// a config written for a newer build still loads.
    pub fn validate_table(tbl: &toml::Table) -> Result<()> {
        if let Some(value) = tbl.get("temperature") {
            let t = match value {
                toml::Value::Float(f) => *f,
                toml::Value::Integer(i) => *i as f64,
                _ => {
                    return Err(Error::Invalid("'temperature' must be a number".into()));
                }
            };
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::Invalid(
                    "'temperature' must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if let Some(value) = tbl.get("system_prompt") {
            if !value.is_str() {
                return Err(Error::Invalid("'system_prompt' must be a string".into()));
            }
        }

        for key in tbl.keys() {
            if key != "temperature" && key != "system_prompt" {
                tracing::warn!(key = %key, "ignoring unknown parameter key");
            }
        }

        Ok(())
    }

    /// Extract the recognised fields from a validated table.
    pub fn from_table(tbl: &toml::Table) -> ModelParameters {
        let temperature = tbl.get("temperature").and_then(|v| match v {
            toml::Value::Float(f) => Some(*f),
            toml::Value::Integer(i) => Some(*i as f64),
            _ => None,
        });
        let system_prompt = tbl
            .get("system_prompt")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        ModelParameters {
            temperature,
            system_prompt,
        }
    }

    /// Parse and validate a parameter document, e.g. the body of a write to
    /// a `settings.toml` file.
    pub fn parse(text: &str) -> Result<ModelParameters> {
        let tbl: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| Error::Invalid(e.to_string()))?;
        Self::validate_table(&tbl)?;
        Ok(Self::from_table(&tbl))
    }

    /// Serialise the set fields as TOML scalar assignments.
    pub fn to_toml_string(&self) -> String {
        let mut out = String::new();
        if let Some(t) = self.temperature {
            let _ = writeln!(out, "temperature = {}", toml::Value::Float(t));
        }
        if let Some(ref prompt) = self.system_prompt {
            let _ = writeln!(
                out,
                "system_prompt = {}",
                toml::Value::String(prompt.clone())
            );
        }
        out
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mount-time configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configuration parsed once at startup from the `--config` file.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Model the `default` alias resolves to.
    pub default_model: String,
    /// Credential for the LLM endpoint.
    pub api_key: String,
    /// LLM endpoint URL prefix, always ending in `/`.
    pub base_url: String,
    /// Socket endpoint of the semantic-search service.
    pub search_endpoint: String,
    /// Global default parameters from `[default_config]`.
    pub global_params: ModelParameters,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            default_model: FALLBACK_MODEL.into(),
            api_key: String::new(),
            base_url: String::new(),
            search_endpoint: FALLBACK_SEARCH_ENDPOINT.into(),
            global_params: ModelParameters::default(),
        }
    }
}

impl MountConfig {
    /// Load the configuration file. A parse error fails startup; an invalid
    /// `[default_config]` section is dropped with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let tbl: toml::Table = raw
            .parse()
            .map_err(|e: toml::de::Error| Error::Config(e.to_string()))?;

        let mut cfg = Self::default();

        if let Some(model) = tbl.get("default_model").and_then(|v| v.as_str()) {
            cfg.default_model = model.to_owned();
        }
        if let Some(key) = tbl.get("api_key").and_then(|v| v.as_str()) {
            cfg.api_key = key.to_owned();
        }
        if let Some(url) = tbl.get("base_url").and_then(|v| v.as_str()) {
            cfg.base_url = url.to_owned();
            if !cfg.base_url.is_empty() && !cfg.base_url.ends_with('/') {
                cfg.base_url.push('/');
            }
        }

        if let Some(search) = tbl.get("semantic_search").and_then(|v| v.as_table()) {
            if let Some(url) = search.get("service_url").and_then(|v| v.as_str()) {
                cfg.search_endpoint = url.to_owned();
            }
        }

        if let Some(defaults) = tbl.get("default_config").and_then(|v| v.as_table()) {
            match ModelParameters::validate_table(defaults) {
                Ok(()) => {
                    cfg.global_params = ModelParameters::from_table(defaults);
                    if cfg.global_params.system_prompt.is_none() {
                        cfg.global_params.system_prompt = Some(FALLBACK_SYSTEM_PROMPT.into());
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring invalid [default_config] section");
                }
            }
        }

        Ok(cfg)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Layered parameter storage shared by every handler.
///
/// Top-level scalars are fixed at mount time. The parameter layers sit
/// behind one `RwLock`; writers merge atomically under it.
pub struct ConfigStore {
    default_model: String,
    api_key: String,
    base_url: String,
    search_endpoint: String,
    layers: RwLock<ParamLayers>,
}

#[derive(Default)]
struct ParamLayers {
    global: ModelParameters,
    model_specific: HashMap<String, ModelParameters>,
}

impl ConfigStore {
    pub fn new(cfg: MountConfig) -> Self {
        Self {
            default_model: cfg.default_model,
            api_key: cfg.api_key,
            base_url: cfg.base_url,
            search_endpoint: cfg.search_endpoint,
            layers: RwLock::new(ParamLayers {
                global: cfg.global_params,
                model_specific: HashMap::new(),
            }),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn search_endpoint(&self) -> &str {
        &self.search_endpoint
    }

    /// Map the `default` alias to the configured default model.
    pub fn resolve_model(&self, name: &str) -> String {
        if name == DEFAULT_MODEL_ALIAS {
            self.default_model.clone()
        } else {
            name.to_owned()
        }
    }

    /// Effective parameters for a model: `global ⊕ model_specific[model]`.
    pub fn model_params(&self, model: &str) -> ModelParameters {
        let layers = self.layers.read();
        let mut params = layers.global.clone();
        if let Some(specific) = layers.model_specific.get(model) {
            params.merge(specific);
        }
        params
    }

    pub fn global_params(&self) -> ModelParameters {
        self.layers.read().global.clone()
    }

    /// Merge validated parameters into a model's specific layer.
    pub fn update_model_params(&self, model: &str, params: &ModelParameters) {
        let mut layers = self.layers.write();
        layers
            .model_specific
            .entry(model.to_owned())
            .or_default()
            .merge(params);
        tracing::info!(model = %model, "updated model parameters");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
