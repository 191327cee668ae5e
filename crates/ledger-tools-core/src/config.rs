//! Configuration for the classifier
//!
//! Loaded with a two-layer resolution:
//! 1. Override file in the config dir (~/.config/ledger-tools/config.toml)
//! 2. Embedded default (config/ledger-tools.toml, compiled into binary)
//!
//! `LEDGER_TOOLS_LLM_*` environment variables are applied last so API keys can
//! stay out of files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ledger::DEFAULT_CURRENCY_SYMBOL;
use crate::models::{ProcessingMode, RuleOrder, DEFAULT_PAYEE};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/ledger-tools.toml");

pub const ENV_LLM_PROVIDER: &str = "LEDGER_TOOLS_LLM_PROVIDER";
pub const ENV_LLM_API_KEY: &str = "LEDGER_TOOLS_LLM_API_KEY";
pub const ENV_LLM_MODEL: &str = "LEDGER_TOOLS_LLM_MODEL";
pub const ENV_LLM_BASE_URL: &str = "LEDGER_TOOLS_LLM_BASE_URL";

/// LLM provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    /// The LLM is only consulted when both a provider and an API key are set
    pub fn is_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.provider) && set(&self.api_key)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            api_key: None,
            model: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: 500,
        }
    }
}

/// Batch processing options
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    pub mode: ProcessingMode,
    /// Skip rows whose existing confidence is above `confidence_threshold`
    pub ignore_high_confidence: bool,
    pub confidence_threshold: f64,
    pub rule_order: RuleOrder,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::RulesLlm,
            ignore_high_confidence: false,
            confidence_threshold: 0.85,
            rule_order: RuleOrder::List,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub currency_symbol: String,
    pub funding_account: Option<String>,
    /// Payee for suggested entries when nothing names one
    pub default_payee: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            funding_account: None,
            default_payee: DEFAULT_PAYEE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub llm: LlmConfig,
    pub processing: ProcessingOptions,
    pub ledger: LedgerConfig,
}

impl Config {
    /// Load from the override file (or default location), then apply env overrides
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut config = load_config(override_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse config from TOML content; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// Apply `LEDGER_TOOLS_LLM_*` overrides read through `get`
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = read(ENV_LLM_PROVIDER) {
            self.llm.provider = Some(provider);
        }
        if let Some(key) = read(ENV_LLM_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = read(ENV_LLM_MODEL) {
            self.llm.model = Some(model);
        }
        if let Some(url) = read(ENV_LLM_BASE_URL) {
            self.llm.base_url = Some(url);
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ledger-tools").join("config.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<Config> {
    let path = match override_path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    let content = match path {
        Some(path) if path.exists() => {
            tracing::debug!(path = %path.display(), "Loading config override");
            fs::read_to_string(&path)
                .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?
        }
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    llm: Option<RawLlm>,
    processing: Option<RawProcessing>,
    ledger: Option<RawLedger>,
}

#[derive(Debug, Deserialize)]
struct RawLlm {
    provider: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawProcessing {
    mode: Option<String>,
    ignore_high_confidence: Option<bool>,
    confidence_threshold: Option<f64>,
    rule_order: Option<RuleOrder>,
}

#[derive(Debug, Deserialize)]
struct RawLedger {
    currency_symbol: Option<String>,
    funding_account: Option<String>,
    default_payee: Option<String>,
}

fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

    let mut config = Config::default();

    if let Some(llm) = raw.llm {
        config.llm.provider = llm.provider.filter(|s| !s.trim().is_empty());
        config.llm.api_key = llm.api_key.filter(|s| !s.trim().is_empty());
        config.llm.model = llm.model.filter(|s| !s.trim().is_empty());
        config.llm.base_url = llm.base_url.filter(|s| !s.trim().is_empty());
        if let Some(temperature) = llm.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(max_tokens) = llm.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
    }

    if let Some(processing) = raw.processing {
        if let Some(mode) = processing.mode {
            config.processing.mode = ProcessingMode::parse_lenient(&mode);
        }
        if let Some(ignore) = processing.ignore_high_confidence {
            config.processing.ignore_high_confidence = ignore;
        }
        if let Some(threshold) = processing.confidence_threshold {
            config.processing.confidence_threshold = threshold;
        }
        if let Some(order) = processing.rule_order {
            config.processing.rule_order = order;
        }
    }

    if let Some(ledger) = raw.ledger {
        if let Some(symbol) = ledger.currency_symbol {
            config.ledger.currency_symbol = symbol;
        }
        config.ledger.funding_account = ledger.funding_account.filter(|s| !s.trim().is_empty());
        if let Some(payee) = ledger.default_payee.filter(|s| !s.trim().is_empty()) {
            config.ledger.default_payee = payee.trim().to_string();
        }
    }

    Ok(config)
}
