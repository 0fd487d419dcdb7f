//! Configuration loading and gateway factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizmate_core::traits::{RecommendationGateway, DEFAULT_GATEWAY_TIMEOUT};

use crate::analyzer::PerformanceAnalyzer;
use crate::http::{HttpGateway, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Environment variable that overrides the HTTP gateway API key.
pub const API_KEY_ENV: &str = "QUIZMATE_GATEWAY_KEY";

/// Which recommendation gateway to use.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GatewayConfig {
    /// Remote analysis service.
    Http {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// In-process [`PerformanceAnalyzer`].
    #[default]
    Local,
    /// No recommendations.
    Disabled,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayConfig::Http {
                api_key,
                base_url,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            GatewayConfig::Local => f.write_str("Local"),
            GatewayConfig::Disabled => f.write_str("Disabled"),
        }
    }
}

impl GatewayConfig {
    /// Bound on one recommendation call.
    pub fn timeout(&self) -> Duration {
        match self {
            GatewayConfig::Http { timeout_secs, .. } => Duration::from_secs(*timeout_secs),
            _ => DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level quizmate configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizmateConfig {
    /// Skip the gateway entirely.
    #[serde(default)]
    pub offline: bool,
    /// Shuffle questions before building the bank.
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string. Substituted values are
/// inserted verbatim and never scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_gateway_config(config: &GatewayConfig) -> GatewayConfig {
    match config {
        GatewayConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => GatewayConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key
                .as_ref()
                .map(|k| resolve_env_vars(k))
                .filter(|k| !k.is_empty()),
            timeout_secs: *timeout_secs,
        },
        other => other.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizmate.toml` in the current directory
/// 2. `~/.config/quizmate/config.toml`
///
/// Environment variable override: `QUIZMATE_GATEWAY_KEY`.
pub fn load_config() -> Result<QuizmateConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizmateConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizmate.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizmateConfig::default(),
    };

    tracing::debug!(
        path = ?config_path,
        gateway = ?config.gateway,
        "configuration loaded"
    );
    Ok(config)
}

/// Parse a config document, apply the env override and resolve `${VAR}`s.
pub fn parse_config(content: &str) -> Result<QuizmateConfig> {
    let config: QuizmateConfig = toml::from_str(content)?;
    Ok(apply_overrides(config, std::env::var(API_KEY_ENV).ok()))
}

fn apply_overrides(mut config: QuizmateConfig, key_override: Option<String>) -> QuizmateConfig {
    if let (Some(key), GatewayConfig::Http { api_key, .. }) = (key_override, &mut config.gateway) {
        *api_key = Some(key);
    }
    config.gateway = resolve_gateway_config(&config.gateway);
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizmate"))
}

/// Create a gateway from its configuration. `Disabled` yields `None`.
pub fn create_gateway(config: &GatewayConfig) -> Result<Option<Arc<dyn RecommendationGateway>>> {
    match config {
        GatewayConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => {
            if base_url.trim().is_empty() {
                anyhow::bail!("gateway base_url is empty");
            }
            if *timeout_secs == 0 {
                anyhow::bail!("gateway timeout_secs must be positive");
            }
            Ok(Some(Arc::new(HttpGateway::new(
                Some(base_url.clone()),
                api_key.clone(),
                *timeout_secs,
            ))))
        }
        GatewayConfig::Local => Ok(Some(Arc::new(PerformanceAnalyzer::new()))),
        GatewayConfig::Disabled => Ok(None),
    }
}
