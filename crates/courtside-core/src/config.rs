//! Configuration resolution for Courtside.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/courtside/settings.json)
//! 3. Project config (.courtside/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Hard ceiling imposed by the push platform on a single multicast request.
pub const MAX_MULTICAST_TOKENS: usize = 500;

/// Complete Courtside configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub likes: LikeConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub triggers: TriggerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: Option<PathBuf>,
}

/// Like transaction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LikeConfig {
    /// Attempts before a write conflict is surfaced to the caller.
    pub max_attempts: u32,
    /// Base backoff between attempts, multiplied by the attempt number.
    pub retry_backoff_ms: u64,
}

impl Default for LikeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff_ms: 20,
        }
    }
}

/// Push delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Tokens per multicast request, clamped to [`MAX_MULTICAST_TOKENS`].
    pub batch_size: usize,
    /// Path to the FCM service account JSON key file.
    pub credentials_path: Option<PathBuf>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_MULTICAST_TOKENS,
            credentials_path: None,
        }
    }
}

impl PushConfig {
    /// Batch size actually used for fan-out.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_MULTICAST_TOKENS)
    }
}

/// Trigger runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub poll_interval_ms: u64,
    /// Events claimed per polling round.
    pub claim_batch: u32,
    /// Events that failed this many times are no longer claimed.
    pub max_attempts: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            claim_batch: 50,
            max_attempts: 5,
        }
    }
}

/// Realtime change feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub broadcast_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 1024,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// Each file only overrides the keys it sets; everything else keeps the
/// value from the layer below.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut layers = Vec::new();

    if let Some(global_path) = global_config_path()
        && global_path.exists()
    {
        layers.push(load_config_file(&global_path)?);
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".courtside").join("settings.json");
        if project_path.exists() {
            layers.push(load_config_file(&project_path)?);
        }
    }

    let mut config = resolve(layers)?;
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Overlay file layers, lowest priority first, onto the defaults.
fn resolve(layers: impl IntoIterator<Item = Value>) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    for layer in layers {
        merge_value(&mut merged, layer);
    }
    serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))
}

fn config_root() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".courtside"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/courtside"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("courtside"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_root().map(|p| p.join("settings.json"))
}

/// Get the default database path.
pub fn database_path() -> Option<PathBuf> {
    config_root().map(|p| p.join("courtside.db"))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Merge `overlay` into `base` key by key. Keys the overlay omits, or sets to
/// `null`, keep their base value.
fn merge_value(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                if value.is_null() {
                    continue;
                }
                match base.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("COURTSIDE_DB_PATH") {
        config.store.database_path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("COURTSIDE_LIKE_MAX_ATTEMPTS")
        && let Ok(n) = val.parse()
    {
        config.likes.max_attempts = n;
    }
    if let Ok(val) = std::env::var("COURTSIDE_PUSH_BATCH_SIZE")
        && let Ok(n) = val.parse()
    {
        config.push.batch_size = n;
    }
    if let Ok(val) = std::env::var("COURTSIDE_FCM_CREDENTIALS") {
        config.push.credentials_path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("COURTSIDE_TRIGGER_POLL_MS")
        && let Ok(n) = val.parse()
    {
        config.triggers.poll_interval_ms = n;
    }
}
