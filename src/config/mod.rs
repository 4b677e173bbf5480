//! =============================================================================
//! Configuration And Settings
//! =============================================================================
//!
//! Owns every user facing knob (compiler location, data directory, compile
//! timeout, diagnostic scheduling) and exposes typed structures that other
//! subsystems borrow. Values come from the environment at startup and may be
//! overridden later through `workspace/didChangeConfiguration`.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{Map, Value};

pub const COMPILER_PATH_ENV: &str = "METAEDITOR_PATH";
pub const DATA_DIR_ENV: &str = "MQ_BRIDGE_DATA_DIR";
pub const COMPILE_TIMEOUT_ENV: &str = "MQ_BRIDGE_COMPILE_TIMEOUT";

/// Compiler used when `METAEDITOR_PATH` is not set.
pub const FALLBACK_COMPILER: &str = "../metaeditor.exe";

const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettings {
    /// Location of `metaeditor.exe`. `None` falls back to
    /// [`FALLBACK_COMPILER`].
    pub compiler_path: Option<PathBuf>,
    /// Directory holding the compile log and the wine shim. `None` resolves
    /// to `<data dir>/mq-bridge`.
    pub data_dir: Option<PathBuf>,
    /// Upper bound for one compiler run; `None` waits forever.
    pub compile_timeout: Option<Duration>,
    /// Whether `didChange` recompiles or only refreshes the stored text.
    pub publish_on_change: bool,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            compiler_path: None,
            data_dir: None,
            compile_timeout: Some(DEFAULT_COMPILE_TIMEOUT),
            publish_on_change: true,
        }
    }
}

impl PluginSettings {
    /// Reads the environment overrides on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(path) = lookup(COMPILER_PATH_ENV).filter(|value| !value.is_empty()) {
            settings.compiler_path = Some(path.into());
        }
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
            settings.data_dir = Some(dir.into());
        }
        if let Some(timeout) = lookup(COMPILE_TIMEOUT_ENV) {
            settings.compile_timeout =
                parse_timeout(&timeout).map_err(|reason| ConfigError::InvalidTimeout {
                    name: COMPILE_TIMEOUT_ENV,
                    value: timeout.clone(),
                    reason,
                })?;
        }
        Ok(settings)
    }

    /// Resolves the data directory, falling back to the per-user data home.
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("mq-bridge"))
            .ok_or(ConfigError::NoDataDir)
    }

    fn update_from_map(&mut self, map: &Map<String, Value>) -> bool {
        let mut changed = false;

        if let Some(value) = map.get("compilerPath").and_then(|v| v.as_str()) {
            let path = (!value.is_empty()).then(|| PathBuf::from(value));
            if self.compiler_path != path {
                self.compiler_path = path;
                changed = true;
            }
        }

        if let Some(value) = map.get("compileTimeout").and_then(|v| v.as_u64()) {
            let timeout = (value != 0).then(|| Duration::from_secs(value));
            if self.compile_timeout != timeout {
                self.compile_timeout = timeout;
                changed = true;
            }
        }

        if let Some(value) = map.get("publishOnChange").and_then(|v| v.as_bool()) {
            if self.publish_on_change != value {
                self.publish_on_change = value;
                changed = true;
            }
        }

        changed
    }
}

/// Global configuration facade that exposes read-only handles to the settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    plugin: PluginSettings,
}

impl Config {
    pub fn new(plugin: PluginSettings) -> Self {
        Self { plugin }
    }

    pub fn plugin(&self) -> &PluginSettings {
        &self.plugin
    }

    /// Applies workspace/didChangeConfiguration payloads to the cached
    /// settings. Returns `true` when any recognized option changed.
    pub fn apply_workspace_settings(&mut self, settings: &Value) -> bool {
        apply_settings_tree(settings, &mut self.plugin)
    }
}

fn apply_settings_tree(value: &Value, plugin: &mut PluginSettings) -> bool {
    let mut changed = false;
    if let Some(map) = value.as_object() {
        changed |= plugin.update_from_map(map);

        for key in POSSIBLE_SETTING_ROOTS {
            if let Some(candidate) = map.get(*key) {
                changed |= apply_settings_tree(candidate, plugin);
            }
        }
    }
    changed
}

const POSSIBLE_SETTING_ROOTS: &[&str] = &["mq-bridge", "mqBridge", "mq_bridge", "mql"];

/// Parses `SECONDS`, `Ns`, `Nm`, `Nh` or `off`. A zero amount in any unit
/// means no deadline.
pub fn parse_timeout(value: &str) -> Result<Option<Duration>, String> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    let (number, unit) = match trimmed.chars().last() {
        Some('s') => (&trimmed[..trimmed.len() - 1], 1),
        Some('m') => (&trimmed[..trimmed.len() - 1], 60),
        Some('h') => (&trimmed[..trimmed.len() - 1], 3600),
        _ => (trimmed, 1),
    };
    let amount: u64 = number
        .parse()
        .map_err(|_| "expected a number of seconds or an s/m/h suffix".to_string())?;
    if amount == 0 {
        return Ok(None);
    }
    Ok(Some(Duration::from_secs(amount.saturating_mul(unit))))
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{name}={value:?} is invalid: {reason}")]
    InvalidTimeout {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("unable to determine a per-user data directory; set MQ_BRIDGE_DATA_DIR")]
    NoDataDir,
}
