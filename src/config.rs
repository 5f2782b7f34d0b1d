use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const CONFIG_FILE: &str = "events.yaml";
const DEFAULT_ID_ATTRIBUTE: &str = "data-event-id";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read events config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Whether mouse event names are rewritten to touch ones on registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchAliasing {
    /// Ask the host whether it is touch-only.
    #[default]
    Auto,
    Always,
    Never,
}

impl TouchAliasing {
    pub fn resolve(self, host_supports_touch: bool) -> bool {
        match self {
            TouchAliasing::Auto => host_supports_touch,
            TouchAliasing::Always => true,
            TouchAliasing::Never => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub touch_aliasing: TouchAliasing,
    /// Attribute that carries the registry id on DOM elements.
    pub id_attribute: String,
    /// Event names dispatched as HTML events in addition to the built-in list.
    pub extra_html_events: Vec<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            touch_aliasing: TouchAliasing::Auto,
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            extra_html_events: Vec::new(),
        }
    }
}

impl EventsConfig {
    /// Reads the YAML file at `config_path`, falling back to defaults when no
    /// path is given or the file does not exist.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                serde_yaml::from_str::<EventsConfig>(&contents)?
            }
            _ => EventsConfig::default(),
        };

        if config.id_attribute.trim().is_empty() {
            warn!(
                target = "config",
                "empty id_attribute in events config, using {DEFAULT_ID_ATTRIBUTE}"
            );
            config.id_attribute = DEFAULT_ID_ATTRIBUTE.to_string();
        }

        Ok(config)
    }

    /// `EVENTKIT_CONFIG` when set, else `events.yaml` in the user config directory.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("EVENTKIT_CONFIG") {
            return Some(PathBuf::from(path));
        }

        ProjectDirs::from("org", "Eventkit", "Eventkit")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}
