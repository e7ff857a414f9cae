use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::highlight::{self, HighlightStyle};

const DEFAULT_ENV_PREFIX: &str = "VIDNAV";

/// User-facing settings. Every field carries its own default so files written
/// by older versions (or hand-edited down to a subset) keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_enabled")]
    pub enable_double_esc: bool,
    #[serde(default = "default_enabled")]
    pub enable_number_keys: bool,
    #[serde(default = "default_enabled")]
    pub enable_scroll_keys: bool,
    #[serde(default = "default_enabled")]
    pub show_badges: bool,
    #[serde(default = "default_highlight_color")]
    pub highlight_color: String,
    #[serde(default)]
    pub highlight_style: HighlightStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_double_esc: default_enabled(),
            enable_number_keys: default_enabled(),
            enable_scroll_keys: default_enabled(),
            show_badges: default_enabled(),
            highlight_color: default_highlight_color(),
            highlight_style: HighlightStyle::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_highlight_color() -> String {
    highlight::DEFAULT_COLOR.to_string()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

/// Load settings from the config file (explicit path or the default
/// location), then apply environment overrides. A missing, unreadable, or
/// malformed file falls back to defaults; loading never blocks startup.
pub fn load(options: LoadOptions) -> Settings {
    let path = options
        .config_file
        .clone()
        .or_else(default_config_path);

    let mut settings = Settings::default();
    if let Some(path) = path.as_ref() {
        if path.exists() {
            match read_settings_file(path) {
                Ok(from_file) => settings = from_file,
                Err(err) => {
                    log::warn!("config: falling back to defaults: {err:#}");
                }
            }
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    load_env(&mut settings, prefix);

    settings
}

fn read_settings_file(path: &Path) -> Result<Settings> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let settings: Settings = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(settings)
}

fn load_env(settings: &mut Settings, prefix: &str) {
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            apply_env_value(settings, &stripped.to_ascii_lowercase(), value);
        }
    }
}

fn apply_env_value(settings: &mut Settings, key: &str, value: String) {
    match key {
        "enable_double_esc" => settings.enable_double_esc = parse_bool(&value),
        "enable_number_keys" => settings.enable_number_keys = parse_bool(&value),
        "enable_scroll_keys" => settings.enable_scroll_keys = parse_bool(&value),
        "show_badges" => settings.show_badges = parse_bool(&value),
        "highlight_color" => {
            if highlight::is_valid_hex(&value) {
                settings.highlight_color = value;
            } else {
                log::warn!("config: ignoring invalid highlight color {value:?}");
            }
        }
        "highlight_style" => match serde_yaml::from_str::<HighlightStyle>(&value) {
            Ok(style) => settings.highlight_style = style,
            Err(_) => log::warn!("config: ignoring unknown highlight style {value:?}"),
        },
        _ => {}
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True")
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vidnav").join("config.yaml"))
}

/// Write settings to `path` (or the default location), creating parent
/// directories as needed. Returns the path written.
pub fn save(path: Option<PathBuf>, settings: &Settings) -> Result<PathBuf> {
    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(settings).context("config: failed to serialize settings")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let settings = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/vidnav.yaml")),
            env_prefix: Some("VIDNAV_TEST_NONE".into()),
        });
        assert_eq!(settings, Settings::default());
        assert!(settings.enable_number_keys);
        assert_eq!(settings.highlight_color, highlight::DEFAULT_COLOR);
    }

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "show_badges: false\nhighlight_style: glow\n").unwrap();
        let settings = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("VIDNAV_TEST_PARTIAL".into()),
        });
        assert!(!settings.show_badges);
        assert_eq!(settings.highlight_style, HighlightStyle::Glow);
        assert!(settings.enable_double_esc);
        assert_eq!(settings.highlight_color, highlight::DEFAULT_COLOR);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "show_badges: [not, a, bool\n").unwrap();
        let settings = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("VIDNAV_TEST_BAD".into()),
        });
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn env_overrides() {
        env::set_var("VIDNAV_TEST_ENV_ENABLE_SCROLL_KEYS", "false");
        env::set_var("VIDNAV_TEST_ENV_HIGHLIGHT_COLOR", "#112233");
        let settings = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/vidnav.yaml")),
            env_prefix: Some("VIDNAV_TEST_ENV".into()),
        });
        env::remove_var("VIDNAV_TEST_ENV_ENABLE_SCROLL_KEYS");
        env::remove_var("VIDNAV_TEST_ENV_HIGHLIGHT_COLOR");
        assert!(!settings.enable_scroll_keys);
        assert_eq!(settings.highlight_color, "#112233");
    }

    #[test]
    fn invalid_env_color_is_ignored() {
        env::set_var("VIDNAV_TEST_COLOR_HIGHLIGHT_COLOR", "chartreuse");
        let settings = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/vidnav.yaml")),
            env_prefix: Some("VIDNAV_TEST_COLOR".into()),
        });
        env::remove_var("VIDNAV_TEST_COLOR_HIGHLIGHT_COLOR");
        assert_eq!(settings.highlight_color, highlight::DEFAULT_COLOR);
    }

    #[test]
    fn save_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let settings = Settings {
            highlight_color: "#3b82f6".into(),
            highlight_style: HighlightStyle::Solid,
            enable_double_esc: false,
            ..Settings::default()
        };
        save(Some(path.clone()), &settings).unwrap();
        let reloaded = read_settings_file(&path).unwrap();
        assert_eq!(reloaded, settings);
    }
}
