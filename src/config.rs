use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "rolo";

pub const DEFAULT_BASE_URL: &str = "https://dummyapi.io/data/v1";
/// Public application id for the demo API. Not a secret.
pub const DEFAULT_APP_ID: &str = "64fc4a747b1786417e354f31";
pub const DEFAULT_PICTURE: &str = "https://media.istockphoto.com/id/1337144146/vector/default-avatar-profile-icon-vector.jpg?s=612x612&w=0&k=20&c=BIbFwuv7FxTWvh5S3vB6bkT0Qv8Vn8N5Ffseq84ClGI=";
/// The API refuses larger pages.
pub const MAX_PAGE_SIZE: usize = 50;
const DEFAULT_TOAST_MS: u64 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    /// File the settings came from, `None` when running on defaults
    pub config_path: Option<PathBuf>,
    pub base_url: String,
    pub app_id: String,
    pub page_size: usize,
    pub default_picture: String,
    pub toast_ms: u64,
    pub request_timeout_secs: Option<u64>,
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id: DEFAULT_APP_ID.to_string(),
            page_size: MAX_PAGE_SIZE,
            default_picture: DEFAULT_PICTURE.to_string(),
            toast_ms: DEFAULT_TOAST_MS,
            request_timeout_secs: None,
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Command-line flags win over the file.
    pub fn apply_overrides(&mut self, base_url: Option<String>, app_id: Option<String>) -> Result<()> {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if let Some(id) = app_id {
            self.app_id = id;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!("base_url must start with http:// or https://, got `{}`", self.base_url);
        }
        if self.app_id.trim().is_empty() {
            bail!("app_id must not be empty");
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            bail!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.page_size
            );
        }
        if self.toast_ms == 0 {
            bail!("toast_ms must be greater than zero");
        }
        Ok(())
    }
}

// =============================================================================
// UI Configuration
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub success: RgbColor,
    pub error: RgbColor,
}

impl Default for UiColors {
    fn default() -> Self {
        UiColorsFile::default().into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    base_url: Option<String>,
    app_id: Option<String>,
    page_size: Option<usize>,
    default_picture: Option<String>,
    toast_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    ui: UiFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
    success: RgbColor,
    error: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(56, 189, 248),
            selection_bg: RgbColor::new(56, 189, 248),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(56, 189, 248),
            status_fg: RgbColor::new(56, 189, 248),
            status_bg: RgbColor::new(0, 0, 0),
            success: RgbColor::new(34, 197, 94),
            error: RgbColor::new(239, 68, 68),
        }
    }
}

impl From<UiColorsFile> for UiColors {
    fn from(file: UiColorsFile) -> Self {
        Self {
            border: file.border,
            selection_bg: file.selection_bg,
            selection_fg: file.selection_fg,
            separator: file.separator,
            status_fg: file.status_fg,
            status_bg: file.status_bg,
            success: file.success,
            error: file.error,
        }
    }
}

impl ConfigFile {
    fn into_config(self, config_path: Option<PathBuf>) -> Result<Config> {
        let defaults = Config::default();
        let default_picture = self
            .default_picture
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.default_picture);

        let config = Config {
            config_path,
            base_url: self.base_url.unwrap_or(defaults.base_url),
            app_id: self.app_id.unwrap_or(defaults.app_id),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            default_picture,
            toast_ms: self.toast_ms.unwrap_or(defaults.toast_ms),
            request_timeout_secs: self.request_timeout_secs,
            ui: UiConfig {
                colors: self.ui.colors.into(),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    let dir = base.config_dir().join(APP_NAME);
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from `explicit` or the default location.
///
/// A missing default file means built-in defaults; a missing explicit file is an error.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    parse(&raw, Some(path.clone()))
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

fn parse(raw: &str, config_path: Option<PathBuf>) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse as TOML")?;

    for key in unknown_keys(&value) {
        eprintln!("warning: unknown configuration key `{}`", key);
    }

    let cfg_file: ConfigFile = value
        .try_into()
        .context("failed to deserialize config")?;

    cfg_file.into_config(config_path)
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn unknown_keys(value: &toml::Value) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };

    let known = HashSet::from([
        "base_url",
        "app_id",
        "page_size",
        "default_picture",
        "toast_ms",
        "request_timeout_secs",
        "ui",
    ]);

    let mut unknown: Vec<String> = table
        .keys()
        .filter(|key| !known.contains(key.as_str()))
        .cloned()
        .collect();

    if let Some(ui) = table.get("ui").and_then(|v| v.as_table()) {
        for key in ui.keys().filter(|key| key.as_str() != "colors") {
            unknown.push(format!("ui.{}", key));
        }
        if let Some(colors) = ui.get("colors").and_then(|v| v.as_table()) {
            let known_colors = HashSet::from([
                "border",
                "selection_bg",
                "selection_fg",
                "separator",
                "status_fg",
                "status_bg",
                "success",
                "error",
            ]);
            for key in colors.keys() {
                if !known_colors.contains(key.as_str()) {
                    unknown.push(format!("ui.colors.{}", key));
                }
            }
        }
    }

    unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("", None).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.default_picture, DEFAULT_PICTURE);
        assert_eq!(config.toast_ms, 3000);
        assert_eq!(config.request_timeout_secs, None);
    }

    #[test]
    fn test_values_and_colors() {
        let raw = r#"
base_url = "http://localhost:8080/data/v1"
page_size = 20
request_timeout_secs = 10
default_picture = "  "

[ui.colors]
border = [1, 2, 3]
error = { r = 200, g = 0, b = 0 }
"#;
        let config = parse(raw, None).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/data/v1");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.request_timeout_secs, Some(10));
        // Blank picture falls back to the placeholder
        assert_eq!(config.default_picture, DEFAULT_PICTURE);
        assert_eq!(config.ui.colors.border, RgbColor::new(1, 2, 3));
        assert_eq!(config.ui.colors.error, RgbColor::new(200, 0, 0));
        assert_eq!(config.ui.colors.success, RgbColor::new(34, 197, 94));
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(parse("page_size = 0", None).is_err());
        assert!(parse("page_size = 51", None).is_err());
        assert!(parse("page_size = 1", None).is_ok());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        assert!(parse(r#"base_url = "ftp://example.com""#, None).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(Some("http://127.0.0.1:9".into()), Some("abc".into()))
            .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9");
        assert_eq!(config.app_id, "abc");

        assert!(config.apply_overrides(None, Some(" ".into())).is_err());
    }

    #[test]
    fn test_unknown_keys() {
        let value: toml::Value = toml::from_str(
            r#"
base_url = "https://example.com"
vdir = "/tmp"

[ui]
icons = {}

[ui.colors]
border = [0, 0, 0]
shadow = [0, 0, 0]
"#,
        )
        .unwrap();
        let mut keys = unknown_keys(&value);
        keys.sort();
        assert_eq!(keys, vec!["ui.colors.shadow", "ui.icons", "vdir"]);
    }
}
