use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellConfig {
    /// Default timeout (seconds) for blocking execute_command calls.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Interval (seconds) between pane captures while a blocking call waits.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_secs() -> u64 {
    2
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopConfig {
    /// X11 display the sandbox desktop runs on.
    #[serde(default = "default_display")]
    pub display: String,
}

fn default_display() -> String {
    ":100".to_string()
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            display: default_display(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// Base URL of the sandbox browser automation service.
    #[serde(default = "default_browser_base_url")]
    pub base_url: String,
    #[serde(default = "default_browser_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_browser_base_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_browser_timeout_secs() -> u64 {
    120
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: default_browser_base_url(),
            request_timeout_secs: default_browser_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionConfig {
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_width() -> u32 {
    1920
}

fn default_max_height() -> u32 {
    1080
}

fn default_jpeg_quality() -> u8 {
    85
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Override for the workspace root; empty means `<base>/workspace`.
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub desktop: DesktopConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub vision: VisionConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Workspace root, honoring the config override when set.
    pub fn workspace_root(&self, paths: &Paths) -> std::path::PathBuf {
        let raw = self.workspace.trim();
        if raw.is_empty() {
            return paths.workspace();
        }
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        std::path::PathBuf::from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.shell.default_timeout_secs, 60);
        assert_eq!(cfg.shell.poll_interval_secs, 2);
        assert_eq!(cfg.desktop.display, ":100");
        assert_eq!(cfg.browser.base_url, "http://127.0.0.1:8081");
        assert_eq!(cfg.vision.max_image_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_partial_config() {
        let raw = r#"{
  "shell": { "defaultTimeoutSecs": 120 },
  "desktop": { "display": ":0" }
}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.shell.default_timeout_secs, 120);
        assert_eq!(cfg.shell.poll_interval_secs, 2);
        assert_eq!(cfg.desktop.display, ":0");
        assert_eq!(cfg.vision.jpeg_quality, 85);
    }

    #[test]
    fn test_workspace_override() {
        let paths = Paths::with_base(std::path::PathBuf::from("/tmp/dh-test"));
        let cfg = Config::default();
        assert_eq!(cfg.workspace_root(&paths), paths.workspace());

        let cfg = Config {
            workspace: "/srv/agent".to_string(),
            ..Default::default()
        };
        assert_eq!(
            cfg.workspace_root(&paths),
            std::path::PathBuf::from("/srv/agent")
        );
    }
}
