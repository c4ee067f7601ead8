pub mod adb;
pub mod adb_stt;
pub mod android_shizuku;
pub mod list_operations_queue;
pub mod list_operations_queue_stt;
pub mod log_capture;
pub mod onboarding;
pub mod onboarding_stt;
pub mod package_list;
pub mod package_list_stt;
pub mod shell_channel;
pub mod shell_channel_stt;

#[cfg(test)]
mod test_support;

pub use package_list::{ChannelState, ListKey, PackageList, PackageListStore, StoreError};
pub use shell_channel::{ChannelKind, PrivilegedChannel};

use anyhow::{Context, Result};
#[cfg(not(target_os = "android"))]
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// adb, shizuku or local
    #[serde(default = "default_channel")]
    pub channel: String,
    /// adb serial, first device when empty
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub onboarding_complete: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_channel() -> String {
    #[cfg(target_os = "android")]
    {
        "shizuku".to_string()
    }
    #[cfg(not(target_os = "android"))]
    {
        "adb".to_string()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            channel: default_channel(),
            device: None,
            onboarding_complete: false,
        }
    }
}

impl Settings {
    pub fn channel_kind(&self) -> Result<ChannelKind> {
        self.channel
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Invalid channel in settings")
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "android")]
        {
            Self::from_dir(PathBuf::from("/data/data/com.ruyue.flymeframetools/files"))
        }

        #[cfg(not(target_os = "android"))]
        {
            let proj_dirs = ProjectDirs::from("com", "ruyue", "flyme_frame_tools")
                .context("Failed to get project directories")?;

            Self::from_dir(proj_dirs.config_dir().to_path_buf())
        }
    }

    /// Use an explicit directory, creating it if needed.
    pub fn from_dir(config_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config dir {:?}", config_dir))?;
        tracing::debug!("Config dir: {:?}", config_dir);

        Ok(Config { config_dir })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    pub fn load_settings(&self) -> Result<Settings> {
        let settings_path = self.settings_path();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents =
            fs::read_to_string(&settings_path).context("Failed to read settings file")?;

        let settings: Settings =
            serde_json::from_str(&contents).context("Failed to parse settings JSON")?;

        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let settings_path = self.settings_path();

        let json =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        fs::write(&settings_path, json).context("Failed to write settings file")?;

        tracing::info!("Settings saved to {:?}", settings_path);
        Ok(())
    }

    /// Read once at startup to decide whether the wizard runs.
    pub fn is_onboarding_complete(&self) -> bool {
        match self.load_settings() {
            Ok(settings) => settings.onboarding_complete,
            Err(e) => {
                tracing::warn!("Could not read settings, assuming first run: {:#}", e);
                false
            }
        }
    }

    pub fn mark_onboarding_complete(&self) -> Result<()> {
        let mut settings = self.load_settings().unwrap_or_default();
        settings.onboarding_complete = true;
        self.save_settings(&settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_dir(dir.path().join("config")).unwrap();
        (dir, config)
    }

    #[test]
    fn test_missing_settings_uses_defaults() {
        let (_dir, config) = temp_config();
        let settings = config.load_settings().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!config.is_onboarding_complete());
    }

    #[test]
    fn test_settings_round_trip() {
        let (_dir, config) = temp_config();
        let settings = Settings {
            log_level: "debug".to_string(),
            channel: "local".to_string(),
            device: Some("7f1c2a3b".to_string()),
            onboarding_complete: false,
        };
        config.save_settings(&settings).unwrap();
        assert_eq!(config.load_settings().unwrap(), settings);
        assert_eq!(settings.channel_kind().unwrap(), ChannelKind::Local);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let (_dir, config) = temp_config();
        fs::write(config.settings_path(), r#"{ "onboarding_complete": true }"#).unwrap();
        let settings = config.load_settings().unwrap();
        assert!(settings.onboarding_complete);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.device, None);
    }

    #[test]
    fn test_mark_onboarding_complete_keeps_other_settings() {
        let (_dir, config) = temp_config();
        let settings = Settings {
            device: Some("emulator-5554".to_string()),
            ..Settings::default()
        };
        config.save_settings(&settings).unwrap();

        config.mark_onboarding_complete().unwrap();

        let reloaded = config.load_settings().unwrap();
        assert!(reloaded.onboarding_complete);
        assert_eq!(reloaded.device.as_deref(), Some("emulator-5554"));
        assert!(config.is_onboarding_complete());
    }

    #[test]
    fn test_invalid_channel_in_settings() {
        let settings = Settings {
            channel: "telnet".to_string(),
            ..Settings::default()
        };
        assert!(settings.channel_kind().is_err());
    }
}
