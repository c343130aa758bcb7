use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Which device platform backs the registry and session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlatformKind {
    /// V4L2 devices under /sys/class/video4linux.
    Sysfs,
    /// A single simulated Wi-Fi camera.
    Simulated,
}

impl PlatformKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sysfs" | "v4l2" => Ok(PlatformKind::Sysfs),
            "simulated" | "wifi" => Ok(PlatformKind::Simulated),
            other => Err(anyhow!("unknown device platform '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub platform: PlatformKind,
    pub connect_delay_ms: u64,
    pub analysis_delay_ms: u64,
    pub session_file: String,
    pub log_database: String,
    /// Images handed out by the stub capture policy when no live stream exists.
    pub stub_images: Vec<String>,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: PlatformKind::Simulated,
            connect_delay_ms: 2000,
            analysis_delay_ms: 2000,
            session_file: "session.json".into(),
            log_database: "analysis_logs.sqlite3".into(),
            stub_images: vec![
                "/placeholder.svg".into(),
                "https://images.unsplash.com/photo-1575936123452-b67c3203c357".into(),
                "https://images.unsplash.com/photo-1517841905240-472988babdf9".into(),
            ],
            data_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Loads `config.json` from the data directory (when present) and applies
    /// `AUTHENTICATOR_*` environment overrides.
    pub fn load(default_data_dir: PathBuf) -> Result<Self> {
        let data_dir = std::env::var("AUTHENTICATOR_DATA_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(default_data_dir);

        let mut cfg = Self::from_dir(&data_dir)?;
        cfg.apply_env_from(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_dir(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed {}: {err}", path.display());
                AppConfig::default()
            })
        } else {
            AppConfig::default()
        };
        cfg.data_dir = data_dir.to_path_buf();
        Ok(cfg)
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(platform) = lookup("AUTHENTICATOR_PLATFORM") {
            if !platform.trim().is_empty() {
                self.platform = PlatformKind::parse(&platform)?;
            }
        }
        if let Some(delay) = lookup("AUTHENTICATOR_CONNECT_DELAY_MS") {
            self.connect_delay_ms = delay.trim().parse().map_err(|_| {
                anyhow!("AUTHENTICATOR_CONNECT_DELAY_MS must be an integer number of milliseconds")
            })?;
        }
        if let Some(delay) = lookup("AUTHENTICATOR_ANALYSIS_DELAY_MS") {
            self.analysis_delay_ms = delay.trim().parse().map_err(|_| {
                anyhow!("AUTHENTICATOR_ANALYSIS_DELAY_MS must be an integer number of milliseconds")
            })?;
        }

        let debug_mode = lookup("AUTHENTICATOR_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.connect_delay_ms = 0;
            self.analysis_delay_ms = 0;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.session_file.trim().is_empty() {
            return Err(anyhow!("sessionFile must not be empty"));
        }
        if self.log_database.trim().is_empty() {
            return Err(anyhow!("logDatabase must not be empty"));
        }
        Ok(())
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(&self.session_file)
    }

    pub fn log_database_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_database)
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn analysis_delay(&self) -> Duration {
        Duration::from_millis(self.analysis_delay_ms)
    }
}
