use crate::session::SessionSettings;
use crate::sut::connection::LivenessPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Shortest liveness check interval. A zero from the config file would
/// otherwise spin the event loop.
const MIN_CHECK_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// `host[:port]` of the emulator's debug server. No host means offline.
    #[serde(default)]
    pub sut_host: Option<String>,
    #[serde(default = "default_true")]
    pub full_memory_update: bool,
    #[serde(default = "default_fast_retry_ms")]
    pub fast_retry_ms: u64,
    #[serde(default = "default_healthy_recheck_ms")]
    pub healthy_recheck_ms: u64,
    #[serde(default = "default_disassembly_window")]
    pub disassembly_window: usize,
}

fn default_true() -> bool {
    true
}

fn default_fast_retry_ms() -> u64 {
    200
}

fn default_healthy_recheck_ms() -> u64 {
    500
}

fn default_disassembly_window() -> usize {
    32
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sut_host: None,
            full_memory_update: true,
            fast_retry_ms: default_fast_retry_ms(),
            healthy_recheck_ms: default_healthy_recheck_ms(),
            disassembly_window: default_disassembly_window(),
        }
    }
}

impl SystemConfig {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "trs-xray").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Reads the saved config. A missing or unreadable file gives defaults.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path()
            && config_path.exists()
            && let Ok(data) = std::fs::read_to_string(&config_path)
        {
            match serde_json::from_str(&data) {
                Ok(config) => return config,
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }
        Self::default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "trs-xray") {
            let config_dir = proj_dirs.config_dir();
            std::fs::create_dir_all(config_dir)?;
            let config_path = config_dir.join("config.json");
            let data = serde_json::to_string_pretty(self)?;
            std::fs::write(&config_path, data)?;
            log::info!("Saved config to {}", config_path.display());
        }
        Ok(())
    }

    pub fn liveness_policy(&self) -> LivenessPolicy {
        LivenessPolicy {
            fast_retry: Duration::from_millis(self.fast_retry_ms.max(MIN_CHECK_MS)),
            healthy_recheck: Duration::from_millis(self.healthy_recheck_ms.max(MIN_CHECK_MS)),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            full_memory_update: self.full_memory_update,
            disassembly_window: self.disassembly_window,
        }
    }
}
