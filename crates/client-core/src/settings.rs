use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persisted client settings (`$XDG_CONFIG_HOME/vidnotes/config.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub backend_url: Option<String>,
    /// Bearer credential attached to backend requests.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

impl ClientSettings {
    fn normalize(&mut self) {
        self.backend_url = self.backend_url.as_ref().map(|s| s.trim().to_string());
        if matches!(self.backend_url.as_deref(), Some(s) if s.is_empty()) {
            self.backend_url = None;
        }

        self.token = self.token.as_ref().map(|s| s.trim().to_string());
        if matches!(self.token.as_deref(), Some(s) if s.is_empty()) {
            self.token = None;
        }

        if self.poll_interval_ms == Some(0) {
            self.poll_interval_ms = None;
        }
    }
}

fn xdg_config_home() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        let dir = PathBuf::from(dir);
        if dir.as_os_str().is_empty() {
            anyhow::bail!("XDG_CONFIG_HOME is set but empty");
        }
        return Ok(dir);
    }

    let home = std::env::var_os("HOME").ok_or_else(|| anyhow::anyhow!("HOME is not set"))?;
    let home = PathBuf::from(home);
    if home.as_os_str().is_empty() {
        anyhow::bail!("HOME is set but empty");
    }
    Ok(home.join(".config"))
}

pub fn settings_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_home()?.join("vidnotes").join("config.json"))
}

pub fn load_settings() -> anyhow::Result<Option<ClientSettings>> {
    load_settings_from(&settings_path()?)
}

pub fn save_settings(settings: &ClientSettings) -> anyhow::Result<()> {
    save_settings_to(&settings_path()?, settings)
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<Option<ClientSettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let mut settings: ClientSettings = serde_json::from_str(&raw)?;
    settings.normalize();
    Ok(Some(settings))
}

pub fn save_settings_to(path: &Path, settings: &ClientSettings) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid config path: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let mut settings = settings.clone();
    settings.normalize();

    let json = serde_json::to_string_pretty(&settings)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(tmp, path)?;
    Ok(())
}
