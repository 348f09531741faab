use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Profile whose bills, income and settings are used by default.
    #[serde(default = "default_profile")]
    pub current_profile: String,

    /// Horizon used by `forecast`/`checklist` when `--days` is not given.
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,

    #[serde(default = "default_safe_to_spend_days")]
    pub safe_to_spend_days: u32,

    /// Checking balance the sweep must never dip below.
    #[serde(default)]
    pub debit_floor_target: i64,
}

fn default_profile() -> String {
    "personal".to_string()
}
fn default_forecast_days() -> u32 {
    30
}
fn default_safe_to_spend_days() -> u32 {
    14
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            current_profile: default_profile(),
            forecast_days: default_forecast_days(),
            safe_to_spend_days: default_safe_to_spend_days(),
            debit_floor_target: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

pub fn app_paths(override_home: Option<PathBuf>) -> Result<AppPaths> {
    if let Some(home) = override_home {
        return Ok(AppPaths {
            config_dir: home.join("config"),
            data_dir: home.join("data"),
        });
    }

    let proj = ProjectDirs::from("com", "cashcast", "cashcast")
        .context("Failed to resolve platform directories")?;

    Ok(AppPaths {
        config_dir: proj.config_dir().to_path_buf(),
        data_dir: proj.data_dir().to_path_buf(),
    })
}

pub fn load_or_init_config(paths: &AppPaths) -> Result<(AppConfig, PathBuf)> {
    fs::create_dir_all(&paths.config_dir)
        .with_context(|| format!("Failed to create config dir {}", paths.config_dir.display()))?;

    let cfg_path = paths.config_dir.join("config.json");
    if !cfg_path.exists() {
        let cfg = AppConfig::default();
        write_config(&cfg_path, &cfg)?;
        return Ok((cfg, cfg_path));
    }

    let raw = fs::read_to_string(&cfg_path)
        .with_context(|| format!("Failed to read {}", cfg_path.display()))?;
    let cfg: AppConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", cfg_path.display()))?;

    Ok((cfg, cfg_path))
}

pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(cfg)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn profile_slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' | '-' | '_' => Some(ch),
            'A'..='Z' => Some(ch.to_ascii_lowercase()),
            ' ' | ':' | '/' | '\\' => Some('-'),
            _ => None,
        };
        if let Some(c) = mapped {
            if !(c == '-' && out.ends_with('-')) {
                out.push(c);
            }
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "profile".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_filesystem_safe() {
        assert_eq!(profile_slug("Joint Account"), "joint-account");
        assert_eq!(profile_slug("a//b"), "a-b");
        assert_eq!(profile_slug("***"), "profile");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"current_profile":"biz"}"#).unwrap();
        assert_eq!(cfg.current_profile, "biz");
        assert_eq!(cfg.forecast_days, 30);
        assert_eq!(cfg.safe_to_spend_days, 14);
        assert_eq!(cfg.debit_floor_target, 0);
    }
}
