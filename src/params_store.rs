use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::model::ModelParams;

const CACHE_DIR: &str = "formcast";
const PARAMS_FILE: &str = "model_params.json";
const CANDIDATE_FILE: &str = "model_candidate.json";

pub fn app_cache_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    // Fallback to ~/.cache on linux-like systems.
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_params_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(PARAMS_FILE))
}

pub fn default_candidate_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CANDIDATE_FILE))
}

pub fn load_params(path: &Path) -> Result<ModelParams> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read model params {}", path.display()))?;
    serde_json::from_str::<ModelParams>(&raw)
        .with_context(|| format!("invalid model params json {}", path.display()))
}

pub fn save_params(path: &Path, params: &ModelParams) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(params).context("serialize model params")?;
    fs::write(&tmp, json).context("write model params")?;
    fs::rename(&tmp, path).context("swap model params")?;
    Ok(())
}

/// Candidate params exist between fit and a passed validation gate; anything
/// downstream of validation must refuse to run from a candidate alone.
pub fn require_params(path: &Path) -> Result<ModelParams> {
    if !path.exists() {
        return Err(anyhow!(
            "no validated model params at {} (run fit, then backtest --apply)",
            path.display()
        ));
    }
    load_params(path)
}
