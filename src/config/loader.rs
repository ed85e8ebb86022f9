//! Lenient TOML config loader: unknown keys are ignored with a warning
//! rather than rejected, so the config survives forward schema drift.

use super::CoreConfig;
use crate::error::{CoreError, ErrorCode};
use std::path::Path;

const KNOWN_KEYS: &[&str] = &[
    "target_strict_score",
    "review_max_age_days",
    "holistic_max_age_days",
    "exclude",
    "ignore",
    "zone_overrides",
    "large_files_threshold",
    "finding_noise_budget",
    "finding_noise_global_budget",
    "languages",
];

/// Load `<repo>/.codeguard/config.toml` if present, otherwise return
/// defaults. Unknown top-level keys are dropped with a `log::warn!`
/// rather than causing a parse failure.
pub fn load_config(repo_root: &Path) -> Result<CoreConfig, CoreError> {
    let path = repo_root.join(".codeguard").join("config.toml");
    if !path.exists() {
        return Ok(CoreConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| CoreError::ReadFailed {
        path: path.clone(),
        source,
    })?;
    parse_lenient(&contents)
}

pub fn parse_lenient(contents: &str) -> Result<CoreConfig, CoreError> {
    let mut value: toml::Value = toml::from_str(contents).map_err(|e| {
        log::warn!("{}: unparseable config: {e}", ErrorCode::CONFIG_PARSE);
        CoreError::ConfigParse { reason: e.to_string() }
    })?;

    if let Some(table) = value.as_table_mut() {
        let unknown: Vec<String> = table
            .keys()
            .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
            .cloned()
            .collect();
        for key in unknown {
            log::warn!("ignoring unknown config key `{key}` (forward schema drift)");
            table.remove(&key);
        }
    }

    let config: CoreConfig = value.try_into().map_err(|e: toml::de::Error| {
        log::warn!("{}: unparseable config: {e}", ErrorCode::CONFIG_PARSE);
        CoreError::ConfigParse { reason: e.to_string() }
    })?;
    config.validate()?;
    Ok(config)
}
