//! User configuration: a lenient TOML loader, range validation, and
//! named presets.

mod loader;
mod presets;
mod validation;

pub use loader::load_config;
pub use presets::{lenient_preset, strict_preset};

use crate::taxonomy::Zone;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recognized configuration options. Unknown top-level keys are
/// tolerated by the loader, not by this struct: `serde` would otherwise
/// reject them, so the loader pre-filters before deserializing here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub target_strict_score: u8,
    pub review_max_age_days: u32,
    pub holistic_max_age_days: u32,
    pub exclude: Vec<String>,
    pub ignore: Vec<String>,
    pub zone_overrides: HashMap<String, Zone>,
    pub large_files_threshold: u32,
    pub finding_noise_budget: u32,
    pub finding_noise_global_budget: u32,
    #[serde(default)]
    pub languages: HashMap<String, LanguageOverride>,
}

/// Per-language override block under `[languages.<name>]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageOverride {
    pub large_files_threshold: Option<u32>,
    pub complexity_threshold: Option<u32>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            target_strict_score: 95,
            review_max_age_days: 30,
            holistic_max_age_days: 30,
            exclude: Vec::new(),
            ignore: Vec::new(),
            zone_overrides: HashMap::new(),
            large_files_threshold: 0,
            finding_noise_budget: 10,
            finding_noise_global_budget: 0,
            languages: HashMap::new(),
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        validation::validate(self)
    }

    /// `0` means "unlimited"; surfaced as `None` to callers.
    pub fn global_noise_budget(&self) -> Option<u32> {
        if self.finding_noise_global_budget == 0 {
            None
        } else {
            Some(self.finding_noise_global_budget)
        }
    }
}
