//! Named configuration presets bundling common threshold overrides for
//! a few typical adoption stages.

use super::CoreConfig;

/// Raises the strict-score target and tightens noise budgets; suited to
/// a codebase that wants the integrity guard's anchoring check to bite
/// sooner.
pub fn strict_preset() -> CoreConfig {
    CoreConfig {
        target_strict_score: 98,
        finding_noise_budget: 5,
        ..CoreConfig::default()
    }
}

/// Loosens noise budgets for a codebase doing an initial cleanup pass,
/// where a flood of first-scan findings is expected and should not be
/// silently suppressed.
pub fn lenient_preset() -> CoreConfig {
    CoreConfig {
        target_strict_score: 85,
        finding_noise_budget: 50,
        finding_noise_global_budget: 500,
        ..CoreConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        assert!(strict_preset().validate().is_ok());
        assert!(lenient_preset().validate().is_ok());
    }
}
