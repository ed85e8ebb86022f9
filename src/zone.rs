//! Zone classification (component C2): map every file to exactly one
//! [`Zone`] using an ordered, deterministic rule chain.

use crate::taxonomy::Zone;
use std::collections::HashMap;

/// One of the five literal pattern forms matched against a path, tried in
/// a fixed order per pattern. This is neither glob nor regex.
#[derive(Debug, Clone)]
pub enum ZonePattern {
    /// `"/dir/"`: substring match on the full path.
    DirSubstring(String),
    /// `".ext"`: suffix match on the filename.
    ExtensionSuffix(String),
    /// `"prefix_"`: prefix match on the basename.
    BasenamePrefix(String),
    /// `"_suffix"`: basename ends-with, checked before the extension.
    BasenameSuffix(String),
    /// `"name.ext"`: exact basename match.
    ExactBasename(String),
}

impl ZonePattern {
    /// Parse a pattern string into its matching form, per the five literal
    /// shapes in , trying them in the documented order.
    pub fn parse(raw: &str) -> ZonePattern {
        if raw.starts_with('/') && raw.ends_with('/') {
            ZonePattern::DirSubstring(raw.to_string())
        } else if raw.starts_with('.') && !raw[1..].contains('.') {
            ZonePattern::ExtensionSuffix(raw.to_string())
        } else if raw.ends_with('_') {
            ZonePattern::BasenamePrefix(raw.to_string())
        } else if raw.starts_with('_') {
            ZonePattern::BasenameSuffix(raw.to_string())
        } else {
            ZonePattern::ExactBasename(raw.to_string())
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let basename = basename_of(path);
        match self {
            ZonePattern::DirSubstring(pat) => path.contains(pat.as_str()),
            ZonePattern::ExtensionSuffix(ext) => basename.ends_with(ext.as_str()),
            ZonePattern::BasenamePrefix(prefix) => basename.starts_with(prefix.as_str()),
            ZonePattern::BasenameSuffix(suffix) => {
                let stem = basename.rsplit_once('.').map(|(s, _)| s).unwrap_or(basename);
                stem.ends_with(suffix.as_str())
            }
            ZonePattern::ExactBasename(name) => basename == name.as_str(),
        }
    }
}

fn basename_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A named rule: pattern plus the zone it maps to.
#[derive(Debug, Clone)]
pub struct ZoneRule {
    pub pattern: ZonePattern,
    pub zone: Zone,
}

impl ZoneRule {
    pub fn new(raw_pattern: &str, zone: Zone) -> Self {
        Self { pattern: ZonePattern::parse(raw_pattern), zone }
    }
}

/// Default, hardcoded rule set applied when neither user overrides nor
/// language-plugin rules match.
pub fn default_rules() -> Vec<ZoneRule> {
    vec![
        ZoneRule::new("/vendor/", Zone::Vendor),
        ZoneRule::new("/node_modules/", Zone::Vendor),
        ZoneRule::new("/third_party/", Zone::Vendor),
        ZoneRule::new("/generated/", Zone::Generated),
        ZoneRule::new("_pb2", Zone::Generated),
        ZoneRule::new("/tests/", Zone::Test),
        ZoneRule::new("/test/", Zone::Test),
        ZoneRule::new("_test", Zone::Test),
        ZoneRule::new("test_", Zone::Test),
        ZoneRule::new("/scripts/", Zone::Script),
        ZoneRule::new("/bin/", Zone::Script),
        ZoneRule::new(".toml", Zone::Config),
        ZoneRule::new(".yaml", Zone::Config),
        ZoneRule::new(".yml", Zone::Config),
        ZoneRule::new(".json", Zone::Config),
    ]
}

/// Classifier combining, in resolution order: user overrides, a
/// language plugin's rules, the hardcoded defaults, and a Production
/// fallback. Deterministic and total for any input path.
#[derive(Debug, Clone)]
pub struct ZoneClassifier {
    user_overrides: HashMap<String, Zone>,
    user_pattern_rules: Vec<ZoneRule>,
    plugin_rules: Vec<ZoneRule>,
    default_rules: Vec<ZoneRule>,
}

impl ZoneClassifier {
    pub fn new(
        exact_overrides: HashMap<String, Zone>,
        pattern_overrides: Vec<ZoneRule>,
        plugin_rules: Vec<ZoneRule>,
    ) -> Self {
        Self {
            user_overrides: exact_overrides,
            user_pattern_rules: pattern_overrides,
            plugin_rules,
            default_rules: default_rules(),
        }
    }

    pub fn classify(&self, path: &str) -> Zone {
        if let Some(zone) = self.user_overrides.get(path) {
            return *zone;
        }
        for rule in &self.user_pattern_rules {
            if rule.pattern.matches(path) {
                return rule.zone;
            }
        }
        for rule in &self.plugin_rules {
            if rule.pattern.matches(path) {
                return rule.zone;
            }
        }
        for rule in &self.default_rules {
            if rule.pattern.matches(path) {
                return rule.zone;
            }
        }
        Zone::Production
    }
}

impl Default for ZoneClassifier {
    fn default() -> Self {
        Self::new(HashMap::new(), Vec::new(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_production() {
        let c = ZoneClassifier::default();
        assert_eq!(c.classify("src/lib.rs"), Zone::Production);
    }

    #[test]
    fn dir_substring_matches_vendor() {
        let c = ZoneClassifier::default();
        assert_eq!(c.classify("vendor/foo/bar.rs"), Zone::Vendor);
    }

    #[test]
    fn extension_suffix_matches_config() {
        let c = ZoneClassifier::default();
        assert_eq!(c.classify("config/app.toml"), Zone::Config);
    }

    #[test]
    fn basename_prefix_matches_test() {
        let c = ZoneClassifier::default();
        assert_eq!(c.classify("src/test_helpers.py"), Zone::Test);
    }

    #[test]
    fn basename_suffix_matches_before_extension() {
        let c = ZoneClassifier::default();
        assert_eq!(c.classify("src/foo_test.py"), Zone::Test);
    }

    #[test]
    fn exact_basename_match() {
        let rule = ZoneRule::new("Makefile", Zone::Script);
        let c = ZoneClassifier::new(HashMap::new(), vec![rule], Vec::new());
        assert_eq!(c.classify("tools/Makefile"), Zone::Script);
    }

    #[test]
    fn exact_override_wins_over_everything() {
        let mut overrides = HashMap::new();
        overrides.insert("vendor/special.rs".to_string(), Zone::Production);
        let c = ZoneClassifier::new(overrides, Vec::new(), Vec::new());
        assert_eq!(c.classify("vendor/special.rs"), Zone::Production);
    }

    #[test]
    fn is_deterministic_and_total() {
        let c = ZoneClassifier::default();
        for path in ["", "a", "a/b/c.rs", "a.b.c.d"] {
            let z1 = c.classify(path);
            let z2 = c.classify(path);
            assert_eq!(z1, z2);
        }
    }
}
