//! Range validation for [`super::CoreConfig`]. A configuration error
//! here is fatal and aborts before the scan starts.

use super::CoreConfig;
use crate::error::{CoreError, ErrorCode};

pub fn validate(config: &CoreConfig) -> Result<(), CoreError> {
    if config.target_strict_score > 100 {
        return Err(invalid(
            "target_strict_score",
            format!("must be in [0, 100], got {}", config.target_strict_score),
        ));
    }
    for pattern in config.exclude.iter().chain(config.ignore.iter()) {
        if glob::Pattern::new(pattern).is_err() {
            return Err(invalid("exclude/ignore", format!("invalid glob pattern `{pattern}`")));
        }
    }
    Ok(())
}

fn invalid(key: &str, reason: String) -> CoreError {
    log::warn!("{}: {key}: {reason}", ErrorCode::CONFIG_INVALID_VALUE);
    CoreError::ConfigInvalid { key: key.to_string(), reason }
}
