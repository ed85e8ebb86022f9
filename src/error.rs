//! Unified error type for codeguard-core.
//!
//! Every fatal variant carries a stable [`ErrorCode`] and a one-sentence
//! remediation hint in its `Display` output, per the error handling design:
//! recoverable failures (missing tool, single phase failure, invalid
//! finding) are logged with their code and swallowed by the caller; only
//! genuinely fatal conditions (unparseable config, corrupt state, version
//! mismatch, atomic write failure) become a `CoreError` that propagates to
//! the outer driver.
//!
//! Error codes:
//! - `E0xx`: persistence (state file I/O, lockfile, atomic rename).
//! - `E1xx`: configuration.
//! - `E2xx`: state integrity (corruption, version mismatch).
//! - `E3xx`: finding validation.
//! - `E4xx`: detector / external tool.

use std::path::PathBuf;

/// Structured, stable error code for logs and programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    pub const IO_READ: ErrorCode = ErrorCode("E001");
    pub const IO_WRITE: ErrorCode = ErrorCode("E002");
    pub const IO_LOCK_HELD: ErrorCode = ErrorCode("E003");
    pub const IO_ATOMIC_RENAME: ErrorCode = ErrorCode("E004");

    pub const CONFIG_PARSE: ErrorCode = ErrorCode("E100");
    pub const CONFIG_INVALID_VALUE: ErrorCode = ErrorCode("E101");

    pub const STATE_CORRUPT: ErrorCode = ErrorCode("E200");
    pub const STATE_VERSION_TOO_OLD: ErrorCode = ErrorCode("E201");
    pub const STATE_VERSION_TOO_NEW: ErrorCode = ErrorCode("E202");

    pub const FINDING_INVALID: ErrorCode = ErrorCode("E300");
    pub const FINDING_UNKNOWN_DETECTOR: ErrorCode = ErrorCode("E301");

    pub const TOOL_MISSING: ErrorCode = ErrorCode("E400");
    pub const PHASE_FAILED: ErrorCode = ErrorCode("E401");
    pub const PHASE_TIMEOUT: ErrorCode = ErrorCode("E402");

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Top-level fatal error. Non-fatal conditions (tool missing, phase
/// failure, invalid finding) are represented as log events plus typed
/// values (`PhaseOutcome`, dropped-finding counters) rather than as
/// `CoreError`; they never unwind the scan.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{code}: failed to read {path}: {source}. Check the file exists and is readable.",
        code = ErrorCode::IO_READ.as_str(), path = .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{code}: failed to write {path}: {source}. Check available disk space and permissions.",
        code = ErrorCode::IO_WRITE.as_str(), path = .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{code}: another scan already holds the lock at {path}. Wait for it to finish or remove the lockfile if it is stale.",
        code = ErrorCode::IO_LOCK_HELD.as_str(), path = .path.display())]
    LockHeld { path: PathBuf },

    #[error("{code}: atomic rename of {temp} to {target} failed: {source}. The previous state file was left untouched; inspect {temp} for diagnosis.",
        code = ErrorCode::IO_ATOMIC_RENAME.as_str(), temp = .temp.display(), target = .target.display())]
    AtomicRenameFailed {
        temp: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{code}: could not parse configuration: {reason}. Fix the TOML syntax and re-run.",
        code = ErrorCode::CONFIG_PARSE.as_str())]
    ConfigParse { reason: String },

    #[error("{code}: invalid configuration value for `{key}`: {reason}.",
        code = ErrorCode::CONFIG_INVALID_VALUE.as_str())]
    ConfigInvalid { key: String, reason: String },

    #[error("{code}: state file at {path} is corrupt: {reason}. A backup may exist at {backup}; the scan was not run and nothing was overwritten.",
        code = ErrorCode::STATE_CORRUPT.as_str(), path = .path.display(), backup = .backup.display())]
    StateCorrupt {
        path: PathBuf,
        backup: PathBuf,
        reason: String,
    },

    #[error("{code}: state schema version {found} predates supported version {minimum}. Run a migration before scanning again.",
        code = ErrorCode::STATE_VERSION_TOO_OLD.as_str())]
    StateVersionTooOld { found: u32, minimum: u32 },

    #[error("{code}: state schema version {found} is newer than this binary supports ({max}). Upgrade codeguard before scanning this repository.",
        code = ErrorCode::STATE_VERSION_TOO_NEW.as_str())]
    StateVersionTooNew { found: u32, max: u32 },
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Reason a finding emitted by a detector phase was dropped instead of
/// entering the merge pipeline. Dropped findings are logged, not fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingRejection {
    UnknownDetector(String),
    MissingField(&'static str),
    MalformedId(String),
}

impl std::fmt::Display for FindingRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingRejection::UnknownDetector(name) => write!(
                f,
                "{}: unknown detector `{}`",
                ErrorCode::FINDING_UNKNOWN_DETECTOR,
                name
            ),
            FindingRejection::MissingField(field) => {
                write!(f, "{}: missing required field `{}`", ErrorCode::FINDING_INVALID, field)
            }
            FindingRejection::MalformedId(id) => {
                write!(f, "{}: malformed id `{}`", ErrorCode::FINDING_INVALID, id)
            }
        }
    }
}
