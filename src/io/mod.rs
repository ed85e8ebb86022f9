//! Persistence: atomic state/plan writes, an advisory scan lockfile, and
//! the query snapshot writer.

pub mod atomic;
pub mod lock;
pub mod query;

pub use atomic::{read_json, write_json_atomically};
pub use lock::ScanLock;
pub use query::write_query_snapshot;
