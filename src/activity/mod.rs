//! Activity tracking for the Ghostwatch agent.
//!
//! Records what the pipeline has seen and done so operators can audit a
//! session after the fact.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, read_persisted, ActivityEntry,
    ActivityLog, ActivityStats, AlertCounts, PersistedActivity, SharedActivityLog,
};
