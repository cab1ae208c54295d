//! Installation journal: record types, file I/O, and the tracker that
//! drives them.

pub mod io;
pub mod tracker;
pub mod types;

pub use tracker::InstallationTracker;
pub use types::{InstallationRecord, InstallationStatus, RollbackOutcome, TrackedPackage};
