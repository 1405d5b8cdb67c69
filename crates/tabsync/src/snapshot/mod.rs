//! JSON snapshots and their backups.

mod envelope;
mod store;

pub use envelope::{Snapshot, SnapshotMetadata, SNAPSHOT_VERSION};
pub use store::{SnapshotInfo, SnapshotStore, UpdateReport, UNKNOWN};
