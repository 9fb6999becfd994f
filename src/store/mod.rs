pub mod store;
pub mod snapshot;

pub use store::{EntryStore, StoreError, StoreHandle, StoreSnapshot};
pub use snapshot::{ManifestEntry, Snapshot, SnapshotConfig, SnapshotError, SnapshotManifest, SnapshotWriter};
