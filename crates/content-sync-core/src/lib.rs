pub mod apply;
pub mod config;
pub mod diff;
pub mod error;
pub mod extension_set;
pub mod logging;
pub mod manifest;
pub mod plan;
pub mod runner;
pub mod sync;

pub use apply::{apply_operations, ContentRunner};
pub use config::Config;
pub use diff::{ChannelDiff, ExtensionDiff};
pub use error::{ContentSyncError, Result};
pub use extension_set::{ExtensionSet, MalformedPolicy};
pub use manifest::{ChannelManifest, ExtensionManifest};
pub use plan::{classify, plan, ContentOperation};
pub use runner::KolibriRunner;
pub use sync::{
    reconcile, sync_and_launch, FsSnapshotStore, LaunchOutcome, SnapshotStore, SyncOutcome,
    SyncSummary,
};
