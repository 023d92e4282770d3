use std::ffi::OsString;
use std::path::PathBuf;

use crate::apply::{apply_operations, ContentRunner};
use crate::config::Config;
use crate::error::Result;
use crate::extension_set::{ExtensionSet, MalformedPolicy};
use crate::plan::plan;

/// Source of both snapshots and sink for the next baseline
pub trait SnapshotStore {
    /// Previous run's snapshot; never fails, an unusable cache is empty
    fn load_cached(&self) -> ExtensionSet;

    /// Extensions installed right now
    fn load_active(&self) -> Result<ExtensionSet>;

    /// Persist `set` as the next run's baseline
    fn save(&mut self, set: &ExtensionSet) -> Result<()>;
}

/// Snapshot store backed by the cache file and the extensions directory
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    cache_file: PathBuf,
    extensions_dir: PathBuf,
    policy: MalformedPolicy,
}

impl FsSnapshotStore {
    pub fn new(cache_file: PathBuf, extensions_dir: PathBuf, policy: MalformedPolicy) -> Self {
        Self {
            cache_file,
            extensions_dir,
            policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.cache_path(),
            config.extensions.dir.clone(),
            config.extensions.on_malformed,
        )
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn load_cached(&self) -> ExtensionSet {
        ExtensionSet::load_cached(&self.cache_file)
    }

    fn load_active(&self) -> Result<ExtensionSet> {
        ExtensionSet::load_active(&self.extensions_dir, self.policy)
    }

    fn save(&mut self, set: &ExtensionSet) -> Result<()> {
        set.save(&self.cache_file)
    }
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub operations: usize,
}

/// Bring Kolibri's content database from `cached` to `active`.
///
/// The plan runs through `runner` in order. `active` is saved to `store` only
/// when every operation succeeded; on failure the cache keeps the old
/// baseline so the next run retries the same diff.
pub fn reconcile<S, R>(
    cached: &ExtensionSet,
    active: &ExtensionSet,
    runner: &mut R,
    store: &mut S,
) -> Result<SyncSummary>
where
    S: SnapshotStore + ?Sized,
    R: ContentRunner + ?Sized,
{
    let operations = plan(cached, active);
    if operations.is_empty() {
        tracing::info!("content extensions are up to date");
    } else {
        tracing::info!(count = operations.len(), "applying content operations");
    }

    let applied = apply_operations(&operations, runner)?;
    store.save(active)?;

    Ok(SyncSummary {
        operations: applied,
    })
}

/// How the content sync part of a wrapper run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced(SyncSummary),
    /// Installed extensions could not be discovered; nothing was applied
    DiscoveryFailed,
    /// An operation or the cache write failed; the cache keeps the old baseline
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub sync: SyncOutcome,
    /// Exit code of the final Kolibri invocation
    pub exit_code: i32,
}

/// Sync content extensions, then run Kolibri with `args` unchanged.
///
/// `make_runner` receives the snapshot whose content directories Kolibri
/// should see: the active one, or the cached one when discovery failed.
/// Sync failures are logged and never prevent the launch; only a failure to
/// start Kolibri itself is returned as an error.
pub fn sync_and_launch<S, R, F>(
    store: &mut S,
    make_runner: F,
    args: &[OsString],
) -> Result<LaunchOutcome>
where
    S: SnapshotStore + ?Sized,
    R: ContentRunner,
    F: FnOnce(&ExtensionSet) -> R,
{
    let cached = store.load_cached();

    let (mut runner, sync) = match store.load_active() {
        Ok(active) => {
            let mut runner = make_runner(&active);
            let sync = match reconcile(&cached, &active, &mut runner, store) {
                Ok(summary) => {
                    tracing::info!(operations = summary.operations, "content extensions synced");
                    SyncOutcome::Synced(summary)
                }
                Err(e) => {
                    tracing::error!(error = %e, "content sync failed, will retry on next start");
                    SyncOutcome::Failed
                }
            };
            (runner, sync)
        }
        Err(e) => {
            tracing::error!(error = %e, "content extension discovery failed, skipping sync");
            (make_runner(&cached), SyncOutcome::DiscoveryFailed)
        }
    };

    let exit_code = runner.run(args)?;
    tracing::debug!(exit_code, "kolibri exited");
    Ok(LaunchOutcome { sync, exit_code })
}
