//! Content operation planning
//!
//! Turns snapshot diffs into the ordered list of `kolibri manage` operations
//! that brings Kolibri's content database in line with the active extensions.
//!
//! Kolibri cannot retract previously imported nodes incrementally, so any
//! change that shrinks what a channel provides is handled with a full rescan
//! of that channel. Pure growth is imported directly.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::diff::{self, ChannelDiff};
use crate::extension_set::ExtensionSet;

/// One side-effecting step against Kolibri's content database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOperation {
    /// Import channel metadata from an extension directory
    ImportChannel {
        channel_id: String,
        extension_dir: PathBuf,
    },
    /// Import content nodes from an extension directory
    ImportContent {
        channel_id: String,
        extension_dir: PathBuf,
        include_node_ids: BTreeSet<String>,
        exclude_node_ids: BTreeSet<String>,
    },
    /// Rescan all content available for a channel
    RescanContent { channel_id: String, removed: bool },
}

impl ContentOperation {
    pub fn channel_id(&self) -> &str {
        match self {
            Self::ImportChannel { channel_id, .. }
            | Self::ImportContent { channel_id, .. }
            | Self::RescanContent { channel_id, .. } => channel_id,
        }
    }

    pub fn is_rescan(&self) -> bool {
        matches!(self, Self::RescanContent { .. })
    }
}

impl fmt::Display for ContentOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImportChannel {
                channel_id,
                extension_dir,
            } => write!(
                f,
                "import channel {} from {}",
                channel_id,
                extension_dir.display()
            ),
            Self::ImportContent {
                channel_id,
                extension_dir,
                include_node_ids,
                exclude_node_ids,
            } => write!(
                f,
                "import content {} from {} (+{} nodes, -{} nodes)",
                channel_id,
                extension_dir.display(),
                include_node_ids.len(),
                exclude_node_ids.len()
            ),
            Self::RescanContent {
                channel_id,
                removed: true,
            } => write!(f, "rescan removed channel {}", channel_id),
            Self::RescanContent { channel_id, .. } => write!(f, "rescan channel {}", channel_id),
        }
    }
}

/// Operations needed to apply one channel diff, in execution order
pub fn classify(diff: &ChannelDiff) -> Vec<ContentOperation> {
    let channel_id = diff.channel_id.as_str();

    if diff.added {
        tracing::info!(channel = channel_id, "channel added");
        import_pair(diff)
    } else if diff.removed {
        tracing::info!(channel = channel_id, "channel removed");
        vec![rescan(diff, true)]
    } else if diff.exclude_nodes_added {
        // TODO: pass the previous exclude list to importcontent once Kolibri
        // can drop nodes incrementally, instead of rescanning the channel.
        tracing::info!(channel = channel_id, "channel update (added exclude_nodes)");
        vec![rescan(diff, false)]
    } else if diff.include_nodes_removed {
        tracing::info!(channel = channel_id, "channel update (removed include_nodes)");
        vec![rescan(diff, false)]
    } else {
        tracing::info!(channel = channel_id, "channel update");
        import_pair(diff)
    }
}

fn import_pair(diff: &ChannelDiff) -> Vec<ContentOperation> {
    vec![
        ContentOperation::ImportChannel {
            channel_id: diff.channel_id.clone(),
            extension_dir: diff.extension_dir.clone(),
        },
        ContentOperation::ImportContent {
            channel_id: diff.channel_id.clone(),
            extension_dir: diff.extension_dir.clone(),
            include_node_ids: diff.new_include_node_ids.clone(),
            exclude_node_ids: diff.new_exclude_node_ids.clone(),
        },
    ]
}

fn rescan(diff: &ChannelDiff, removed: bool) -> ContentOperation {
    ContentOperation::RescanContent {
        channel_id: diff.channel_id.clone(),
        removed,
    }
}

/// Full operation plan to move Kolibri from `cached` to `active`.
///
/// Ordered by extension id, then channel order within the extension.
pub fn plan(cached: &ExtensionSet, active: &ExtensionSet) -> Vec<ContentOperation> {
    let mut operations = Vec::new();
    for extension in diff::compare(cached, active) {
        tracing::debug!(
            extension = %extension.extension_id,
            added = extension.added,
            removed = extension.removed,
            "content extension changed"
        );
        for channel in extension.compare_channels() {
            operations.extend(classify(channel));
        }
    }
    operations
}
