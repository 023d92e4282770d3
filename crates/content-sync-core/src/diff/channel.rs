use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::manifest::ChannelManifest;

/// Change of one channel between the cached and the active snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDiff {
    pub channel_id: String,
    /// Content directory the channel is imported from
    pub extension_dir: PathBuf,
    /// Channel did not exist in the cached snapshot
    pub added: bool,
    /// Channel no longer exists in the active snapshot
    pub removed: bool,
    /// Included node ids that were not included before
    pub new_include_node_ids: BTreeSet<String>,
    /// Excluded node ids that were not excluded before
    pub new_exclude_node_ids: BTreeSet<String>,
    /// At least one node became excluded
    pub exclude_nodes_added: bool,
    /// At least one previously included node is no longer included
    pub include_nodes_removed: bool,
    changed: bool,
}

impl ChannelDiff {
    pub fn compare(
        channel_id: impl Into<String>,
        extension_dir: impl Into<PathBuf>,
        old: Option<&ChannelManifest>,
        new: Option<&ChannelManifest>,
    ) -> Self {
        let mut diff = Self {
            channel_id: channel_id.into(),
            extension_dir: extension_dir.into(),
            added: old.is_none() && new.is_some(),
            removed: old.is_some() && new.is_none(),
            new_include_node_ids: BTreeSet::new(),
            new_exclude_node_ids: BTreeSet::new(),
            exclude_nodes_added: false,
            include_nodes_removed: false,
            changed: old != new,
        };

        match (old, new) {
            (None, Some(new)) => {
                diff.new_include_node_ids = new.include_node_ids.clone();
                diff.new_exclude_node_ids = new.exclude_node_ids.clone();
            }
            (Some(old), Some(new)) => {
                diff.new_include_node_ids = difference(&new.include_node_ids, &old.include_node_ids);
                diff.new_exclude_node_ids = difference(&new.exclude_node_ids, &old.exclude_node_ids);
                diff.exclude_nodes_added = !diff.new_exclude_node_ids.is_empty();
                diff.include_nodes_removed =
                    !old.include_node_ids.is_subset(&new.include_node_ids);
            }
            _ => {}
        }

        diff
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }
}

fn difference(left: &BTreeSet<String>, right: &BTreeSet<String>) -> BTreeSet<String> {
    left.difference(right).cloned().collect()
}
