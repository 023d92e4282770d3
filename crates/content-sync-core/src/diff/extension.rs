use std::collections::BTreeSet;
use std::path::PathBuf;

use super::channel::ChannelDiff;
use crate::extension_set::ExtensionSet;
use crate::manifest::ExtensionManifest;

/// Channel-level changes of one extension between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDiff {
    pub extension_id: String,
    pub extension_dir: PathBuf,
    pub added: bool,
    pub removed: bool,
    channels: Vec<ChannelDiff>,
}

impl ExtensionDiff {
    /// Compare the cached and active manifests of one extension.
    ///
    /// Returns `None` when neither snapshot knows the extension.
    pub fn compare(
        old: Option<&ExtensionManifest>,
        new: Option<&ExtensionManifest>,
    ) -> Option<Self> {
        let current = new.or(old)?;
        let extension_dir = current.content_dir.clone();

        let mut channels = Vec::new();
        let mut visited = BTreeSet::new();

        if let Some(new) = new {
            for channel in &new.channels {
                visited.insert(channel.channel_id.as_str());
                let previous = old.and_then(|o| o.channel(&channel.channel_id));
                channels.push(ChannelDiff::compare(
                    &channel.channel_id,
                    &extension_dir,
                    previous,
                    Some(channel),
                ));
            }
        }
        if let Some(old) = old {
            for channel in &old.channels {
                if visited.contains(channel.channel_id.as_str()) {
                    continue;
                }
                channels.push(ChannelDiff::compare(
                    &channel.channel_id,
                    &extension_dir,
                    Some(channel),
                    None,
                ));
            }
        }

        channels.retain(ChannelDiff::is_changed);

        Some(Self {
            extension_id: current.extension_id.clone(),
            extension_dir,
            added: old.is_none(),
            removed: new.is_none(),
            channels,
        })
    }

    /// Changed channels, new manifest order first, then channels that only
    /// exist in the cached manifest.
    pub fn compare_channels(&self) -> impl Iterator<Item = &ChannelDiff> {
        self.channels.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Compare two snapshots extension by extension, in ascending extension id order.
///
/// Extensions without any changed channel are left out.
pub fn compare(cached: &ExtensionSet, active: &ExtensionSet) -> Vec<ExtensionDiff> {
    let ids: BTreeSet<&str> = cached.ids().chain(active.ids()).collect();

    ids.into_iter()
        .filter_map(|id| {
            let old = cached.get(id);
            let new = active.get(id);
            if old == new {
                return None;
            }
            ExtensionDiff::compare(old, new)
        })
        .filter(|diff| !diff.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ChannelManifest;

    fn extension(id: &str, channels: Vec<ChannelManifest>) -> ExtensionManifest {
        ExtensionManifest::new(id, format!("/ext/{}", id), channels)
    }

    fn channel_ids(diff: &ExtensionDiff) -> Vec<&str> {
        diff.compare_channels()
            .map(|c| c.channel_id.as_str())
            .collect()
    }

    #[test]
    fn added_extension_adds_every_channel() {
        let new = extension(
            "e",
            vec![ChannelManifest::new("c1"), ChannelManifest::new("c2")],
        );
        let diff = ExtensionDiff::compare(None, Some(&new)).unwrap();

        assert!(diff.added);
        assert_eq!(channel_ids(&diff), vec!["c1", "c2"]);
        assert!(diff.compare_channels().all(|c| c.added));
    }

    #[test]
    fn removed_extension_removes_every_channel() {
        let old = extension("e", vec![ChannelManifest::new("c1")]);
        let diff = ExtensionDiff::compare(Some(&old), None).unwrap();

        assert!(diff.removed);
        assert_eq!(diff.extension_dir, PathBuf::from("/ext/e"));
        assert!(diff.compare_channels().all(|c| c.removed));
    }

    #[test]
    fn channel_order_is_new_then_old_only() {
        let old = extension(
            "e",
            vec![
                ChannelManifest::new("gone"),
                ChannelManifest::new("kept").with_include(["a"]),
            ],
        );
        let new = extension(
            "e",
            vec![
                ChannelManifest::new("fresh"),
                ChannelManifest::new("kept").with_include(["a", "b"]),
            ],
        );
        let diff = ExtensionDiff::compare(Some(&old), Some(&new)).unwrap();

        assert_eq!(channel_ids(&diff), vec!["fresh", "kept", "gone"]);
    }

    #[test]
    fn unchanged_channels_are_skipped() {
        let old = extension(
            "e",
            vec![ChannelManifest::new("same"), ChannelManifest::new("grow")],
        );
        let new = extension(
            "e",
            vec![
                ChannelManifest::new("same"),
                ChannelManifest::new("grow").with_exclude(["x"]),
            ],
        );
        let diff = ExtensionDiff::compare(Some(&old), Some(&new)).unwrap();

        assert_eq!(channel_ids(&diff), vec!["grow"]);
    }

    #[test]
    fn neither_side_present() {
        assert!(ExtensionDiff::compare(None, None).is_none());
    }

    #[test]
    fn set_compare_skips_equal_extensions() {
        let cached = ExtensionSet::from_manifests([
            extension("b", vec![ChannelManifest::new("b1")]),
            extension("c", vec![ChannelManifest::new("c1")]),
        ]);
        let active = ExtensionSet::from_manifests([
            extension("a", vec![ChannelManifest::new("a1")]),
            extension("b", vec![ChannelManifest::new("b1")]),
        ]);

        let diffs = compare(&cached, &active);
        let ids: Vec<_> = diffs.iter().map(|d| d.extension_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(compare(&active, &active).is_empty());
    }

    #[test]
    fn moved_content_dir_alone_is_not_a_change() {
        let cached = ExtensionSet::from_manifests([extension("e", vec![ChannelManifest::new("c")])]);
        let active = ExtensionSet::from_manifests([ExtensionManifest::new(
            "e",
            "/elsewhere",
            vec![ChannelManifest::new("c")],
        )]);

        assert!(compare(&cached, &active).is_empty());
    }
}
