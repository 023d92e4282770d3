use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{ContentSyncError, Result};
use crate::manifest::{ExtensionManifest, CONTENT_MANIFEST_FILE};

/// Bumped whenever the cache layout changes; older caches are discarded
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Separator used in `KOLIBRI_CONTENT_FALLBACK_DIRS`
pub const FALLBACK_DIRS_SEPARATOR: &str = ";";

/// What to do when an installed extension carries a malformed manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedPolicy {
    /// Fail the whole discovery
    #[default]
    Abort,
    /// Log the extension and leave it out of the set
    Skip,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    extensions: Vec<ExtensionManifest>,
}

/// Snapshot of all known content extensions, ordered by extension id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: BTreeMap<String, ExtensionManifest>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifests(manifests: impl IntoIterator<Item = ExtensionManifest>) -> Self {
        let mut set = Self::new();
        for manifest in manifests {
            set.insert(manifest);
        }
        set
    }

    /// Insert a manifest, returning the one it replaced
    pub fn insert(&mut self, manifest: ExtensionManifest) -> Option<ExtensionManifest> {
        self.extensions
            .insert(manifest.extension_id.clone(), manifest)
    }

    pub fn get(&self, extension_id: &str) -> Option<&ExtensionManifest> {
        self.extensions.get(extension_id)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtensionManifest> {
        self.extensions.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }

    /// Load the previous run's snapshot.
    ///
    /// A missing, unreadable or corrupt cache yields an empty set, so the
    /// next plan imports every active extension from scratch.
    pub fn load_cached(path: &Path) -> Self {
        match Self::try_load_cached(path) {
            Ok(Some(set)) => set,
            Ok(None) => {
                tracing::info!(path = %path.display(), "no content extension cache");
                Self::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unusable cache");
                Self::new()
            }
        }
    }

    pub fn try_load_cached(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let cache: CacheFile = toml::from_str(&content)?;
        if cache.version != CACHE_FORMAT_VERSION {
            return Err(ContentSyncError::CacheFormat {
                path: path.to_path_buf(),
                message: format!(
                    "version {} (expected {})",
                    cache.version, CACHE_FORMAT_VERSION
                ),
            });
        }

        let mut set = Self::new();
        for manifest in cache.extensions {
            manifest.validate()?;
            if let Some(previous) = set.insert(manifest) {
                return Err(ContentSyncError::CacheFormat {
                    path: path.to_path_buf(),
                    message: format!("duplicate extension '{}'", previous.extension_id),
                });
            }
        }
        Ok(Some(set))
    }

    /// Discover extensions installed under `extensions_dir`.
    ///
    /// Every immediate subdirectory holding a `content.json` is one extension,
    /// named after the directory.
    pub fn load_active(extensions_dir: &Path, policy: MalformedPolicy) -> Result<Self> {
        let mut set = Self::new();
        if !extensions_dir.is_dir() {
            tracing::info!(dir = %extensions_dir.display(), "no content extensions directory");
            return Ok(set);
        }

        for entry in WalkDir::new(extensions_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if policy == MalformedPolicy::Skip => {
                    tracing::warn!(error = %e, "skipping unreadable extension entry");
                    continue;
                }
                Err(e) => return Err(io::Error::from(e).into()),
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let dir = entry.path();
            if !dir.join(CONTENT_MANIFEST_FILE).is_file() {
                tracing::debug!(dir = %dir.display(), "skipping directory without content manifest");
                continue;
            }

            let extension_id = entry.file_name().to_string_lossy().to_string();
            match ExtensionManifest::from_dir(&extension_id, dir) {
                Ok(manifest) => {
                    tracing::debug!(
                        extension = %extension_id,
                        channels = manifest.channels.len(),
                        "found content extension"
                    );
                    set.insert(manifest);
                }
                Err(e) if policy == MalformedPolicy::Skip => {
                    tracing::warn!(extension = %extension_id, error = %e, "skipping malformed extension");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(set)
    }

    /// Persist this snapshot as the next run's baseline.
    ///
    /// The file is written next to `path` and renamed into place, so readers
    /// never observe a partial cache.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let cache = CacheFile {
            version: CACHE_FORMAT_VERSION,
            saved_at: Utc::now(),
            extensions: self.extensions.values().cloned().collect(),
        };
        let content = toml::to_string_pretty(&cache)?;

        let tmp_path = temp_path_for(path);
        fs::write(&tmp_path, content)?;
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), extensions = self.len(), "saved content extension cache");
        Ok(())
    }

    /// Content directories of all extensions, joined for `KOLIBRI_CONTENT_FALLBACK_DIRS`
    pub fn fallback_dirs(&self) -> String {
        self.iter()
            .map(|e| e.content_dir.to_string_lossy())
            .collect::<Vec<_>>()
            .join(FALLBACK_DIRS_SEPARATOR)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ChannelManifest;
    use tempfile::TempDir;

    fn write_extension(root: &Path, name: &str, json: &str) -> Result<PathBuf> {
        let dir = root.join(name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(CONTENT_MANIFEST_FILE), json)?;
        Ok(dir)
    }

    fn sample_set() -> ExtensionSet {
        ExtensionSet::from_manifests([
            ExtensionManifest::new(
                "org.example.Content.b",
                "/ext/b",
                vec![ChannelManifest::new("c2").with_exclude(["x"])],
            ),
            ExtensionManifest::new(
                "org.example.Content.a",
                "/ext/a",
                vec![
                    ChannelManifest::new("c1").with_include(["n1", "n2"]),
                    ChannelManifest::new("c0"),
                ],
            ),
        ])
    }

    #[test]
    fn cache_round_trip() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("nested").join("cache.toml");
        let set = sample_set();

        set.save(&path)?;
        let loaded = ExtensionSet::try_load_cached(&path)?;

        assert_eq!(loaded, Some(set));
        assert!(!temp_path_for(&path).exists());
        Ok(())
    }

    #[test]
    fn missing_cache_is_empty() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("cache.toml");

        assert_eq!(ExtensionSet::try_load_cached(&path)?, None);
        assert!(ExtensionSet::load_cached(&path).is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_cache_is_empty() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("cache.toml");
        fs::write(&path, "this is [not toml")?;

        assert!(ExtensionSet::try_load_cached(&path).is_err());
        assert!(ExtensionSet::load_cached(&path).is_empty());
        Ok(())
    }

    #[test]
    fn unknown_cache_version_is_rejected() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("cache.toml");
        fs::write(&path, "version = 99\nsaved_at = \"2024-01-01T00:00:00Z\"\n")?;

        let err = ExtensionSet::try_load_cached(&path).unwrap_err();
        assert!(matches!(err, ContentSyncError::CacheFormat { .. }));
        Ok(())
    }

    #[test]
    fn load_active_discovers_sorted_extensions() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        write_extension(root, "zeta", r#"{"channels": [{"channel_id": "z1"}]}"#)?;
        let alpha = write_extension(
            root,
            "alpha",
            r#"{"channels": [{"channel_id": "a1", "node_ids": ["n"]}]}"#,
        )?;
        fs::create_dir_all(root.join("no-manifest"))?;
        fs::write(root.join("stray.txt"), "ignored")?;

        let set = ExtensionSet::load_active(root, MalformedPolicy::Abort)?;

        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
        let manifest = set.get("alpha").unwrap();
        assert_eq!(manifest.content_dir, alpha);
        assert!(manifest.channel("a1").unwrap().include_node_ids.contains("n"));
        Ok(())
    }

    #[test]
    fn load_active_missing_root_is_empty() -> Result<()> {
        let temp = TempDir::new()?;
        let set = ExtensionSet::load_active(&temp.path().join("absent"), MalformedPolicy::Abort)?;
        assert!(set.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_extension_policy() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        write_extension(root, "good", r#"{"channels": [{"channel_id": "g"}]}"#)?;
        write_extension(root, "broken", "{")?;

        assert!(ExtensionSet::load_active(root, MalformedPolicy::Abort).is_err());

        let set = ExtensionSet::load_active(root, MalformedPolicy::Skip)?;
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["good"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        write_extension(root, "good", r#"{"channels": [{"channel_id": "g"}]}"#)?;
        std::os::unix::fs::symlink(root.join("missing"), root.join("dangling"))?;

        assert!(ExtensionSet::load_active(root, MalformedPolicy::Abort).is_err());

        let set = ExtensionSet::load_active(root, MalformedPolicy::Skip)?;
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["good"]);
        Ok(())
    }

    #[test]
    fn fallback_dirs_follow_extension_order() {
        assert_eq!(sample_set().fallback_dirs(), "/ext/a;/ext/b");
        assert_eq!(ExtensionSet::new().fallback_dirs(), "");
    }
}
