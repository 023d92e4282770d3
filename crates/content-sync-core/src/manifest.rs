use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContentSyncError, Result};

/// Metadata file each content extension ships in its root directory
pub const CONTENT_MANIFEST_FILE: &str = "content.json";

/// Node selection for one channel provided by an extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelManifest {
    pub channel_id: String,
    /// Explicitly included nodes (empty means the whole channel)
    #[serde(rename = "node_ids", default)]
    pub include_node_ids: BTreeSet<String>,
    /// Explicitly excluded nodes (empty means none)
    #[serde(default)]
    pub exclude_node_ids: BTreeSet<String>,
}

impl ChannelManifest {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            include_node_ids: BTreeSet::new(),
            exclude_node_ids: BTreeSet::new(),
        }
    }

    pub fn with_include<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_node_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_exclude<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_node_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Node ids listed as both included and excluded
    pub fn overlapping_node_ids(&self) -> Vec<&str> {
        self.include_node_ids
            .intersection(&self.exclude_node_ids)
            .map(String::as_str)
            .collect()
    }
}

/// Static metadata of one installed content extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub extension_id: String,
    pub content_dir: PathBuf,
    /// Channels in the order the extension lists them
    #[serde(default)]
    pub channels: Vec<ChannelManifest>,
}

#[derive(Debug, Deserialize)]
struct ContentJson {
    #[serde(default)]
    channels: Vec<ChannelManifest>,
}

impl ExtensionManifest {
    pub fn new(
        extension_id: impl Into<String>,
        content_dir: impl Into<PathBuf>,
        channels: Vec<ChannelManifest>,
    ) -> Self {
        Self {
            extension_id: extension_id.into(),
            content_dir: content_dir.into(),
            channels,
        }
    }

    /// Load the manifest of the extension rooted at `dir`
    pub fn from_dir(extension_id: &str, dir: &Path) -> Result<Self> {
        let path = dir.join(CONTENT_MANIFEST_FILE);
        let content = fs::read_to_string(&path)?;
        Self::from_json(extension_id, dir, &content).map_err(|e| match e {
            ContentSyncError::Json(err) => ContentSyncError::ManifestParse {
                path,
                message: err.to_string(),
            },
            other => other,
        })
    }

    /// Parse `content.json` text for an extension whose payload lives in `content_dir`
    pub fn from_json(extension_id: &str, content_dir: &Path, json: &str) -> Result<Self> {
        let parsed: ContentJson = serde_json::from_str(json)?;
        let manifest = Self::new(extension_id, content_dir, parsed.channels);
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.channel_id.trim().is_empty() {
                return Err(ContentSyncError::ManifestParse {
                    path: self.content_dir.join(CONTENT_MANIFEST_FILE),
                    message: "channel_id must not be empty".to_string(),
                });
            }
            if !seen.insert(channel.channel_id.as_str()) {
                return Err(ContentSyncError::DuplicateChannel {
                    extension_id: self.extension_id.clone(),
                    channel_id: channel.channel_id.clone(),
                });
            }
            let overlap = channel.overlapping_node_ids();
            if !overlap.is_empty() {
                tracing::warn!(
                    extension = %self.extension_id,
                    channel = %channel.channel_id,
                    nodes = ?overlap,
                    "node ids are both included and excluded"
                );
            }
        }
        Ok(())
    }

    pub fn channel(&self, channel_id: &str) -> Option<&ChannelManifest> {
        self.channels.iter().find(|c| c.channel_id == channel_id)
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.channel_id.as_str())
    }
}
