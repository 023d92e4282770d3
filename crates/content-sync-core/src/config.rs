use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContentSyncError, Result};
use crate::extension_set::MalformedPolicy;

const CONFIG_FILE: &str = "content-sync.toml";
const DEFAULT_KOLIBRI_BIN: &str = "/app/libexec/kolibri";
const DEFAULT_EXTENSIONS_DIR: &str = "/app/share/kolibri-content";
const DEFAULT_CACHE_FILE: &str = "content-extensions.toml";
const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "kolibri-flatpak-wrapper.txt";
/// Kolibri home used when no home directory can be determined
const FALLBACK_HOME: &str = ".kolibri";

pub const HOME_ENV: &str = "KOLIBRI_HOME";
pub const BIN_ENV: &str = "KOLIBRI_WRAPPER_BIN";
pub const EXTENSIONS_DIR_ENV: &str = "KOLIBRI_CONTENT_EXTENSIONS_DIR";
pub const CACHE_ENV: &str = "KOLIBRI_CONTENT_CACHE";

/// Wrapper configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Kolibri data directory; not read from the file itself
    #[serde(skip)]
    pub home: PathBuf,

    #[serde(default)]
    pub kolibri: KolibriConfig,

    #[serde(default)]
    pub extensions: ExtensionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolibriConfig {
    /// Kolibri executable used for content operations and the final launch
    #[serde(default = "default_bin")]
    pub bin: PathBuf,
}

impl Default for KolibriConfig {
    fn default() -> Self {
        Self { bin: default_bin() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Directory holding one subdirectory per installed content extension
    #[serde(default = "default_extensions_dir")]
    pub dir: PathBuf,

    /// Snapshot cache, relative paths resolve against the Kolibri home
    #[serde(default = "default_cache")]
    pub cache: PathBuf,

    #[serde(default)]
    pub on_malformed: MalformedPolicy,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            dir: default_extensions_dir(),
            cache: default_cache(),
            on_malformed: MalformedPolicy::default(),
        }
    }
}

fn default_bin() -> PathBuf {
    PathBuf::from(DEFAULT_KOLIBRI_BIN)
}

fn default_extensions_dir() -> PathBuf {
    PathBuf::from(DEFAULT_EXTENSIONS_DIR)
}

fn default_cache() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_FILE)
}

impl Config {
    /// Resolve configuration using `lookup` for environment variables.
    ///
    /// The Kolibri home comes from `KOLIBRI_HOME` or `~/.kolibri`; the config
    /// file in it is read next, and the remaining variables override it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = resolve_home(&lookup)?;
        let mut config = Self::load(&home)?;
        config.apply_overrides(lookup);
        Ok(config)
    }

    /// Resolve configuration from the process environment; never fails.
    ///
    /// On error the defaults are used, still honouring the environment
    /// overrides, and the error is handed back for logging.
    pub fn from_env_or_default() -> (Self, Option<ContentSyncError>) {
        Self::from_lookup_or_default(|key| std::env::var(key).ok())
    }

    pub fn from_lookup_or_default<F>(lookup: F) -> (Self, Option<ContentSyncError>)
    where
        F: Fn(&str) -> Option<String>,
    {
        match Self::from_lookup(&lookup) {
            Ok(config) => (config, None),
            Err(e) => {
                let mut config = Self {
                    home: resolve_home(&lookup).unwrap_or_else(|_| PathBuf::from(FALLBACK_HOME)),
                    ..Self::default()
                };
                config.apply_overrides(lookup);
                (config, Some(e))
            }
        }
    }

    /// Load config from the Kolibri home directory
    pub fn load(home: &Path) -> Result<Self> {
        let path = Self::path(home);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str::<Config>(&content).map_err(|e| ContentSyncError::ConfigParse {
                path: path.clone(),
                message: e.to_string(),
            })?
        } else {
            Self::default()
        };
        config.home = home.to_path_buf();
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bin) = non_empty(lookup(BIN_ENV)) {
            self.kolibri.bin = PathBuf::from(bin);
        }
        if let Some(dir) = non_empty(lookup(EXTENSIONS_DIR_ENV)) {
            self.extensions.dir = PathBuf::from(dir);
        }
        if let Some(cache) = non_empty(lookup(CACHE_ENV)) {
            self.extensions.cache = PathBuf::from(cache);
        }
    }

    /// Get config file path
    pub fn path(home: &Path) -> PathBuf {
        home.join(CONFIG_FILE)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.home.join(&self.extensions.cache)
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join(LOG_DIR).join(LOG_FILE)
    }
}

/// `KOLIBRI_HOME`, or `~/.kolibri`
fn resolve_home<F>(lookup: &F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(HOME_ENV)) {
        Some(home) => Ok(PathBuf::from(home)),
        None => Ok(dirs::home_dir()
            .ok_or(ContentSyncError::HomeNotFound)?
            .join(".kolibri")),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
