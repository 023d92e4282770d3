use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::apply::ContentRunner;
use crate::error::{ContentSyncError, Result};

/// Environment variable Kolibri reads additional content directories from
pub const FALLBACK_DIRS_ENV: &str = "KOLIBRI_CONTENT_FALLBACK_DIRS";
pub const KOLIBRI_HOME_ENV: &str = "KOLIBRI_HOME";

/// Runs the Kolibri binary as a child process.
///
/// The child inherits the wrapper's environment plus the variables set here;
/// the wrapper's own environment is never modified.
#[derive(Debug, Clone)]
pub struct KolibriRunner {
    program: PathBuf,
    envs: Vec<(String, String)>,
}

impl KolibriRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            envs: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn with_home(self, home: &Path) -> Self {
        self.with_env(KOLIBRI_HOME_ENV, home.to_string_lossy())
    }

    pub fn with_fallback_dirs(self, fallback_dirs: impl Into<String>) -> Self {
        self.with_env(FALLBACK_DIRS_ENV, fallback_dirs)
    }

    pub fn command(&self, args: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }
}

impl ContentRunner for KolibriRunner {
    fn run(&mut self, args: &[OsString]) -> Result<i32> {
        tracing::debug!(program = %self.program.display(), ?args, "running kolibri");
        let status = self
            .command(args)
            .status()
            .map_err(|e| ContentSyncError::Launch {
                program: self.program.clone(),
                source: e,
            })?;
        Ok(exit_code(status))
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
