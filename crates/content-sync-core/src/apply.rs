use std::collections::BTreeSet;
use std::ffi::OsString;

use crate::error::{ContentSyncError, Result};
use crate::plan::ContentOperation;

/// Executes one `kolibri` invocation and reports its exit code
pub trait ContentRunner {
    fn run(&mut self, args: &[OsString]) -> Result<i32>;
}

impl<R: ContentRunner + ?Sized> ContentRunner for &mut R {
    fn run(&mut self, args: &[OsString]) -> Result<i32> {
        (**self).run(args)
    }
}

impl ContentOperation {
    /// Arguments passed to the `kolibri` binary to carry out this operation
    pub fn command_args(&self) -> Vec<String> {
        let mut args = vec!["manage".to_string()];
        match self {
            Self::ImportChannel { channel_id, .. } => {
                args.push("scanforcontent".to_string());
                args.push(format!("--channels={}", channel_id));
                args.push("--skip-annotations".to_string());
            }
            Self::ImportContent {
                channel_id,
                extension_dir,
                include_node_ids,
                exclude_node_ids,
            } => {
                args.push("importcontent".to_string());
                if !include_node_ids.is_empty() {
                    args.push("--node_ids".to_string());
                    args.push(join_ids(include_node_ids));
                }
                if !exclude_node_ids.is_empty() {
                    args.push("--exclude_node_ids".to_string());
                    args.push(join_ids(exclude_node_ids));
                }
                args.push("disk".to_string());
                args.push(channel_id.clone());
                args.push(extension_dir.to_string_lossy().to_string());
            }
            Self::RescanContent {
                channel_id,
                removed,
            } => {
                args.push("scanforcontent".to_string());
                args.push(format!("--channels={}", channel_id));
                if *removed {
                    args.push("--channel-import-mode=none".to_string());
                }
            }
        }
        args
    }
}

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Run `operations` in order, stopping at the first one that does not exit cleanly.
///
/// Returns the number of operations applied.
pub fn apply_operations<R>(operations: &[ContentOperation], runner: &mut R) -> Result<usize>
where
    R: ContentRunner + ?Sized,
{
    for (index, operation) in operations.iter().enumerate() {
        tracing::info!(
            step = index + 1,
            total = operations.len(),
            "applying: {}",
            operation
        );
        let args: Vec<OsString> = operation
            .command_args()
            .into_iter()
            .map(OsString::from)
            .collect();
        let code = runner.run(&args)?;
        if code != 0 {
            tracing::error!(code, "content operation failed: {}", operation);
            return Err(ContentSyncError::OperationFailed {
                operation: operation.to_string(),
                code,
            });
        }
    }
    Ok(operations.len())
}
