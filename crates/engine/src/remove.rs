//! Deletion of removed resources and pruning of the directories they leave
//! empty.

use std::fs;
use std::io;
use std::path::Path;

use logging::trace_delete;

use crate::context::{PatchContext, ProgressEvent, ResourceOutcome};
use crate::source::join_relative;
use crate::PatchResult;

/// Deletes every path in `removed` under `root`, returning how many files
/// were deleted.
///
/// Missing files are skipped. A file that cannot be deleted is logged and
/// skipped. After each deletion, parent directories are removed while they
/// are empty, stopping at `root`.
pub fn remove_resources(
    context: &PatchContext,
    root: &Path,
    removed: &[String],
) -> PatchResult<usize> {
    let mut deleted = 0usize;
    for (position, relative) in removed.iter().enumerate() {
        let path = join_relative(root, relative)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                deleted += 1;
                trace_delete!(path = %relative, "removed resource");
                prune_empty_parents(root, &path);
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => continue,
            Err(error) => {
                tracing::warn!(
                    target: logging::targets::DELETE,
                    path = %relative,
                    %error,
                    "failed to remove resource"
                );
                continue;
            }
        }
        context.report(&ProgressEvent::Resource {
            relative_path: relative,
            outcome: ResourceOutcome::Removed,
            completed: position + 1,
            total: removed.len(),
        });
    }
    Ok(deleted)
}

fn prune_empty_parents(root: &Path, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        trace_delete!(path = %dir.display(), "pruned empty directory");
        current = dir.parent();
    }
}
