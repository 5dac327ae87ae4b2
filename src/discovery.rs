use crate::audit::AuditLog;
use crate::storage::{Entry, Storage};
use crate::worklist::{FolderRef, WorkList};
use anyhow::{Context, Result as AnyhowResult};
use log::debug;

/// Enumerates the folder tree below `root` depth-first, each folder before its subfolders.
/// The folder `excluded_id` and everything inside it are left out. A folder reachable through
/// several parents gets a single slot, at the position it is first reached.
pub fn discover(
    storage: &dyn Storage,
    audit: &mut AuditLog,
    root: &Entry,
    excluded_id: &str,
) -> AnyhowResult<WorkList> {
    let mut work_list = WorkList::default();
    visit(storage, audit, FolderRef::from(root), excluded_id, &mut work_list)?;
    Ok(work_list)
}

fn visit(
    storage: &dyn Storage,
    audit: &mut AuditLog,
    folder: FolderRef,
    excluded_id: &str,
    work_list: &mut WorkList,
) -> AnyhowResult<()> {
    if work_list.contains(&folder.id) {
        debug!("Folder {} ({}) already discovered", folder.name, folder.id);
        return Ok(());
    }
    debug!("Discovered folder {} ({})", folder.name, folder.id);
    audit.detail(&["discovery", "folder", &folder.id, &folder.name]);
    let children = storage
        .child_folders(&folder.id)
        .context(format!("Failed to list subfolders of {}", folder.id))?;
    work_list.push(folder);
    for child in children.iter().filter(|child| child.id != excluded_id) {
        visit(storage, audit, FolderRef::from(child), excluded_id, work_list)?;
    }
    Ok(())
}
