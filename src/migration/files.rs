use super::{RunContext, failed};
use crate::permissions::replicate;
use crate::results::{MigrationOutcome, PassReport};
use crate::storage::{Entry, NodeKind, Query, Storage};
use crate::worklist::{FolderRef, WorkList};
use anyhow::{Context, Result as AnyhowResult};
use log::{debug, info};
use std::collections::HashMap;

pub fn deprecated_name(name: &str, replacement_url: &str) -> String {
    format!("DEPRECATED - {name} - moved to {replacement_url}")
}

/// Replaces every selected file in the work list by an owned copy and archives the original.
/// A file met again in another folder is not copied twice: its copy takes its place there.
pub fn migrate_files(
    context: &mut RunContext,
    storage: &mut dyn Storage,
    work_list: &WorkList,
) -> PassReport {
    let mut report = PassReport::default();
    let query = Query::owner(
        context
            .settings
            .filter
            .predicate(storage.current_principal()),
    );
    debug!("File pass query: {query}");

    let mut copies: HashMap<String, Entry> = HashMap::new();
    'folders: for folder in work_list.iter() {
        if context.deadline.exceeded() {
            break;
        }
        let items = match storage
            .search_items(&folder.id, &query)
            .context(format!("Failed to search files in folder {}", folder.id))
        {
            Ok(items) => items,
            Err(error) => {
                report.add(failed(
                    &mut context.audit,
                    "file pass",
                    &folder.name,
                    &folder.id,
                    error,
                ));
                continue;
            }
        };
        context.audit.detail(&[
            "file pass",
            "inspecting",
            &folder.id,
            &items.len().to_string(),
        ]);

        for item in items {
            if context.deadline.exceeded() {
                break 'folders;
            }
            if let Some(copy) = copies.get(&item.id) {
                report.add(relink(context, storage, folder, &item, copy));
                continue;
            }
            let outcome = match migrate_file(context, storage, folder, &item) {
                Ok(copy) => {
                    info!("Migrated file {item} to {}", copy.id);
                    context
                        .audit
                        .record(&["file", "migrated", &item.id, &item.name, &copy.url]);
                    let outcome = MigrationOutcome::Migrated {
                        kind: NodeKind::Item,
                        name: item.name.clone(),
                        original_id: item.id.clone(),
                        replacement_id: copy.id.clone(),
                    };
                    copies.insert(item.id.clone(), copy);
                    outcome
                }
                Err(error) => failed(&mut context.audit, "file", &item.name, &item.id, error),
            };
            report.add(outcome);
        }
    }
    report
}

// The copy carries all grants before the original moves to the archive.
fn migrate_file(
    context: &mut RunContext,
    storage: &mut dyn Storage,
    folder: &FolderRef,
    item: &Entry,
) -> AnyhowResult<Entry> {
    let copy = storage
        .copy_item(&item.id, &item.name)
        .context(format!("Failed to copy file {item}"))?;
    context
        .audit
        .detail(&["file", "copied", &item.id, &copy.id]);

    let mut editors = item.editors.clone();
    if context.settings.retain_access {
        editors.push(item.owner.clone());
    }
    replicate(
        storage,
        &mut context.audit,
        &copy.id,
        &item.viewers,
        &editors,
    )
    .context(format!("Failed to replicate permissions of file {item}"))?;

    let archive_id = context.settings.archive_folder_id.as_str();
    storage
        .add_item_to_folder(archive_id, &item.id)
        .context(format!("Failed to add file {item} to the archive"))?;
    storage
        .remove_item_from_folder(&folder.id, &item.id)
        .context(format!("Failed to remove file {item} from folder {}", folder.id))?;
    storage
        .rename(&item.id, &deprecated_name(&item.name, &copy.url))
        .context(format!("Failed to rename archived file {item}"))?;
    Ok(copy)
}

fn relink(
    context: &mut RunContext,
    storage: &mut dyn Storage,
    folder: &FolderRef,
    item: &Entry,
    copy: &Entry,
) -> MigrationOutcome {
    let relinked = storage
        .add_item_to_folder(&folder.id, &copy.id)
        .context(format!("Failed to add file {copy} to folder {}", folder.id))
        .and_then(|()| {
            storage
                .remove_item_from_folder(&folder.id, &item.id)
                .context(format!("Failed to remove file {item} from folder {}", folder.id))
        });
    match relinked {
        Ok(()) => {
            context
                .audit
                .record(&["file", "relinked", &item.id, &folder.id, &copy.id]);
            MigrationOutcome::Skipped {
                name: item.name.clone(),
                id: item.id.clone(),
                reason: format!("already migrated to {}", copy.id),
            }
        }
        Err(error) => failed(&mut context.audit, "file", &item.name, &item.id, error),
    }
}
