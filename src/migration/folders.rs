use super::{RunContext, failed};
use crate::permissions::replicate;
use crate::results::{MigrationOutcome, PassReport};
use crate::storage::{Entry, NodeKind, OwnerPredicate, Query, Storage};
use crate::worklist::{FolderRef, WorkList};
use anyhow::{Context, Result as AnyhowResult};
use log::{debug, info};
use std::collections::HashMap;

/// Replaces every selected subfolder in the work list by an owned folder of the same name,
/// moves its contents over and archives it. Replacements take over the work list slot of the
/// folder they replace, so the pass continues into them. A folder met again through another
/// parent is not migrated twice: its replacement is linked into that parent as well.
pub fn migrate_folders(
    context: &mut RunContext,
    storage: &mut dyn Storage,
    work_list: &mut WorkList,
) -> PassReport {
    let mut report = PassReport::default();
    let query = Query::owner(
        context
            .settings
            .filter
            .predicate(storage.current_principal()),
    );
    debug!("Folder pass query: {query}");

    let mut replacements: HashMap<String, Entry> = HashMap::new();
    let mut slot = 0;
    'folders: while let Some(parent) = work_list.get(slot).cloned() {
        slot += 1;
        if context.deadline.exceeded() {
            break;
        }
        let subfolders = match storage
            .search_folders(&parent.id, &query)
            .context(format!("Failed to search subfolders of folder {}", parent.id))
        {
            Ok(subfolders) => subfolders,
            Err(error) => {
                report.add(failed(
                    &mut context.audit,
                    "folder pass",
                    &parent.name,
                    &parent.id,
                    error,
                ));
                continue;
            }
        };
        context.audit.detail(&[
            "folder pass",
            "inspecting",
            &parent.id,
            &subfolders.len().to_string(),
        ]);

        for subfolder in subfolders {
            if context.deadline.exceeded() {
                break 'folders;
            }
            if subfolder.id == context.settings.archive_folder_id {
                context
                    .audit
                    .record(&["folder", "skipped", &subfolder.id, "archive folder"]);
                report.add(MigrationOutcome::Skipped {
                    name: subfolder.name,
                    id: subfolder.id,
                    reason: "archive folder".into(),
                });
                continue;
            }
            if let Some(replacement) = replacements.get(&subfolder.id) {
                report.add(relink(context, storage, &parent, &subfolder, replacement));
                continue;
            }
            let outcome = match migrate_folder(context, storage, work_list, &parent, &subfolder)
            {
                Ok(replacement) => {
                    info!("Migrated folder {subfolder} to {}", replacement.id);
                    context.audit.record(&[
                        "folder",
                        "migrated",
                        &subfolder.id,
                        &subfolder.name,
                        &replacement.url,
                    ]);
                    let outcome = MigrationOutcome::Migrated {
                        kind: NodeKind::Folder,
                        name: subfolder.name.clone(),
                        original_id: subfolder.id.clone(),
                        replacement_id: replacement.id.clone(),
                    };
                    replacements.insert(subfolder.id.clone(), replacement);
                    outcome
                }
                Err(error) => failed(
                    &mut context.audit,
                    "folder",
                    &subfolder.name,
                    &subfolder.id,
                    error,
                ),
            };
            report.add(outcome);
        }
    }
    report
}

fn migrate_folder(
    context: &mut RunContext,
    storage: &mut dyn Storage,
    work_list: &mut WorkList,
    parent: &FolderRef,
    subfolder: &Entry,
) -> AnyhowResult<Entry> {
    let replacement = match find_replacement(storage, parent, subfolder)? {
        Some(existing) => {
            debug!("Reusing folder {existing} as replacement of {subfolder}");
            context
                .audit
                .record(&["folder", "reusing", &subfolder.id, &existing.id]);
            existing
        }
        None => {
            let created = storage
                .create_folder(&parent.id, &subfolder.name)
                .context(format!("Failed to create replacement of folder {subfolder}"))?;
            if !work_list.replace(&subfolder.id, FolderRef::from(&created)) {
                debug!("Folder {subfolder} is not part of the work list");
            }
            context
                .audit
                .record(&["folder", "created", &subfolder.id, &created.id]);
            created
        }
    };

    let mut editors = subfolder.editors.clone();
    editors.push(subfolder.owner.clone());
    replicate(
        storage,
        &mut context.audit,
        &replacement.id,
        &subfolder.viewers,
        &editors,
    )
    .context(format!("Failed to replicate permissions of folder {subfolder}"))?;

    move_children(context, storage, subfolder, &replacement)?;

    let archive_id = context.settings.archive_folder_id.as_str();
    storage
        .add_folder_to_folder(archive_id, &subfolder.id)
        .context(format!("Failed to add folder {subfolder} to the archive"))?;
    storage
        .remove_folder_from_folder(&parent.id, &subfolder.id)
        .context(format!(
            "Failed to remove folder {subfolder} from folder {}",
            parent.id
        ))?;
    Ok(replacement)
}

fn relink(
    context: &mut RunContext,
    storage: &mut dyn Storage,
    parent: &FolderRef,
    subfolder: &Entry,
    replacement: &Entry,
) -> MigrationOutcome {
    let relinked = storage
        .add_folder_to_folder(&parent.id, &replacement.id)
        .context(format!("Failed to add folder {replacement} to folder {}", parent.id))
        .and_then(|()| {
            storage
                .remove_folder_from_folder(&parent.id, &subfolder.id)
                .context(format!(
                    "Failed to remove folder {subfolder} from folder {}",
                    parent.id
                ))
        });
    match relinked {
        Ok(()) => {
            debug!("Linked replacement {replacement} of {subfolder} into {}", parent.id);
            context.audit.record(&[
                "folder",
                "relinked",
                &subfolder.id,
                &parent.id,
                &replacement.id,
            ]);
            MigrationOutcome::Skipped {
                name: subfolder.name.clone(),
                id: subfolder.id.clone(),
                reason: format!("already migrated to {}", replacement.id),
            }
        }
        Err(error) => failed(
            &mut context.audit,
            "folder",
            &subfolder.name,
            &subfolder.id,
            error,
        ),
    }
}

// An owned folder of exactly the same name left behind by an interrupted earlier run.
fn find_replacement(
    storage: &dyn Storage,
    parent: &FolderRef,
    subfolder: &Entry,
) -> AnyhowResult<Option<Entry>> {
    let query = Query::titled(
        &subfolder.name,
        OwnerPredicate::OwnedBy(storage.current_principal().into()),
    );
    Ok(storage
        .search_folders(&parent.id, &query)
        .context(format!("Failed to search for a replacement of {subfolder}"))?
        .into_iter()
        .find(|candidate| candidate.id != subfolder.id))
}

fn move_children(
    context: &mut RunContext,
    storage: &mut dyn Storage,
    from: &Entry,
    to: &Entry,
) -> AnyhowResult<()> {
    for item in storage
        .child_items(&from.id)
        .context(format!("Failed to list files of folder {from}"))?
    {
        storage
            .add_item_to_folder(&to.id, &item.id)
            .context(format!("Failed to add file {item} to folder {to}"))?;
        storage
            .remove_item_from_folder(&from.id, &item.id)
            .context(format!("Failed to remove file {item} from folder {from}"))?;
        context
            .audit
            .detail(&["relocate", "file", &item.id, &from.id, &to.id]);
    }
    for child in storage
        .child_folders(&from.id)
        .context(format!("Failed to list subfolders of folder {from}"))?
    {
        storage
            .add_folder_to_folder(&to.id, &child.id)
            .context(format!("Failed to add folder {child} to folder {to}"))?;
        storage
            .remove_folder_from_folder(&from.id, &child.id)
            .context(format!("Failed to remove folder {child} from folder {from}"))?;
        context
            .audit
            .detail(&["relocate", "folder", &child.id, &from.id, &to.id]);
    }
    Ok(())
}
