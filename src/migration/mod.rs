//! The two migration passes and the run that drives them.

pub mod files;
pub mod folders;

use crate::audit::AuditLog;
use crate::deadline::Deadline;
use crate::discovery::discover;
use crate::results::{MigrationOutcome, RunReport};
use crate::storage::{OwnershipFilter, Storage};
use anyhow::{Context, Result as AnyhowResult};
use chrono::Utc;
use log::{error, info};

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub root_folder_id: String,
    pub archive_folder_id: String,
    pub filter: OwnershipFilter,
    /// Keep the previous owner of a migrated file as editor of the copy. Folder owners are
    /// always kept.
    pub retain_access: bool,
}

/// Everything a run threads through its passes.
pub struct RunContext {
    pub settings: Settings,
    pub deadline: Deadline,
    pub audit: AuditLog,
}

/// Discovers the tree below the root folder, then runs the file pass followed by the folder
/// pass. Per-object failures end up in the report; only failures to resolve the root and
/// archive folders or to enumerate the tree end the run with an error.
pub fn run(context: &mut RunContext, storage: &mut dyn Storage) -> AnyhowResult<RunReport> {
    let principal = storage.current_principal().to_string();
    info!("Starting run as {principal}");
    context.audit.record(&[
        "run",
        "started",
        &principal,
        &context.settings.root_folder_id,
        &context.settings.archive_folder_id,
    ]);
    execute(context, storage).inspect_err(|error| {
        context
            .audit
            .record(&["run", "aborted", &format!("{error:?}")]);
    })
}

fn execute(context: &mut RunContext, storage: &mut dyn Storage) -> AnyhowResult<RunReport> {
    let started = Utc::now();
    let root = storage
        .folder(&context.settings.root_folder_id)
        .context("Failed to resolve root folder")?;
    let archive = storage
        .folder(&context.settings.archive_folder_id)
        .context("Failed to resolve archive folder")?;

    let mut work_list = discover(storage, &mut context.audit, &root, &archive.id)
        .context("Folder discovery failed")?;
    info!("Discovered {} folder(s) below {root}", work_list.len());
    context.audit.record(&[
        "discovery",
        "completed",
        &root.id,
        &work_list.len().to_string(),
    ]);

    let files = files::migrate_files(context, storage, &work_list);
    info!(
        "File pass: {} migrated, {} failed",
        files.migrated, files.failed
    );
    let folders = folders::migrate_folders(context, storage, &mut work_list);
    info!(
        "Folder pass: {} migrated, {} skipped, {} failed",
        folders.migrated, folders.skipped, folders.failed
    );

    let cut_short = context.deadline.is_cut_short();
    let runtime_secs = context.deadline.elapsed().as_secs();
    if cut_short {
        context.audit.record(&[
            "run",
            "cut short",
            &runtime_secs.to_string(),
            "remaining objects are picked up by the next run",
        ]);
    } else {
        context
            .audit
            .record(&["run", "completed", &runtime_secs.to_string()]);
    }

    Ok(RunReport {
        started: started.timestamp(),
        runtime_secs,
        folders_discovered: work_list.len(),
        files,
        folders,
        cut_short,
    })
}

fn failed(
    audit: &mut AuditLog,
    pass: &str,
    name: &str,
    id: &str,
    cause: anyhow::Error,
) -> MigrationOutcome {
    error!("{cause:?}");
    let cause = format!("{cause:?}");
    audit.record(&[pass, "failed", id, name, &cause]);
    MigrationOutcome::Failed {
        name: name.into(),
        id: id.into(),
        cause,
    }
}
