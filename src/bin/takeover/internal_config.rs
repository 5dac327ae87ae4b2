use takeover::audit::{AuditLog, AuditSink, TsvFileSink};
use takeover::config::{AuditLogConfig, Config};
use takeover::deadline::Deadline;
use takeover::migration::{RunContext, Settings};
use takeover::storage::OwnershipFilter;

use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct GlobalConfig {
    pub snapshot_path: Utf8PathBuf,
    pub results_path: Option<Utf8PathBuf>,
    pub audit_log: Option<AuditLogConfig>,
    pub settings: Settings,
    pub runtime_budget: Duration,
    pub cancellation_token: CancellationToken,
}

pub fn from_external_config(
    external_config: Config,
    cancellation_token: CancellationToken,
) -> GlobalConfig {
    GlobalConfig {
        snapshot_path: external_config.snapshot_path,
        results_path: external_config.results_path,
        audit_log: external_config.audit_log,
        settings: Settings {
            root_folder_id: external_config.root_folder_id,
            archive_folder_id: external_config.archive_folder_id,
            filter: OwnershipFilter {
                target_owner: external_config.target_owner,
            },
            retain_access: external_config.retain_access,
        },
        runtime_budget: Duration::from_secs(external_config.max_runtime_secs),
        cancellation_token,
    }
}

impl GlobalConfig {
    pub fn audit_directory(&self) -> Option<&Utf8Path> {
        self.audit_log
            .as_ref()
            .map(|audit_log_config| audit_log_config.directory.as_path())
    }

    /// The run time budget starts counting when the context is created, so time spent waiting
    /// for the snapshot lock is not charged to the run.
    pub fn run_context(&self) -> RunContext {
        RunContext {
            settings: self.settings.clone(),
            deadline: Deadline::new(self.runtime_budget, self.cancellation_token.clone()),
            audit: audit_log(self.audit_log.as_ref()),
        }
    }
}

fn audit_log(config: Option<&AuditLogConfig>) -> AuditLog {
    match config {
        Some(config) => AuditLog::new(
            Some(Box::new(TsvFileSink::new(&config.directory, &config.tab)) as Box<dyn AuditSink>),
            config.mirror_to_diagnostics,
            config.verbose,
        ),
        None => AuditLog::disabled(),
    }
}
