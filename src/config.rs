use anyhow::{Context, Result as AnyhowResult};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::from_str;
use std::fs::read_to_string;

pub fn load(path: &Utf8Path) -> AnyhowResult<Config> {
    from_str(&read_to_string(path).context(format!("Failed to read {path}"))?)
        .context(format!("Failed to parse {path}"))
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Config {
    pub snapshot_path: Utf8PathBuf,
    pub root_folder_id: String,
    pub archive_folder_id: String,
    /// Only migrate objects owned by this principal. Without it, everything not owned by the
    /// running principal is migrated.
    pub target_owner: Option<String>,
    pub retain_access: bool,
    pub max_runtime_secs: u64,
    pub audit_log: Option<AuditLogConfig>,
    pub results_path: Option<Utf8PathBuf>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AuditLogConfig {
    pub directory: Utf8PathBuf,
    pub tab: String,
    /// Also log every row at info level. The rows show up at the default verbosity as well.
    pub mirror_to_diagnostics: bool,
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config() {
        let config: Config = from_str(
            r#"{
                "snapshot_path": "/var/lib/takeover/drive.json",
                "root_folder_id": "f-root",
                "archive_folder_id": "f-archive",
                "target_owner": null,
                "retain_access": true,
                "max_runtime_secs": 330,
                "audit_log": {
                    "directory": "/var/log/takeover",
                    "tab": "run-log",
                    "mirror_to_diagnostics": true,
                    "verbose": false
                },
                "results_path": null
            }"#,
        )
        .unwrap();
        assert_eq!(config.target_owner, None);
        assert_eq!(config.max_runtime_secs, 330);
        assert_eq!(
            config.audit_log,
            Some(AuditLogConfig {
                directory: "/var/log/takeover".into(),
                tab: "run-log".into(),
                mirror_to_diagnostics: true,
                verbose: false,
            })
        );
    }
}
