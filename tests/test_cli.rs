use anyhow::Result as AnyhowResult;
use assert_cmd::Command;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{read_to_string, write};
use takeover::config::{AuditLogConfig, Config};
use takeover::snapshot;
use takeover::storage::memory::MemoryStorage;
use takeover::storage::{Role, Storage};
use tempfile::tempdir;

fn create_config(dir: &Utf8Path, root: &str, archive: &str) -> Config {
    Config {
        snapshot_path: dir.join("drive.json"),
        root_folder_id: root.into(),
        archive_folder_id: archive.into(),
        target_owner: None,
        retain_access: true,
        max_runtime_secs: 300,
        audit_log: Some(AuditLogConfig {
            directory: dir.join("audit"),
            tab: "run-log".into(),
            mirror_to_diagnostics: true,
            verbose: true,
        }),
        results_path: Some(dir.join("last_run.json")),
    }
}

#[test]
fn test_run_on_snapshot() -> AnyhowResult<()> {
    let temp_dir = tempdir()?;
    let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf())?;

    let mut storage = MemoryStorage::new("me@x.com");
    let root = storage.add_folder(None, "Team", "me@x.com");
    let archive = storage.add_folder(None, "Archive", "me@x.com");
    let doc = storage.add_item(&root, "Roadmap", "alice@x.com");
    storage.share(&doc, Role::Reader, "bob@x.com");
    let folder = storage.add_folder(Some(&root), "Designs", "alice@x.com");
    storage.add_item(&folder, "Logo", "me@x.com");

    let config = create_config(&dir, &root, &archive);
    snapshot::save(&storage, &config.snapshot_path)?;
    let config_path = dir.join("takeover.json");
    write(&config_path, serde_json::to_string(&config)?)?;

    let output = Command::cargo_bin("takeover")?
        .arg(&config_path)
        .arg("-v")
        .output()?;
    assert!(output.status.success());

    let storage = snapshot::load(&config.snapshot_path)?;
    let children: Vec<_> = storage
        .child_items(&root)?
        .into_iter()
        .chain(storage.child_folders(&root)?)
        .collect();
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|child| child.owner == "me@x.com"));
    assert_eq!(storage.child_items(&archive)?.len(), 1);
    assert_eq!(storage.child_folders(&archive)?[0].id, folder);

    let section: serde_json::Value =
        serde_json::from_str(&read_to_string(dir.join("last_run.json"))?)?;
    assert_eq!(section["name"], "takeover_run");
    let report: serde_json::Value = serde_json::from_str(section["content"].as_str().unwrap())?;
    assert_eq!(report["cut_short"], false);
    assert_eq!(report["files"]["migrated"], 1);
    assert_eq!(report["folders"]["migrated"], 1);

    let audit = read_to_string(dir.join("audit").join("run-log.tsv"))?;
    assert!(audit.lines().any(|line| line.contains("\trun\tcompleted\t")));
    Ok(())
}

#[test]
fn test_missing_config_fails() -> AnyhowResult<()> {
    let temp_dir = tempdir()?;
    let output = Command::cargo_bin("takeover")?
        .arg(temp_dir.path().join("missing.json"))
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("Configuration loading failed"));
    Ok(())
}
