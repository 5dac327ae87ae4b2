//! JSON snapshot of a storage tree, the persistent form of [`MemoryStorage`].

use crate::storage::memory::{MemoryStorage, Tree};
use anyhow::{Context, Result as AnyhowResult};
use camino::Utf8Path;
use std::fs::read_to_string;
use std::io::Write;
use tempfile::NamedTempFile;

pub fn load(path: &Utf8Path) -> AnyhowResult<MemoryStorage> {
    let raw = read_to_string(path).context(format!("Failed to read snapshot {path}"))?;
    let tree: Tree =
        serde_json::from_str(&raw).context(format!("Failed to parse snapshot {path}"))?;
    Ok(MemoryStorage::from_tree(tree))
}

/// Replaces the snapshot at `path` atomically.
pub fn save(storage: &MemoryStorage, path: &Utf8Path) -> AnyhowResult<()> {
    let content =
        serde_json::to_string_pretty(storage.tree()).context("Failed to serialize snapshot")?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory).context("Opening tempfile failed")?;
    file.write_all(content.as_bytes()).context(format!(
        "Writing tempfile failed, {}",
        file.path().display()
    ))?;
    file.persist(path)
        .context(format!("Persisting tempfile failed, final_path: {path}"))
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Role, Storage};
    use camino::Utf8PathBuf;
    use tempfile::tempdir;

    #[test]
    fn save_and_load() -> AnyhowResult<()> {
        let dir = tempdir()?;
        let path = Utf8PathBuf::try_from(dir.path().join("drive.json"))?;
        let mut storage = MemoryStorage::new("me@x.com");
        let root = storage.add_folder(None, "root", "me@x.com");
        let item = storage.add_item(&root, "notes", "alice@x.com");
        storage.share(&item, Role::Reader, "bob@x.com");
        save(&storage, &path)?;

        let mut loaded = load(&path)?;
        assert_eq!(loaded.tree(), storage.tree());
        assert_eq!(loaded.current_principal(), "me@x.com");
        // Ids handed out after loading do not collide with stored ones.
        let created = loaded.create_folder(&root, "fresh")?;
        assert!(storage.node(&created.id).is_none());
        Ok(())
    }

    #[test]
    fn load_minimal_snapshot() -> AnyhowResult<()> {
        let dir = tempdir()?;
        let path = Utf8PathBuf::try_from(dir.path().join("drive.json"))?;
        std::fs::write(
            &path,
            r#"{
                "principal": "me@x.com",
                "nodes": [
                    {"id": "root", "kind": "Folder", "name": "Root", "owner": "me@x.com", "parents": []},
                    {"id": "doc", "kind": "Item", "name": "Doc", "owner": "alice@x.com", "parents": ["root"]}
                ]
            }"#,
        )?;
        let storage = load(&path)?;
        assert_eq!(storage.child_items("root")?[0].owner, "alice@x.com");
        Ok(())
    }

    #[test]
    fn load_missing_snapshot() {
        assert!(load(Utf8Path::new("/nonexistent/drive.json")).is_err());
    }
}
