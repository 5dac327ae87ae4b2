use crate::storage::NodeKind;
use anyhow::{Context, Result as AnyhowResult};
use camino::Utf8Path;
use serde::Serialize;
use std::io::Write;
use tempfile::NamedTempFile;

#[derive(Serialize)]
pub struct Section {
    pub name: String,
    pub content: String,
}

fn write(name: String, content: &impl Serialize, path: &Utf8Path) -> AnyhowResult<()> {
    let content = serde_json::to_string(content).context("Serializing section content failed")?;
    let section = serde_json::to_string(&Section { name, content })
        .context("Serializing section failed")?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory).context("Opening tempfile failed")?;
    file.write_all(section.as_bytes()).context(format!(
        "Writing tempfile failed, {}",
        file.path().display()
    ))?;
    file.persist(path)
        .context(format!("Persisting tempfile failed, final_path: {path}"))
        .map(|_| ())
}

pub trait WriteSection {
    fn name() -> &'static str;

    fn write(&self, path: impl AsRef<Utf8Path>) -> AnyhowResult<()>
    where
        Self: Serialize,
    {
        write(Self::name().into(), &self, path.as_ref())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum MigrationOutcome {
    Migrated {
        kind: NodeKind,
        name: String,
        original_id: String,
        replacement_id: String,
    },
    Skipped {
        name: String,
        id: String,
        reason: String,
    },
    Failed {
        name: String,
        id: String,
        cause: String,
    },
}

#[derive(Debug, Default, Serialize)]
pub struct PassReport {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<MigrationOutcome>,
}

impl PassReport {
    pub fn add(&mut self, outcome: MigrationOutcome) {
        match outcome {
            MigrationOutcome::Migrated { .. } => self.migrated += 1,
            MigrationOutcome::Skipped { .. } => self.skipped += 1,
            MigrationOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started: i64,
    pub runtime_secs: u64,
    pub folders_discovered: usize,
    pub files: PassReport,
    pub folders: PassReport,
    pub cut_short: bool,
}

impl WriteSection for RunReport {
    fn name() -> &'static str {
        "takeover_run"
    }
}
