//! Append-only audit trail of every discovery, decision and mutation of a run.

use anyhow::{Context, Result as AnyhowResult};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use log::{info, warn};
use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::Write;
use std::rc::Rc;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Module path of the rows mirrored to the diagnostic stream, which are logged at info level.
pub const MIRROR_MODULE: &str = module_path!();

pub trait AuditSink {
    /// Appends one row. The first column is the timestamp.
    fn append_row(&mut self, row: &[String]) -> AnyhowResult<()>;
}

/// Tab-separated rows appended to `<directory>/<tab>.tsv`.
pub struct TsvFileSink {
    path: Utf8PathBuf,
}

impl TsvFileSink {
    pub fn new(directory: &Utf8Path, tab: &str) -> Self {
        Self {
            path: directory.join(format!("{tab}.tsv")),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl AuditSink for TsvFileSink {
    fn append_row(&mut self, row: &[String]) -> AnyhowResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(format!("Failed to open audit log {}", self.path))?;
        let line = row
            .iter()
            .map(|value| flatten(value))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(file, "{line}").context(format!("Failed to append to audit log {}", self.path))
    }
}

fn flatten(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

/// Keeps rows in memory; clones share the same rows.
#[derive(Clone, Default)]
pub struct MemorySink {
    rows: Rc<RefCell<Vec<Vec<String>>>>,
}

impl MemorySink {
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.borrow().clone()
    }
}

impl AuditSink for MemorySink {
    fn append_row(&mut self, row: &[String]) -> AnyhowResult<()> {
        self.rows.borrow_mut().push(row.to_vec());
        Ok(())
    }
}

pub struct AuditLog {
    sink: Option<Box<dyn AuditSink>>,
    mirror_to_diagnostics: bool,
    verbose: bool,
    cursor: usize,
}

impl AuditLog {
    pub fn new(
        sink: Option<Box<dyn AuditSink>>,
        mirror_to_diagnostics: bool,
        verbose: bool,
    ) -> Self {
        Self {
            sink,
            mirror_to_diagnostics,
            verbose,
            cursor: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, false, false)
    }

    /// Number of rows appended to the sink so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn record(&mut self, values: &[&str]) {
        if self.mirror_to_diagnostics {
            info!("{}", values.join(" | "));
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let mut row = vec![Utc::now().format(TIMESTAMP_FORMAT).to_string()];
        row.extend(values.iter().map(|value| value.to_string()));
        match sink.append_row(&row) {
            Ok(()) => self.cursor += 1,
            Err(error) => warn!("Audit row dropped: {error:?}"),
        }
    }

    /// Like `record`, but only in verbose mode.
    pub fn detail(&mut self, values: &[&str]) {
        if self.verbose {
            self.record(values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::fs::read_to_string;
    use tempfile::tempdir;

    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn append_row(&mut self, _row: &[String]) -> AnyhowResult<()> {
            bail!("sheet unavailable")
        }
    }

    #[test]
    fn rows_start_with_timestamp() {
        let sink = MemorySink::default();
        let mut audit = AuditLog::new(Some(Box::new(sink.clone())), false, false);
        audit.record(&["file", "migrated", "n4"]);
        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1..], ["file", "migrated", "n4"]);
        assert!(chrono::DateTime::parse_from_str(&rows[0][0], TIMESTAMP_FORMAT).is_ok());
        assert_eq!(audit.cursor(), 1);
    }

    #[test]
    fn detail_rows_need_verbose() {
        let sink = MemorySink::default();
        let mut quiet = AuditLog::new(Some(Box::new(sink.clone())), false, false);
        quiet.detail(&["grant"]);
        assert!(sink.rows().is_empty());
        let mut verbose = AuditLog::new(Some(Box::new(sink.clone())), false, true);
        verbose.detail(&["grant"]);
        assert_eq!(sink.rows().len(), 1);
    }

    #[test]
    fn failing_sink_does_not_advance_cursor() {
        let mut audit = AuditLog::new(Some(Box::new(BrokenSink)), true, false);
        audit.record(&["folder", "failed"]);
        audit.record(&["folder", "failed"]);
        assert_eq!(audit.cursor(), 0);
    }

    #[test]
    fn mirror_module_is_audit_module() {
        assert_eq!(MIRROR_MODULE, "takeover::audit");
    }

    #[test]
    fn tsv_sink_appends_flattened_rows() -> AnyhowResult<()> {
        let dir = tempdir()?;
        let directory = Utf8PathBuf::try_from(dir.path().to_path_buf())?;
        let mut sink = TsvFileSink::new(&directory, "run-log");
        sink.append_row(&["t0".into(), "multi\nline".into(), "a\tb".into()])?;
        sink.append_row(&["t1".into(), "second".into()])?;
        assert_eq!(
            read_to_string(directory.join("run-log.tsv"))?,
            "t0\tmulti line\ta b\nt1\tsecond\n"
        );
        Ok(())
    }
}
