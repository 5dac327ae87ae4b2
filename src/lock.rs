use anyhow::{Context, Result as AnyhowResult, bail};
use camino::{Utf8Path, Utf8PathBuf};
use fs4::fs_std::FileExt;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;

/// Guards a storage snapshot against concurrent runs through an exclusive lock on a sibling
/// `.lock` file.
#[derive(Clone)]
pub struct Locker {
    lock_path: Utf8PathBuf,
    cancellation_token: CancellationToken,
}

pub struct Lock(File);

impl Locker {
    pub fn new(guarded_path: impl AsRef<Utf8Path>, cancellation_token: &CancellationToken) -> Self {
        Self {
            lock_path: Utf8PathBuf::from(format!("{}.lock", guarded_path.as_ref())),
            cancellation_token: cancellation_token.clone(),
        }
    }

    pub fn wait_for_write_lock(&self) -> AnyhowResult<Lock> {
        debug!("Waiting for write lock on {}", self.lock_path);
        let file = self.file()?;
        let file = with_cancellation(
            || file.lock_exclusive().map(|_| file),
            &self.cancellation_token,
        )
        .context(format!("Failed to acquire write lock on {}", self.lock_path))?;
        debug!("Got write lock");
        Ok(Lock(file))
    }

    fn file(&self) -> AnyhowResult<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .context(format!(
                "Failed to open {} for creating lock",
                self.lock_path,
            ))
    }
}

#[tokio::main]
async fn with_cancellation<F>(lock: F, cancellation_token: &CancellationToken) -> AnyhowResult<File>
where
    F: FnOnce() -> io::Result<File> + Send + 'static,
{
    tokio::select! {
        file = spawn_blocking(lock) => { Ok(file??) }
        _ = cancellation_token.cancelled() => { bail!("Terminated") }
    }
}

impl Lock {
    pub fn release(self) -> AnyhowResult<()> {
        FileExt::unlock(&self.0).context("Failed to release lock")
    }
}
