use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use log::{debug, warn};
use std::thread::{sleep, spawn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const RUN_FLAG_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The returned token is cancelled on CTRL+C or once the run flag file disappears. The
/// deadline treats a cancelled token like an exhausted budget, so the run stops between two
/// units of work.
pub fn start_termination_control(run_flag_file: Option<Utf8PathBuf>) -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let ctrlc_token = token.clone();
    ctrlc::set_handler(move || {
        warn!("CTRL+C received, stopping after the current file or folder");
        ctrlc_token.cancel()
    })
    .context("Failed to register signal handler for CTRL+C")?;
    if let Some(run_flag_file) = run_flag_file {
        if !run_flag_file.exists() {
            warn!("Run flag {run_flag_file} does not exist, the run will stop immediately");
        }
        watch_run_flag(run_flag_file, token.clone());
    }
    Ok(token)
}

fn watch_run_flag(file: Utf8PathBuf, token: CancellationToken) {
    spawn(move || {
        debug!("Watching run flag {file}");
        while file.exists() && !token.is_cancelled() {
            sleep(RUN_FLAG_POLL_INTERVAL);
        }
        debug!("Run flag {file} gone, requesting termination");
        token.cancel()
    });
}
