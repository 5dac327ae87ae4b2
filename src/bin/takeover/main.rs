mod cli;
mod internal_config;
mod logging;
mod termination;

use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use log::{info, warn};
use logging::log_and_return_error;
use std::fs::create_dir_all;
use takeover::lock::Locker;
use takeover::migration;
use takeover::results::WriteSection;
use takeover::snapshot;

fn main() -> AnyhowResult<()> {
    run().map_err(log_and_return_error)?;
    Ok(())
}

fn run() -> AnyhowResult<()> {
    let args = cli::Args::parse();
    let logger = logging::init(args.log_specification(), args.log_path.clone())?;
    info!("Program started and logging set up");

    let external_config =
        takeover::config::load(&args.config_path).context("Configuration loading failed")?;
    info!("Configuration loaded");
    if external_config
        .audit_log
        .as_ref()
        .is_some_and(|audit_log| audit_log.mirror_to_diagnostics)
    {
        logger.set_new_spec(
            args.log_specification_with_audit()
                .context("Invalid log specification")?,
        );
    }

    let cancellation_token = termination::start_termination_control(args.run_flag)
        .context("Failed to set up termination control")?;
    info!("Termination control set up");

    let global_config = internal_config::from_external_config(external_config, cancellation_token);

    if let Some(directory) = global_config.audit_directory() {
        if let Err(error) = create_dir_all(directory) {
            warn!("Audit log directory {directory} unavailable, audit rows will be dropped: {error}");
        }
    }

    let lock = Locker::new(
        &global_config.snapshot_path,
        &global_config.cancellation_token,
    )
    .wait_for_write_lock()
    .context("Another run holds the snapshot")?;
    let mut storage =
        snapshot::load(&global_config.snapshot_path).context("Snapshot loading failed")?;
    info!("Snapshot loaded");

    let mut context = global_config.run_context();
    let outcome = migration::run(&mut context, &mut storage);
    // Mutations committed before a failure must survive it.
    snapshot::save(&storage, &global_config.snapshot_path).context("Snapshot saving failed")?;
    lock.release()?;
    let report = outcome?;

    if let Some(results_path) = &global_config.results_path {
        report
            .write(results_path)
            .context("Writing run report failed")?;
    }
    if report.cut_short {
        warn!(
            "Run cut short after {}s, run again to continue",
            report.runtime_secs
        );
    } else {
        info!("Run completed in {}s", report.runtime_secs);
    }
    Ok(())
}
