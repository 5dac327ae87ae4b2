use camino::Utf8PathBuf;
use flexi_logger::{
    Age, Cleanup, Criterion, DeferredNow, Duplicate, FileSpec, FlexiLoggerError,
    LogSpecification, Logger, LoggerHandle, Naming, Record,
};
use log::error;
use std::fmt::Debug;
use takeover::audit::TIMESTAMP_FORMAT;

fn format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "[{}] {:<5} {}: {}",
        now.now_utc_owned().format(TIMESTAMP_FORMAT),
        record.level(),
        record.module_path().unwrap_or("<unnamed>"),
        &record.args()
    )
}

/// Logs to stderr, or to a daily rotated file if a path is given. File logging still
/// duplicates warnings and errors to stderr so an operator watching the run sees cut-offs
/// and failures.
pub fn init(
    specification: LogSpecification,
    path: Option<Utf8PathBuf>,
) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::with(specification).format(format);
    match path {
        Some(path) => logger
            .log_to_file(FileSpec::try_from(path)?)
            .duplicate_to_stderr(Duplicate::Warn)
            .rotate(
                Criterion::Age(Age::Day),
                Naming::Numbers,
                Cleanup::KeepLogFiles(14),
            ),
        None => logger.log_to_stderr(),
    }
    .start()
}

pub fn log_and_return_error<T>(error: T) -> T
where
    T: Debug,
{
    error!("{error:?}");
    error
}
