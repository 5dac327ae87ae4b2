use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use flexi_logger::{FlexiLoggerError, LogSpecification};
use takeover::audit::MIRROR_MODULE;

#[derive(Parser)]
#[command(about = "Takes over ownership of a storage tree by copying and archiving.", version)]
pub struct Args {
    /// Configuration file path.
    #[arg(name = "CONFIG_PATH")]
    pub config_path: Utf8PathBuf,

    /// Log file path. If left unspecified, the program will log to standard error.
    #[arg(long, name = "LOG_PATH")]
    pub log_path: Option<Utf8PathBuf>,

    /// Run flag file. If specified, the program will stop before the next unit of work as soon
    /// as this file does not exist.
    #[arg(long, name = "RUN_FLAG")]
    pub run_flag: Option<Utf8PathBuf>,

    /// Enable verbose output. Use once (-v) for logging level INFO and twice (-vv) for logging
    /// level DEBUG.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    pub fn log_specification(&self) -> LogSpecification {
        match self.verbose {
            2.. => LogSpecification::debug(),
            1 => LogSpecification::info(),
            _ => LogSpecification::warn(),
        }
    }

    /// Like `log_specification`, but mirrored audit rows pass at the default level too.
    pub fn log_specification_with_audit(&self) -> Result<LogSpecification, FlexiLoggerError> {
        match self.verbose {
            0 => LogSpecification::parse(format!("warn, {MIRROR_MODULE} = info")),
            _ => Ok(self.log_specification()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    fn audit_filter(specification: &LogSpecification) -> Option<LevelFilter> {
        specification
            .module_filters()
            .iter()
            .find(|filter| filter.module_name.as_deref() == Some(MIRROR_MODULE))
            .map(|filter| filter.level_filter)
    }

    #[test]
    fn audit_rows_pass_at_default_level() {
        let args = Args::parse_from(["takeover", "takeover.json"]);
        assert_eq!(audit_filter(&args.log_specification()), None);
        assert_eq!(
            audit_filter(&args.log_specification_with_audit().unwrap()),
            Some(LevelFilter::Info)
        );
    }

    #[test]
    fn verbose_specification_is_kept() {
        let args = Args::parse_from(["takeover", "takeover.json", "-vv"]);
        let specification = args.log_specification_with_audit().unwrap();
        assert_eq!(audit_filter(&specification), None);
        assert!(
            specification
                .module_filters()
                .iter()
                .any(|filter| filter.module_name.is_none()
                    && filter.level_filter == LevelFilter::Debug)
        );
    }
}
