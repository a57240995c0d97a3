use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use crate::config::General;
use crate::errors::LoggingError;

const LOG_PATTERN: &str = "{d(%Y%m%d %H:%M:%S)} {l} {M}({L}) {m}{n}";

/// Sets up log4rs with a console and/or file appender according to configuration
///
/// # Arguments
///
/// * 'general' - general configuration holding log path, level and stdout flag
/// * 'verbose' - forces debug level regardless of configured level
pub fn setup_logger(general: &General, verbose: bool) -> Result<Handle, LoggingError> {
    let level = if verbose { LevelFilter::Debug } else { general.log_level };
    let config = build_config(general, level)?;

    Ok(log4rs::init_config(config)?)
}

fn build_config(general: &General, level: LevelFilter) -> Result<Config, LoggingError> {
    let mut builder = Config::builder();
    let mut root = Root::builder();

    if general.log_to_stdout {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
        root = root.appender("stdout");
    }

    if let Some(path) = &general.log_path {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(path)?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    Ok(builder.build(root.build(level))?)
}
