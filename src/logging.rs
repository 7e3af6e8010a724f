// src/logging.rs
use crate::errors::ConfigError;
use log::LevelFilter;
use std::path::Path;

/// File logger for the terminal UI, which owns stdout/stderr while it runs.
pub fn init_file_logging(path: &Path, level: LevelFilter) -> Result<(), ConfigError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .chain(fern::log_file(path).map_err(fern::InitError::Io)?)
        .apply()?;
    Ok(())
}

/// Stderr logger for one-shot commands.
pub fn init_stderr_logging(level: LevelFilter) -> Result<(), ConfigError> {
    env_logger::Builder::new()
        .filter_level(level)
        .filter_module("reqwest", LevelFilter::Warn)
        .format_timestamp_millis()
        .try_init()?;
    Ok(())
}
