use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{LevelFilter, SetLoggerError};
use log4rs::append::file::FileAppender;
use log4rs::config::runtime::ConfigErrors;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use serde::Deserialize;
use thiserror::Error;

#[derive(Deserialize, Debug, Clone)]
pub struct LogSettings {
    pub log_path: String,
    pub log_level: String,
    pub log_file_name: String,
    pub log_overwrite: bool,
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log file or directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("logger configuration: {0}")]
    Config(#[from] ConfigErrors),
    #[error("logger already set: {0}")]
    Init(#[from] SetLoggerError),
}

pub fn setup_logging(log_level: &str, log_file_path: PathBuf) -> Result<Config, LogError> {
    let log_level = get_logging_level(log_level);
    let log_file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y.%m.%d %H:%M:%S)} | {({l}):5.5} | {({f}:{L}):>40.40} | {m}{n}",
        )))
        .build(log_file_path)?;

    Ok(Config::builder()
        .appender(Appender::builder().build("x", Box::new(log_file)))
        .build(Root::builder().appender("x").build(log_level))?)
}

fn get_logging_level(log_level: &str) -> LevelFilter {
    match log_level {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Where the log of a run goes. An existing file is either removed or left alone, in which
/// case the new log gets a timestamp suffix.
pub fn log_file_path(
    config_path: &Path,
    log_settings: &LogSettings,
    scenario_id: Option<u32>,
) -> Result<PathBuf, LogError> {
    let log_path = config_path.join(&log_settings.log_path);
    let log_path = match scenario_id {
        Some(val) => log_path.join(val.to_string()).join("logs"),
        None => log_path.join("logs"),
    };
    if !log_path.exists() {
        fs::create_dir_all(&log_path)?;
    }

    let log_file_path = log_path.join(&log_settings.log_file_name);
    if !log_file_path.exists() {
        return Ok(log_file_path);
    }
    if log_settings.log_overwrite {
        fs::remove_file(&log_file_path)?;
        return Ok(log_file_path);
    }

    let stamp = Utc::now().format("_%d%m%Y_%H%M%S").to_string();
    let stem = log_settings
        .log_file_name
        .split('.')
        .next()
        .unwrap_or("vsteer");
    Ok(log_path.join(format!("{}{}.log", stem, stamp)))
}

pub fn initiate_logger(
    config_path: &Path,
    log_settings: &LogSettings,
    scenario_id: Option<u32>,
) -> Result<(), LogError> {
    let log_file_path = log_file_path(config_path, log_settings, scenario_id)?;
    let logger_config = setup_logging(&log_settings.log_level, log_file_path)?;
    log4rs::init_config(logger_config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(overwrite: bool) -> LogSettings {
        LogSettings {
            log_path: "output".to_string(),
            log_level: "debug".to_string(),
            log_file_name: "vsteer.log".to_string(),
            log_overwrite: overwrite,
        }
    }

    #[test]
    fn existing_log_is_kept_unless_overwritten() {
        let base = std::env::temp_dir().join(format!("vsteer-log-{}", std::process::id()));
        let first = log_file_path(&base, &settings(false), Some(3)).expect("path");
        assert!(first.ends_with("output/3/logs/vsteer.log"));
        fs::write(&first, "old").expect("write");

        let renamed = log_file_path(&base, &settings(false), Some(3)).expect("path");
        assert_ne!(renamed, first);
        assert!(first.exists());

        let replaced = log_file_path(&base, &settings(true), Some(3)).expect("path");
        assert_eq!(replaced, first);
        assert!(!first.exists());
        fs::remove_dir_all(&base).expect("cleanup");
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(get_logging_level("loud"), LevelFilter::Info);
        assert_eq!(get_logging_level("trace"), LevelFilter::Trace);
    }
}
