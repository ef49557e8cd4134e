//! ## Sets up logging by reading configuration from environment variables.
//!
//! Environment variables used:
//! - LOG_MODE: "stdout" (default) or "file"
//! - LOG_LEVEL: log level ("trace", "debug", "info", "warn", "error"); default is "info"
//! - LOG_DATA_DIR: when using file mode, the directory of the log file (default "./logs")
//! - LOG_MAX_SIZE: maximum size of one log file in bytes before rolling (default 1GB)

use chrono::Utc;
use log::info;
use simplelog::{Config, LevelFilter, SimpleLogger, WriteLogger};
use std::{
    env,
    fs::{create_dir_all, metadata, File, OpenOptions},
    path::Path,
};

/// Computes the path of the rolled log file given the base file path, the
/// date string, and a sequence index.
pub fn compute_rolled_file_path(base_file_path: &str, date_str: &str, index: u32) -> String {
    match base_file_path.strip_suffix(".log") {
        Some(trimmed) => format!("{trimmed}-{date_str}.{index}.log"),
        None => format!("{base_file_path}-{date_str}.{index}.log"),
    }
}

/// Walks the sequence indices until it finds a log file under `max_size`
/// bytes, starting from `file_path`. Returns the path to write to.
pub fn space_based_rolling(
    file_path: &str,
    base_file_path: &str,
    date_str: &str,
    max_size: u64,
) -> String {
    let mut final_path = file_path.to_string();
    let mut index = 1;
    while let Ok(metadata) = metadata(&final_path) {
        if metadata.len() > max_size {
            final_path = compute_rolled_file_path(base_file_path, date_str, index);
            index += 1;
        } else {
            break;
        }
    }
    final_path
}

/// Sets up logging by reading configuration from environment variables.
pub fn setup_logging() {
    let log_mode = env::var("LOG_MODE").unwrap_or_else(|_| "stdout".to_string());
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let level_filter = match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    if log_mode.to_lowercase() == "file" {
        let log_dir = if env::var("IN_DOCKER")
            .map(|val| val == "true")
            .unwrap_or(false)
        {
            "logs/".to_string()
        } else {
            env::var("LOG_DATA_DIR").unwrap_or_else(|_| "./logs".to_string())
        };
        let log_dir = format!("{}/", log_dir.trim_end_matches('/'));

        let date_str = Utc::now().format("%Y-%m-%d").to_string();
        let base_file_path = format!("{log_dir}draftpress.log");

        // Time-based rolling first, then roll again on size within the day.
        let time_based_path = compute_rolled_file_path(&base_file_path, &date_str, 1);

        if let Some(parent) = Path::new(&time_based_path).parent() {
            create_dir_all(parent).expect("Failed to create log directory");
        }

        let max_size: u64 = env::var("LOG_MAX_SIZE")
            .map(|s| {
                s.parse::<u64>()
                    .expect("LOG_MAX_SIZE must be a valid u64 if set")
            })
            .unwrap_or(1_073_741_824);

        let final_path =
            space_based_rolling(&time_based_path, &base_file_path, &date_str, max_size);

        let log_file = if Path::new(&final_path).exists() {
            OpenOptions::new()
                .append(true)
                .open(&final_path)
                .unwrap_or_else(|e| panic!("Unable to open log file {}: {}", final_path, e))
        } else {
            File::create(&final_path)
                .unwrap_or_else(|e| panic!("Unable to create log file {}: {}", final_path, e))
        };
        WriteLogger::init(level_filter, Config::default(), log_file)
            .expect("Failed to initialize file logger");
    } else {
        SimpleLogger::init(level_filter, Config::default())
            .expect("Failed to initialize simple logger");
    }

    info!("Logging is successfully configured (mode: {})", log_mode);
}
