use std::{env, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub const DEFAULT_PRINT_COMMAND: &str = "lp";
pub const DEFAULT_PRINT_TIMEOUT: Duration = Duration::from_secs(60);
/// Telegram Bot API refuses `getFile` above 20 MB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Transient storage
    pub download_dir: PathBuf,
    pub max_file_size: u64,

    // Print capability
    pub print_command: String,
    pub printer_name: Option<String>,
    pub print_options: Vec<String>,
    pub print_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Existing environment wins over `.env`.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = var("TELEGRAM_BOT_TOKEN")
            .or_else(|| var("BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let download_dir = var("DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));
        let max_file_size =
            parse_u64(&var, "MAX_FILE_SIZE_BYTES")?.unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let print_command =
            var("PRINT_COMMAND").unwrap_or_else(|| DEFAULT_PRINT_COMMAND.to_string());
        let printer_name = var("PRINTER_NAME");
        let print_options = var("PRINT_OPTIONS")
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let print_timeout = parse_u64(&var, "PRINT_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PRINT_TIMEOUT);
        if print_timeout.is_zero() {
            return Err(Error::Config("PRINT_TIMEOUT_MS must be positive".to_string()));
        }

        Ok(Self {
            telegram_bot_token,
            download_dir,
            max_file_size,
            print_command,
            printer_name,
            print_options,
            print_timeout,
        })
    }

    /// Arguments placed before the file path when invoking the print command.
    pub fn print_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(name) = &self.printer_name {
            args.push("-d".to_string());
            args.push(name.clone());
        }
        args.extend(self.print_options.iter().cloned());
        args
    }
}

fn parse_u64(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = var(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
