//!
//! Documentation of the config module.
//! Sets up the 'config' and 'logger'.
//!

extern crate confy;

use serde::{Serialize, Deserialize};
use std::default::Default;

/// Name of the config file read at startup
pub const CONFIG_FILE: &str = "ridepool.toml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConfyConfig {
    /// Also print the log to stdout
    pub print_log: bool,
    /// The log file
    pub log_file: String,
    /// The JSON document the entity store loads and persists
    pub data_file: String,
}

///Config check
impl Default for ConfyConfig {
    fn default() -> Self {
        ConfyConfig {
            print_log: false,
            log_file: "output.log".to_string(),
            data_file: "data.json".to_string(),
        }
    }
}

/// Initialize config and load, a missing or broken file falls back to the defaults
pub fn init() -> Result<ConfyConfig, confy::ConfyError> {
    let cfg: ConfyConfig = confy::load_path(CONFIG_FILE).unwrap_or_default();
    Ok(cfg)
}

/// Sets up logger
pub fn setup_logger(file: &ConfyConfig) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        // rocket's own request chatter stays out of the file
        .level_for("rocket", log::LevelFilter::Warn)
        .level_for("_", log::LevelFilter::Warn);

    if file.print_log {
        dispatch = dispatch.chain(std::io::stdout());
    }

    dispatch
        .chain(fern::log_file(&file.log_file)?)
        .apply()?;

    Ok(())
}
