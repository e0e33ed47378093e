//! Command line settings

use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;

pub const DEFAULT_MQTT_HOST: &str = "localhost";
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const KEEP_ALIVE: Duration = Duration::from_secs(10);

const fn default_client_id() -> &'static str {
    "bc-workroom-led-strip"
}

/// Log verbosity (maps to `log::LevelFilter`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "bc-workroom-led-strip", version)]
#[command(about = "Color an LED strip from temperature and humidity read over MQTT")]
#[command(disable_help_flag = true)]
pub struct Args {
    /// MQTT broker host
    #[arg(short = 'h', long, default_value = DEFAULT_MQTT_HOST)]
    pub host: String,

    /// MQTT broker port
    #[arg(short, long, default_value_t = DEFAULT_MQTT_PORT)]
    pub port: u16,

    /// MQTT client identifier
    #[arg(long, default_value = default_client_id())]
    pub client_id: String,

    /// Print debug messages (same as --log-level debug)
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Log verbosity
    #[arg(long, value_enum, default_value_t)]
    pub log_level: LogLevel,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Args {
    /// Effective log level, with `--debug` taking precedence
    #[must_use]
    pub const fn level_filter(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            self.log_level.as_level_filter()
        }
    }
}
