//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// UDP Events - align soft events from a remote clock with a sampled data stream
#[derive(Parser, Debug)]
#[command(
    name = "udp-events",
    author,
    version,
    about = "Align UDP soft events with a locally sampled data stream",
    long_about = "Receives timestamped TTL and text messages over UDP, pairs sync pulses \n\
                  seen by both clocks, and places every message at the matching local \n\
                  sample number of the selected data stream."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "UDP_EVENTS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "UDP_EVENTS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a session against a simulated acquisition clock
    Run(RunArgs),

    /// Validate a settings file without running
    Validate(ValidateArgs),

    /// Send test sync, text and TTL messages and print the acknowledgements
    Send(SendArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to settings file (TOML or JSON); defaults are used when omitted
    #[arg(short, long, env = "UDP_EVENTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override listen host from settings
    #[arg(long, env = "UDP_EVENTS_HOST")]
    pub host: Option<String>,

    /// Override listen port from settings
    #[arg(long, env = "UDP_EVENTS_PORT")]
    pub port: Option<u16>,

    /// Sample rate of the simulated stream (Hz)
    #[arg(long, default_value = "30000", env = "UDP_EVENTS_SAMPLE_RATE")]
    pub sample_rate: f64,

    /// Samples per processing block
    #[arg(long, default_value = "1024")]
    pub block_size: u64,

    /// Seconds between simulated local sync pulses (0 = none)
    #[arg(long, default_value = "1.0")]
    pub pulse_interval: f64,

    /// Stop after this many ticks (0 = unlimited)
    #[arg(long, default_value = "0", env = "UDP_EVENTS_MAX_TICKS")]
    pub max_ticks: u64,

    /// Session timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "UDP_EVENTS_TIMEOUT")]
    pub timeout: u64,

    /// Validate settings and exit without starting a session
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "UDP_EVENTS_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to settings file to validate
    #[arg(short, long, default_value = "udp-events.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `send` command
#[derive(Parser, Debug, Clone)]
pub struct SendArgs {
    /// Listener address
    #[arg(long, default_value = "127.0.0.1:12345")]
    pub target: SocketAddr,

    /// Local address to bind for acknowledgements
    #[arg(long, default_value = "127.0.0.1:0")]
    pub bind: SocketAddr,

    /// Line used for sync messages
    #[arg(long, default_value = "0")]
    pub sync_line: u8,

    /// Line used for the extra on/off TTL pair
    #[arg(long, default_value = "1")]
    pub extra_line: u8,

    /// Number of message groups to send
    #[arg(long, default_value = "10")]
    pub rounds: u32,

    /// Milliseconds between message groups
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Text sent in each group
    #[arg(long, default_value = "hello from udp-events send")]
    pub text: String,

    /// How long to wait for each acknowledgement (ms)
    #[arg(long, default_value = "1000")]
    pub ack_timeout_ms: u64,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
