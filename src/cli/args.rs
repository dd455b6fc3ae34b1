use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for xbee
#[derive(Parser, Debug)]
#[command(
    name = "xbee",
    version = env!("CARGO_PKG_VERSION"),
    about = "File transfer and AT commands for XBee modules over serial",
    long_about = "Copy, list and remove files on XBee modules, run AT commands, read device identifiers and tail serial output.\n\nPaths take the form PORT:PATH for files on a device (e.g. /dev/ttyUSB0:/flash/main.py) and plain PATH for local files."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Baud rate, overriding the configured value
    #[arg(long, global = true)]
    pub baud: Option<u32>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy source file to target
    #[command(
        after_help = "Examples:\n  xbee cp test.txt /dev/ttyUSB0:/flash/test.txt\n  xbee cp /dev/ttyUSB0:/flash/test.txt test.txt"
    )]
    Cp {
        /// Source file with optional serial port path
        source: String,
        /// Target file with optional serial port path
        target: String,
    },
    /// List files in source directory
    #[command(after_help = "Example:\n  xbee ls /dev/ttyUSB0:/flash")]
    Ls {
        /// Serial port path with optional source directory
        source: String,
    },
    /// Remove source file or empty directory
    #[command(after_help = "Example:\n  xbee rm /dev/ttyUSB0:/flash/test.txt")]
    Rm {
        /// Source file with optional serial port path
        source: String,
    },
    /// Execute AT command on device
    #[command(
        after_help = "Examples:\n  xbee at /dev/ttyUSB0 SH\n  xbee at /dev/ttyUSB0 \"FS LS\" --terminator \"\""
    )]
    At {
        /// Serial port path
        path: String,
        /// AT command to execute, without the AT prefix
        cmd: String,
        /// Collect response lines until one equals this value
        #[arg(short, long)]
        terminator: Option<String>,
    },
    /// Show device information
    Info {
        /// Serial port paths
        paths: Vec<String>,
    },
    /// Tail serial output from device
    Tail {
        /// Serial port path
        path: String,
        /// Also forward console input to the device
        #[arg(short, long)]
        interactive: bool,
    },
    /// List available serial ports
    Ports,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
    /// CSV output
    Csv,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Create default configuration
    Init {
        /// Directory to create .xbee/config.toml in
        #[arg(long)]
        dir: Option<String>,
        /// Global configuration
        #[arg(short, long)]
        global: bool,
    },
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
