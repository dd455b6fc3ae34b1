use serde::{Deserialize, Serialize};
use std::time::Duration;

/// XBee tool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XbeeConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Serial line settings used for every port opened
    #[serde(default)]
    pub serial: SerialSettings,
    /// Device protocol tuning
    #[serde(default)]
    pub protocol: ProtocolSettings,
}

/// Global configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Serial line configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSettings {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: ParityConfig,
    #[serde(default)]
    pub flow_control: FlowControlConfig,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    #[default]
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    #[default]
    None,
    Hardware,
    Software,
}

/// Timing and retry settings for command mode and YMODEM transfers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Silence required around the `+++` escape sequence
    #[serde(default = "default_guard_time")]
    pub guard_time_ms: u64,
    /// Attempts per YMODEM block before giving up
    #[serde(default = "default_ymodem_retries")]
    pub ymodem_retries: u32,
    /// Interval between `C` polls while waiting for a sender
    #[serde(default = "default_ymodem_poll")]
    pub ymodem_poll_ms: u64,
    /// Buffer size of the in-memory pipe between protocol and relay
    #[serde(default = "default_relay_buffer")]
    pub relay_buffer: usize,
}

pub const DEFAULT_BAUD_RATE: u32 = 9600;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_guard_time() -> u64 {
    1000
}

fn default_ymodem_retries() -> u32 {
    10
}

fn default_ymodem_poll() -> u64 {
    1000
}

fn default_relay_buffer() -> usize {
    4096
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: ParityConfig::default(),
            flow_control: FlowControlConfig::default(),
        }
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            guard_time_ms: default_guard_time(),
            ymodem_retries: default_ymodem_retries(),
            ymodem_poll_ms: default_ymodem_poll(),
            relay_buffer: default_relay_buffer(),
        }
    }
}

impl SerialSettings {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

impl ProtocolSettings {
    pub fn guard_time(&self) -> Duration {
        Duration::from_millis(self.guard_time_ms)
    }

    pub fn ymodem_poll(&self) -> Duration {
        Duration::from_millis(self.ymodem_poll_ms)
    }
}
