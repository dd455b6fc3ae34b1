use serde::{Deserialize, Serialize};

/// Width of the Bluetooth MAC address column
pub const BLUETOOTH_WIDTH: usize = 12;
/// Width of each half (SH, SL) of the 64-bit XBee serial number
pub const SERIAL_HALF_WIDTH: usize = 8;

/// Identifiers read from one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "Serial Port")]
    pub port: String,
    /// `BL` register, zero-padded
    #[serde(rename = "Bluetooth")]
    pub bluetooth: String,
    /// `SH` + `SL` registers, each zero-padded
    #[serde(rename = "XBee")]
    pub xbee: String,
}

impl DeviceInfo {
    pub fn from_registers(port: &str, bl: &str, sh: &str, sl: &str) -> Self {
        Self {
            port: port.to_string(),
            bluetooth: zero_pad(bl, BLUETOOTH_WIDTH),
            xbee: format!(
                "{}{}",
                zero_pad(sh, SERIAL_HALF_WIDTH),
                zero_pad(sl, SERIAL_HALF_WIDTH)
            ),
        }
    }
}

/// Left-pad with `0` to `width` characters. Longer values are kept whole.
pub fn zero_pad(value: &str, width: usize) -> String {
    format!("{:0>width$}", value, width = width)
}
