// Protocol module - XBee command mode and YMODEM file transfer
pub mod device;
pub mod transfer;
pub mod ymodem;

pub use device::DeviceStream;
pub use transfer::{DeviceReader, DeviceWriter};
