use crate::domain::config::{FlowControlConfig, ParityConfig, SerialSettings};
use crate::domain::error::{XbeeError, XbeeResult};
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Byte-level duplex handle to a physical serial line.
///
/// Dropping the handle destroys it and releases the port.
pub trait SerialIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> SerialIo for T {}

/// Opens physical serial handles
#[async_trait]
pub trait PortOpener: Send + Sync {
    async fn open(&self, port: &str, settings: &SerialSettings) -> XbeeResult<Box<dyn SerialIo>>;
}

/// Opens real serial ports through the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

#[async_trait]
impl PortOpener for SystemPorts {
    async fn open(&self, port: &str, settings: &SerialSettings) -> XbeeResult<Box<dyn SerialIo>> {
        let builder = tokio_serial::new(port, settings.baud_rate)
            .data_bits(data_bits(port, settings.data_bits)?)
            .stop_bits(stop_bits(port, settings.stop_bits)?)
            .parity(match settings.parity {
                ParityConfig::None => tokio_serial::Parity::None,
                ParityConfig::Even => tokio_serial::Parity::Even,
                ParityConfig::Odd => tokio_serial::Parity::Odd,
            })
            .flow_control(match settings.flow_control {
                FlowControlConfig::None => tokio_serial::FlowControl::None,
                FlowControlConfig::Software => tokio_serial::FlowControl::Software,
                FlowControlConfig::Hardware => tokio_serial::FlowControl::Hardware,
            });

        let stream = builder
            .open_native_async()
            .map_err(|e| XbeeError::transport(port, format!("failed to open: {}", e)))?;

        info!("Opened serial port {} at {} baud", port, settings.baud_rate);
        Ok(Box::new(stream))
    }
}

fn data_bits(port: &str, bits: u8) -> XbeeResult<tokio_serial::DataBits> {
    match bits {
        5 => Ok(tokio_serial::DataBits::Five),
        6 => Ok(tokio_serial::DataBits::Six),
        7 => Ok(tokio_serial::DataBits::Seven),
        8 => Ok(tokio_serial::DataBits::Eight),
        _ => Err(XbeeError::transport(port, format!("invalid data bits: {}", bits))),
    }
}

fn stop_bits(port: &str, bits: u8) -> XbeeResult<tokio_serial::StopBits> {
    match bits {
        1 => Ok(tokio_serial::StopBits::One),
        2 => Ok(tokio_serial::StopBits::Two),
        _ => Err(XbeeError::transport(port, format!("invalid stop bits: {}", bits))),
    }
}

/// A serial port found on this machine
#[derive(Debug, Clone, Serialize)]
pub struct PortSummary {
    pub name: String,
    pub kind: String,
    pub description: String,
}

/// List serial ports known to the operating system
pub fn available_ports() -> XbeeResult<Vec<PortSummary>> {
    let ports = serialport::available_ports()
        .map_err(|e| XbeeError::transport("*", format!("failed to list serial ports: {}", e)))?;
    debug!("Found {} serial ports", ports.len());

    Ok(ports
        .into_iter()
        .map(|port| {
            let (kind, description) = match port.port_type {
                serialport::SerialPortType::UsbPort(usb) => (
                    "usb".to_string(),
                    format!(
                        "{:04x}:{:04x} {}",
                        usb.vid,
                        usb.pid,
                        usb.product.unwrap_or_default()
                    )
                    .trim_end()
                    .to_string(),
                ),
                serialport::SerialPortType::PciPort => ("pci".to_string(), String::new()),
                serialport::SerialPortType::BluetoothPort => {
                    ("bluetooth".to_string(), String::new())
                }
                serialport::SerialPortType::Unknown => ("unknown".to_string(), String::new()),
            };
            PortSummary {
                name: port.port_name,
                kind,
                description,
            }
        })
        .collect())
}
