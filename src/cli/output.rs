use crate::cli::args::OutputFormat;
use crate::domain::config::XbeeConfig;
use crate::domain::info::DeviceInfo;
use crate::infrastructure::serial::PortSummary;
use serde_json;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_lines(&self, lines: &[String]) -> Result<(), OutputError>;
    fn write_info(&self, records: &[DeviceInfo]) -> Result<(), OutputError>;
    fn write_ports(&self, ports: &[PortSummary]) -> Result<(), OutputError>;
    fn write_config(&self, config: &XbeeConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::XbeeError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn print(&self, rendered: String) {
        if !rendered.is_empty() {
            println!("{}", rendered);
        }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_lines(&self, lines: &[String]) -> Result<(), OutputError> {
        self.print(render_lines(self.format, lines)?);
        Ok(())
    }

    fn write_info(&self, records: &[DeviceInfo]) -> Result<(), OutputError> {
        self.print(render_info(self.format, records)?);
        Ok(())
    }

    fn write_ports(&self, ports: &[PortSummary]) -> Result<(), OutputError> {
        self.print(render_ports(self.format, ports)?);
        Ok(())
    }

    fn write_config(&self, config: &XbeeConfig) -> Result<(), OutputError> {
        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(config)?,
            _ => toml::to_string_pretty(config)?.trim_end().to_string(),
        };
        self.print(rendered);
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// Response lines or directory entries, one per line
pub fn render_lines(format: OutputFormat, lines: &[String]) -> Result<String, OutputError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(lines)?,
        OutputFormat::Csv => lines.iter().map(|line| csv_field(line)).collect::<Vec<_>>().join("\n"),
        OutputFormat::Text | OutputFormat::Table => lines.join("\n"),
    })
}

/// Device info records. Nothing is rendered for an empty list outside JSON.
pub fn render_info(format: OutputFormat, records: &[DeviceInfo]) -> Result<String, OutputError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(records)?,
        _ if records.is_empty() => String::new(),
        OutputFormat::Csv => {
            let mut csv = "Serial Port,Bluetooth,XBee".to_string();
            for record in records {
                csv.push_str(&format!(
                    "\n{},{},{}",
                    csv_field(&record.port),
                    csv_field(&record.bluetooth),
                    csv_field(&record.xbee)
                ));
            }
            csv
        }
        OutputFormat::Text | OutputFormat::Table => {
            let table_data: Vec<InfoTableRow> = records.iter().map(InfoTableRow::from).collect();
            Table::new(table_data).to_string()
        }
    })
}

pub fn render_ports(format: OutputFormat, ports: &[PortSummary]) -> Result<String, OutputError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(ports)?,
        OutputFormat::Text => ports
            .iter()
            .map(|port| port.name.clone())
            .collect::<Vec<_>>()
            .join("\n"),
        _ if ports.is_empty() => String::new(),
        OutputFormat::Table => {
            let table_data: Vec<PortTableRow> = ports.iter().map(PortTableRow::from).collect();
            Table::new(table_data).to_string()
        }
        OutputFormat::Csv => {
            let mut csv = "name,type,description".to_string();
            for port in ports {
                csv.push_str(&format!(
                    "\n{},{},{}",
                    csv_field(&port.name),
                    csv_field(&port.kind),
                    csv_field(&port.description)
                ));
            }
            csv
        }
    })
}

/// Quote a CSV field when it contains a separator, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Table row for device info
#[derive(Tabled)]
struct InfoTableRow {
    #[tabled(rename = "Serial Port")]
    port: String,
    #[tabled(rename = "Bluetooth")]
    bluetooth: String,
    #[tabled(rename = "XBee")]
    xbee: String,
}

impl From<&DeviceInfo> for InfoTableRow {
    fn from(record: &DeviceInfo) -> Self {
        Self {
            port: record.port.clone(),
            bluetooth: record.bluetooth.clone(),
            xbee: record.xbee.clone(),
        }
    }
}

/// Table row for serial ports
#[derive(Tabled)]
struct PortTableRow {
    name: String,
    r#type: String,
    description: String,
}

impl From<&PortSummary> for PortTableRow {
    fn from(port: &PortSummary) -> Self {
        Self {
            name: port.name.clone(),
            r#type: port.kind.clone(),
            description: port.description.clone(),
        }
    }
}
