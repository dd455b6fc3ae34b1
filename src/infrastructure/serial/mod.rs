// Serial module - Physical serial handles
pub mod port;

pub use port::{available_ports, PortOpener, PortSummary, SerialIo, SystemPorts};
