//! XBee CLI Library
//!
//! Copy, list and remove files on XBee modules over a serial line, run AT
//! commands and read device identifiers.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use domain::error::{XbeeError, XbeeResult};
pub use domain::config::XbeeConfig;
pub use domain::info::DeviceInfo;
pub use domain::location::{resolve, DefaultField, Location, LocationArg};
pub use core::operations::Session;
pub use core::transport::Pipeline;
