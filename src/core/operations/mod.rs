//! Operations exposed to the command line.
//!
//! Every operation opens the pipelines it needs, runs, closes each pipeline
//! it opened and only then reports its outcome. Nothing is kept open between
//! operations.

pub mod command;
pub mod copy;
pub mod directory;
pub mod info;
pub mod tail;

use crate::core::transport::Pipeline;
use crate::domain::config::{ProtocolSettings, SerialSettings, XbeeConfig};
use crate::domain::error::XbeeResult;
use crate::infrastructure::serial::{PortOpener, SystemPorts};
use std::sync::Arc;

/// Serial opener and settings shared by the operations
#[derive(Clone)]
pub struct Session {
    opener: Arc<dyn PortOpener>,
    serial: SerialSettings,
    protocol: ProtocolSettings,
}

impl Session {
    pub fn new(opener: Arc<dyn PortOpener>, serial: SerialSettings, protocol: ProtocolSettings) -> Self {
        Self {
            opener,
            serial,
            protocol,
        }
    }

    /// Session over the machine's real serial ports
    pub fn system(config: &XbeeConfig) -> Self {
        Self::new(
            Arc::new(SystemPorts),
            config.serial.clone(),
            config.protocol.clone(),
        )
    }

    pub fn serial_settings(&self) -> &SerialSettings {
        &self.serial
    }

    pub fn protocol_settings(&self) -> &ProtocolSettings {
        &self.protocol
    }

    pub(crate) async fn open_pipeline(&self, port: &str) -> XbeeResult<Pipeline> {
        Pipeline::open(self.opener.as_ref(), port, &self.serial, &self.protocol).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("serial", &self.serial)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}
