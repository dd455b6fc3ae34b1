use crate::core::protocol::{DeviceReader, DeviceStream, DeviceWriter};
use crate::core::stream::{ByteSink, ByteSource};
use crate::core::transport::exchange::{ExchangeGate, ExchangeState, ExchangeTicket};
use crate::domain::config::{ProtocolSettings, SerialSettings};
use crate::domain::error::{XbeeError, XbeeResult};
use crate::infrastructure::serial::PortOpener;
use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Link = DeviceStream<DuplexStream>;
type RelayResult = std::io::Result<(u64, u64)>;

/// A physical serial handle cross-wired with a device protocol stream.
///
/// The relay task owns the serial handle: protocol output is copied onto the
/// serial line and serial input is fed back to the protocol. Closing the
/// pipeline aborts the relay, which destroys the handle.
pub struct Pipeline {
    port: String,
    stream: Mutex<Link>,
    gate: ExchangeGate,
    relay: Option<JoinHandle<RelayResult>>,
}

impl Pipeline {
    /// Open `port` and start relaying between it and a fresh protocol stream
    pub async fn open(
        opener: &dyn PortOpener,
        port: &str,
        serial: &SerialSettings,
        protocol: &ProtocolSettings,
    ) -> XbeeResult<Self> {
        let mut handle = opener.open(port, serial).await?;
        let (near, mut far) = tokio::io::duplex(protocol.relay_buffer);

        let relay = tokio::spawn(async move {
            tokio::io::copy_bidirectional(&mut far, &mut handle).await
        });

        info!("Opened pipeline on {}", port);
        Ok(Self {
            port: port.to_string(),
            stream: Mutex::new(DeviceStream::new(near, protocol.clone())),
            gate: ExchangeGate::new(),
            relay: Some(relay),
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn state(&self) -> ExchangeState {
        self.gate.state()
    }

    /// Whether the relay has already stopped (handle closed or failed)
    pub fn is_relay_finished(&self) -> bool {
        self.relay.as_ref().map_or(true, |relay| relay.is_finished())
    }

    fn begin(&self) -> XbeeResult<ExchangeTicket<'_>> {
        self.gate.begin().ok_or_else(|| XbeeError::Busy {
            port: self.port.clone(),
        })
    }

    /// One command/response exchange. See [`DeviceStream::command`].
    pub async fn command(&self, text: &str, terminator: Option<&str>) -> XbeeResult<Vec<String>> {
        let _ticket = self.begin()?;
        let mut stream = self.stream.lock().await;
        stream.command(text, terminator).await
    }

    /// Open a device file for reading. The pipeline stays busy until the
    /// returned reader is dropped.
    pub async fn open_read(&self, path: &str) -> XbeeResult<PipelineReader<'_>> {
        let ticket = self.begin()?;
        let stream = self.stream.lock().await;
        let inner = DeviceReader::open(stream, path).await?;
        Ok(PipelineReader {
            inner,
            _ticket: ticket,
        })
    }

    /// Open a device file for writing `length` bytes. The pipeline stays
    /// busy until the returned writer is dropped.
    pub async fn open_write(&self, path: &str, length: u64) -> XbeeResult<PipelineWriter<'_>> {
        let ticket = self.begin()?;
        let stream = self.stream.lock().await;
        let inner = DeviceWriter::open(stream, path, length).await?;
        Ok(PipelineWriter {
            inner,
            _ticket: ticket,
        })
    }

    /// Destroy the serial handle and drain the relay.
    ///
    /// Aborting the relay mid-copy is expected to end it with an error or a
    /// cancellation; that outcome is logged and discarded.
    pub async fn close(mut self) {
        if let Some(relay) = self.relay.take() {
            relay.abort();
            match relay.await {
                Ok(Ok((sent, received))) => {
                    debug!("Relay on {} finished ({} bytes out, {} in)", self.port, sent, received)
                }
                Ok(Err(e)) => debug!("Relay on {} ended during teardown: {}", self.port, e),
                Err(e) if e.is_cancelled() => debug!("Relay on {} cancelled", self.port),
                Err(e) => warn!("Relay task on {} failed: {}", self.port, e),
            }
        }
        info!("Closed pipeline on {}", self.port);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(relay) = self.relay.take() {
            warn!("Pipeline on {} dropped without close; aborting relay", self.port);
            relay.abort();
        }
    }
}

/// Device file opened for reading through a [`Pipeline`]
pub struct PipelineReader<'a> {
    inner: DeviceReader<MutexGuard<'a, Link>>,
    _ticket: ExchangeTicket<'a>,
}

impl PipelineReader<'_> {
    pub fn length(&self) -> u64 {
        self.inner.length()
    }
}

#[async_trait]
impl ByteSource for PipelineReader<'_> {
    async fn next_chunk(&mut self) -> XbeeResult<Option<Vec<u8>>> {
        self.inner.next_chunk().await
    }
}

/// Device file opened for writing through a [`Pipeline`]
pub struct PipelineWriter<'a> {
    inner: DeviceWriter<MutexGuard<'a, Link>>,
    _ticket: ExchangeTicket<'a>,
}

impl PipelineWriter<'_> {
    pub fn length(&self) -> u64 {
        self.inner.length()
    }
}

#[async_trait]
impl ByteSink for PipelineWriter<'_> {
    async fn write_chunk(&mut self, chunk: &[u8]) -> XbeeResult<()> {
        self.inner.write_chunk(chunk).await
    }

    async fn finish(&mut self) -> XbeeResult<()> {
        self.inner.finish().await
    }
}
