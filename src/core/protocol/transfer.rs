use crate::core::protocol::device::{is_block_start, DeviceStream};
use crate::core::protocol::ymodem::{
    self, ACK, CAN, CRC_REQUEST, EOT, LONG_BLOCK, NAK, PAD, SHORT_BLOCK,
};
use crate::core::stream::{ByteSink, ByteSource};
use crate::domain::error::{XbeeError, XbeeResult};
use async_trait::async_trait;
use std::ops::DerefMut;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// What the sender put on the wire next
enum Incoming {
    Block { seq: u8, payload: Vec<u8> },
    EndOfTransmission,
}

/// Receive side of `FS GET`: streams a device file.
///
/// The file length comes from the YMODEM header and is known as soon as
/// [`DeviceReader::open`] returns, before any data is read.
pub struct DeviceReader<S> {
    stream: S,
    path: String,
    length: u64,
    remaining: u64,
    expected_seq: u8,
    started: bool,
    done: bool,
}

impl<S, L> DeviceReader<S>
where
    S: DerefMut<Target = DeviceStream<L>> + Send,
    L: AsyncRead + AsyncWrite + Send + Unpin,
{
    pub async fn open(mut stream: S, path: &str) -> XbeeResult<Self> {
        stream.send_command(&format!("FS GET {}", path)).await?;

        let header = match receive(&mut *stream, 0, true).await? {
            Incoming::Block { seq: 0, payload } => ymodem::parse_header(&payload)?,
            Incoming::Block { seq, .. } => {
                return Err(XbeeError::protocol(format!(
                    "expected file header, got block {}",
                    seq
                )))
            }
            Incoming::EndOfTransmission => None,
        };
        let header = header.ok_or_else(|| {
            XbeeError::protocol(format!("device sent no file for '{}'", path))
        })?;
        stream.write_all(&[ACK]).await?;

        debug!("Receiving '{}' ({} bytes)", header.name, header.length);
        Ok(Self {
            stream,
            path: path.to_string(),
            length: header.length,
            remaining: header.length,
            expected_seq: 1,
            started: false,
            done: false,
        })
    }

    /// Declared file length in bytes
    pub fn length(&self) -> u64 {
        self.length
    }

    async fn finish_batch(&mut self) -> XbeeResult<()> {
        self.stream.write_all(&[ACK]).await?;
        match receive(&mut *self.stream, 0, true).await? {
            Incoming::Block { seq: 0, payload } => {
                if ymodem::parse_header(&payload)?.is_some() {
                    warn!("Device offered a second file; ignoring it");
                    self.stream.write_all(&[CAN, CAN]).await?;
                    return Ok(());
                }
                self.stream.write_all(&[ACK]).await
            }
            _ => Err(XbeeError::protocol("missing end-of-batch header")),
        }
    }
}

#[async_trait]
impl<S, L> ByteSource for DeviceReader<S>
where
    S: DerefMut<Target = DeviceStream<L>> + Send,
    L: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn next_chunk(&mut self) -> XbeeResult<Option<Vec<u8>>> {
        loop {
            if self.done {
                return Ok(None);
            }

            let poll = !self.started;
            self.started = true;
            match receive(&mut *self.stream, self.expected_seq, poll).await? {
                Incoming::EndOfTransmission => {
                    self.finish_batch().await?;
                    self.done = true;
                    if self.remaining > 0 {
                        return Err(XbeeError::protocol(format!(
                            "'{}' ended {} bytes short of {}",
                            self.path, self.remaining, self.length
                        )));
                    }
                    info!("Received '{}' ({} bytes)", self.path, self.length);
                    return Ok(None);
                }
                Incoming::Block { seq, mut payload } if seq == self.expected_seq => {
                    self.stream.write_all(&[ACK]).await?;
                    self.expected_seq = self.expected_seq.wrapping_add(1);

                    let take = payload
                        .len()
                        .min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
                    self.remaining -= take as u64;
                    if take == 0 {
                        continue;
                    }
                    payload.truncate(take);
                    return Ok(Some(payload));
                }
                Incoming::Block { seq, .. } if seq == self.expected_seq.wrapping_sub(1) => {
                    debug!("Duplicate block {}, acknowledging again", seq);
                    self.stream.write_all(&[ACK]).await?;
                }
                Incoming::Block { seq, .. } => {
                    self.stream.write_all(&[CAN, CAN]).await?;
                    return Err(XbeeError::protocol(format!(
                        "block {} out of sequence (expected {})",
                        seq, self.expected_seq
                    )));
                }
            }
        }
    }
}

/// Wait for the next block or EOT, NAKing damaged blocks.
///
/// With `poll` set the receiver has not started yet: `C` is sent on each
/// attempt and any text the device prints before the first block is skipped.
/// Otherwise a NAK is sent only after a silent interval.
async fn receive<L>(
    stream: &mut DeviceStream<L>,
    expected_seq: u8,
    poll: bool,
) -> XbeeResult<Incoming>
where
    L: AsyncRead + AsyncWrite + Send + Unpin,
{
    let retries = stream.settings().ymodem_retries;
    let wait = stream.settings().ymodem_poll();
    let mut banner = Vec::new();
    let mut attempts = 0u32;
    let mut request = poll;

    while attempts < retries {
        if request {
            stream
                .write_all(&[if poll { CRC_REQUEST } else { NAK }])
                .await?;
            request = false;
        }

        let start = match stream.read_byte_within(wait).await? {
            None => {
                attempts += 1;
                request = true;
                continue;
            }
            Some(byte) => byte,
        };

        match start {
            EOT => return Ok(Incoming::EndOfTransmission),
            CAN => {
                stream.confirm_cancel().await?;
                continue;
            }
            byte if is_block_start(byte) => {
                let size = ymodem::block_size(byte).unwrap_or(SHORT_BLOCK);
                let mut body = vec![0u8; size + 4];
                stream.read_exact(&mut body).await?;

                let (seq, seq_complement) = (body[0], body[1]);
                let payload = &body[2..2 + size];
                let crc = [body[2 + size], body[3 + size]];
                stream.log_block("<-", &[byte, seq, seq_complement]);

                if ymodem::verify_block(seq, seq_complement, payload, crc) {
                    return Ok(Incoming::Block {
                        seq,
                        payload: payload.to_vec(),
                    });
                }

                warn!("Damaged block (expected {}), requesting resend", expected_seq);
                attempts += 1;
                stream.write_all(&[NAK]).await?;
            }
            other if poll => banner.push(other),
            other => debug!("Ignoring stray byte 0x{:02x}", other),
        }
    }

    let banner = String::from_utf8_lossy(&banner).trim().to_string();
    if banner.is_empty() {
        Err(XbeeError::protocol(format!(
            "no block {} after {} attempts",
            expected_seq, retries
        )))
    } else {
        Err(XbeeError::protocol(format!(
            "device did not start the transfer: {}",
            banner
        )))
    }
}

/// Send side of `FS PUT`: streams data into a device file.
///
/// The total length is announced in the YMODEM header, so it must be known
/// before the stream is opened and the bytes written must match it exactly.
pub struct DeviceWriter<S> {
    stream: S,
    path: String,
    length: u64,
    written: u64,
    pending: Vec<u8>,
    seq: u8,
    finished: bool,
}

impl<S, L> DeviceWriter<S>
where
    S: DerefMut<Target = DeviceStream<L>> + Send,
    L: AsyncRead + AsyncWrite + Send + Unpin,
{
    pub async fn open(mut stream: S, path: &str, length: u64) -> XbeeResult<Self> {
        if length == 0 {
            return Err(XbeeError::protocol(format!(
                "refusing to open '{}' for writing without a transfer length",
                path
            )));
        }

        let header = ymodem::header_payload(ymodem::file_name(path), length)?;
        stream.send_command(&format!("FS PUT {}", path)).await?;
        wait_for_receiver(&mut *stream).await?;

        send_block(&mut *stream, 0, &header, 0).await?;
        wait_for_receiver(&mut *stream).await?;

        debug!("Sending '{}' ({} bytes)", path, length);
        Ok(Self {
            stream,
            path: path.to_string(),
            length,
            written: 0,
            pending: Vec::with_capacity(LONG_BLOCK),
            seq: 1,
            finished: false,
        })
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    async fn flush_block(&mut self, count: usize) -> XbeeResult<()> {
        let block: Vec<u8> = self.pending.drain(..count).collect();
        send_block(&mut *self.stream, self.seq, &block, PAD).await?;
        self.seq = self.seq.wrapping_add(1);
        Ok(())
    }
}

#[async_trait]
impl<S, L> ByteSink for DeviceWriter<S>
where
    S: DerefMut<Target = DeviceStream<L>> + Send,
    L: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn write_chunk(&mut self, chunk: &[u8]) -> XbeeResult<()> {
        self.written += chunk.len() as u64;
        if self.written > self.length {
            return Err(XbeeError::protocol(format!(
                "'{}' received more than the declared {} bytes",
                self.path, self.length
            )));
        }

        self.pending.extend_from_slice(chunk);
        while self.pending.len() >= LONG_BLOCK {
            self.flush_block(LONG_BLOCK).await?;
        }
        Ok(())
    }

    async fn finish(&mut self) -> XbeeResult<()> {
        if self.finished {
            return Ok(());
        }
        if self.written < self.length {
            return Err(XbeeError::protocol(format!(
                "'{}' got {} of the declared {} bytes",
                self.path, self.written, self.length
            )));
        }

        if !self.pending.is_empty() {
            let count = self.pending.len();
            self.flush_block(count).await?;
        }

        send_end_of_transmission(&mut *self.stream).await?;
        wait_for_receiver(&mut *self.stream).await?;
        send_block(&mut *self.stream, 0, &[], 0).await?;

        self.finished = true;
        info!("Sent '{}' ({} bytes)", self.path, self.length);
        Ok(())
    }
}

/// Wait for the receiver's `C`, skipping any text the device prints first.
///
/// Only a `C` at the start of a line counts; banner lines may contain the
/// letter themselves.
async fn wait_for_receiver<L>(stream: &mut DeviceStream<L>) -> XbeeResult<()>
where
    L: AsyncRead + AsyncWrite + Send + Unpin,
{
    let retries = stream.settings().ymodem_retries;
    let wait = stream.settings().ymodem_poll();
    let mut banner = Vec::new();
    let mut line_start = true;
    let mut attempts = 0u32;

    while attempts < retries {
        match stream.read_byte_within(wait).await? {
            None => attempts += 1,
            Some(CRC_REQUEST) if line_start => return Ok(()),
            Some(CAN) => stream.confirm_cancel().await?,
            Some(byte) => {
                line_start = byte == b'\r' || byte == b'\n';
                banner.push(byte);
            }
        }
    }

    let banner = String::from_utf8_lossy(&banner).trim().to_string();
    Err(XbeeError::protocol(if banner.is_empty() {
        "device is not ready to receive".to_string()
    } else {
        format!("device is not ready to receive: {}", banner)
    }))
}

async fn send_block<L>(
    stream: &mut DeviceStream<L>,
    seq: u8,
    data: &[u8],
    pad: u8,
) -> XbeeResult<()>
where
    L: AsyncRead + AsyncWrite + Send + Unpin,
{
    let block = ymodem::encode_block(seq, data, pad);
    let retries = stream.settings().ymodem_retries;
    let wait = stream.settings().ymodem_poll();

    for attempt in 0..retries {
        if attempt > 0 {
            warn!("Resending block {} (attempt {})", seq, attempt + 1);
        }
        stream.log_block("->", &block);
        stream.write_all(&block).await?;

        loop {
            match stream.read_byte_within(wait).await? {
                Some(ACK) => return Ok(()),
                Some(NAK) | None => break,
                Some(CAN) => stream.confirm_cancel().await?,
                Some(other) => debug!("Ignoring 0x{:02x} while waiting for ACK", other),
            }
        }
    }

    Err(XbeeError::protocol(format!(
        "block {} not acknowledged after {} attempts",
        seq, retries
    )))
}

async fn send_end_of_transmission<L>(stream: &mut DeviceStream<L>) -> XbeeResult<()>
where
    L: AsyncRead + AsyncWrite + Send + Unpin,
{
    let retries = stream.settings().ymodem_retries;
    let wait = stream.settings().ymodem_poll();

    for _ in 0..retries {
        stream.write_all(&[EOT]).await?;
        loop {
            match stream.read_byte_within(wait).await? {
                Some(ACK) => return Ok(()),
                Some(NAK) | None => break,
                Some(CAN) => stream.confirm_cancel().await?,
                Some(_) => {}
            }
        }
    }

    Err(XbeeError::protocol("end of transmission not acknowledged"))
}
