//! Scripted XBee device and counting port opener shared by the integration
//! tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use xbee_cli::core::protocol::ymodem::{self, ACK, CAN, CRC_REQUEST, EOT, PAD};
use xbee_cli::domain::config::{ProtocolSettings, SerialSettings};
use xbee_cli::infrastructure::serial::{PortOpener, SerialIo};
use xbee_cli::{Session, XbeeError, XbeeResult};

/// Protocol settings that keep tests fast
pub fn fast_settings() -> ProtocolSettings {
    ProtocolSettings {
        guard_time_ms: 0,
        ymodem_retries: 3,
        ymodem_poll_ms: 50,
        ..ProtocolSettings::default()
    }
}

/// Something the fake device observed, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command(String),
    Responded(String),
    /// A command arrived before the previous response was written
    Overlap(String),
    PutHeader { name: String, length: u64 },
    PutBlock { seq: u8 },
    PutComplete { path: String, length: u64 },
    GetComplete { path: String },
}

/// State of one fake XBee, shared by every connection to it
#[derive(Clone, Default)]
pub struct FakeXbee {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    registers: Arc<Mutex<HashMap<String, String>>>,
    events: Arc<Mutex<Vec<Event>>>,
    cancel_put_at_block: Option<u8>,
}

impl FakeXbee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.files.lock().unwrap().insert(path.to_string(), data.to_vec());
        self
    }

    pub fn with_register(self, name: &str, value: &str) -> Self {
        self.registers
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Cancel uploads when data block `seq` arrives
    pub fn cancelling_put_at(mut self, seq: u8) -> Self {
        self.cancel_put_at_block = Some(seq);
        self
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Command(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    /// Serve one connection until the host hangs up
    pub async fn serve(self, mut link: DuplexStream) {
        let mut escape = [0u8; 3];
        if link.read_exact(&mut escape).await.is_err() || &escape != b"+++" {
            return;
        }
        if link.write_all(b"OK\r").await.is_err() {
            return;
        }

        while let Some(line) = read_line(&mut link).await {
            let Some(command) = line.strip_prefix("AT").map(str::to_string) else {
                continue;
            };
            self.record(Event::Command(command.clone()));

            let served = if let Some(path) = command.strip_prefix("FS GET ") {
                self.send_file(&mut link, path).await
            } else if let Some(path) = command.strip_prefix("FS PUT ") {
                self.receive_file(&mut link, path).await
            } else {
                self.respond(&mut link, &command).await
            };
            if served.is_none() {
                return;
            }
        }
    }

    async fn respond(&self, link: &mut DuplexStream, command: &str) -> Option<()> {
        let lines = self.answer(command);

        // Give an eager host the chance to send the next command early
        let mut early = [0u8; 1];
        if let Ok(Ok(1)) = tokio::time::timeout(Duration::from_millis(20), link.read(&mut early)).await {
            self.record(Event::Overlap(command.to_string()));
        }

        for line in lines {
            link.write_all(line.as_bytes()).await.ok()?;
            link.write_all(b"\r").await.ok()?;
        }
        self.record(Event::Responded(command.to_string()));
        Some(())
    }

    fn answer(&self, command: &str) -> Vec<String> {
        if command == "FS LS" || command.starts_with("FS LS ") {
            let dir = command.strip_prefix("FS LS").unwrap_or_default().trim();
            let prefix = if dir.is_empty() || dir.ends_with('/') {
                dir.to_string()
            } else {
                format!("{}/", dir)
            };
            let mut lines: Vec<String> = self
                .files
                .lock()
                .unwrap()
                .keys()
                .filter_map(|path| path.strip_prefix(prefix.as_str()))
                .filter(|name| !name.contains('/'))
                .map(str::to_string)
                .collect();
            lines.push(String::new());
            return lines;
        }

        if let Some(path) = command.strip_prefix("FS RM ") {
            let removed = self.files.lock().unwrap().remove(path).is_some();
            return vec![if removed { "OK" } else { "ERROR" }.to_string()];
        }

        match self.registers.lock().unwrap().get(command) {
            Some(value) => vec![value.clone()],
            None => vec!["ERROR".to_string()],
        }
    }

    /// YMODEM sender side of `FS GET`
    async fn send_file(&self, link: &mut DuplexStream, path: &str) -> Option<()> {
        let Some(data) = self.file(path) else {
            link.write_all(b"ERROR\r").await.ok()?;
            return Some(());
        };

        expect_byte(link, CRC_REQUEST).await?;
        let header = ymodem::header_payload(ymodem::file_name(path), data.len() as u64).ok()?;
        link.write_all(&ymodem::encode_block(0, &header, 0)).await.ok()?;
        expect_byte(link, ACK).await?;

        expect_byte(link, CRC_REQUEST).await?;
        for (index, chunk) in data.chunks(ymodem::LONG_BLOCK).enumerate() {
            let seq = (index + 1) as u8;
            link.write_all(&ymodem::encode_block(seq, chunk, PAD)).await.ok()?;
            expect_byte(link, ACK).await?;
        }

        link.write_all(&[EOT]).await.ok()?;
        expect_byte(link, ACK).await?;
        expect_byte(link, CRC_REQUEST).await?;
        link.write_all(&ymodem::encode_block(0, &[], 0)).await.ok()?;
        expect_byte(link, ACK).await?;

        self.record(Event::GetComplete {
            path: path.to_string(),
        });
        Some(())
    }

    /// YMODEM receiver side of `FS PUT`
    async fn receive_file(&self, link: &mut DuplexStream, path: &str) -> Option<()> {
        link.write_all(b"Receiving file\r\n").await.ok()?;
        link.write_all(&[CRC_REQUEST]).await.ok()?;

        let (_, header) = read_block(link).await?;
        let header = ymodem::parse_header(&header).ok()??;
        self.record(Event::PutHeader {
            name: header.name.clone(),
            length: header.length,
        });
        link.write_all(&[ACK, CRC_REQUEST]).await.ok()?;

        let mut data = Vec::new();
        loop {
            let start = link.read_u8().await.ok()?;
            if start == EOT {
                link.write_all(&[ACK, CRC_REQUEST]).await.ok()?;
                let (seq, _) = read_block(link).await?;
                if seq != 0 {
                    return None;
                }
                link.write_all(&[ACK]).await.ok()?;
                break;
            }

            let (seq, payload) = read_block_body(link, start).await?;
            self.record(Event::PutBlock { seq });
            if self.cancel_put_at_block == Some(seq) {
                link.write_all(&[CAN, CAN]).await.ok()?;
                return Some(());
            }
            data.extend_from_slice(&payload);
            link.write_all(&[ACK]).await.ok()?;
        }

        let length = usize::try_from(header.length).ok()?;
        data.truncate(length);
        self.files.lock().unwrap().insert(path.to_string(), data);
        self.record(Event::PutComplete {
            path: path.to_string(),
            length: header.length,
        });
        Some(())
    }
}

async fn read_line(link: &mut DuplexStream) -> Option<String> {
    let mut line = Vec::new();
    loop {
        match link.read_u8().await.ok()? {
            b'\r' => return Some(String::from_utf8_lossy(&line).into_owned()),
            byte => line.push(byte),
        }
    }
}

async fn expect_byte(link: &mut DuplexStream, expected: u8) -> Option<()> {
    (link.read_u8().await.ok()? == expected).then_some(())
}

async fn read_block(link: &mut DuplexStream) -> Option<(u8, Vec<u8>)> {
    let start = link.read_u8().await.ok()?;
    read_block_body(link, start).await
}

async fn read_block_body(link: &mut DuplexStream, start: u8) -> Option<(u8, Vec<u8>)> {
    let size = ymodem::block_size(start)?;
    let mut body = vec![0u8; size + 4];
    link.read_exact(&mut body).await.ok()?;

    let crc = [body[2 + size], body[3 + size]];
    if !ymodem::verify_block(body[0], body[1], &body[2..2 + size], crc) {
        return None;
    }
    Some((body[0], body[2..2 + size].to_vec()))
}

/// Serial handle that counts its own destruction
pub struct CountedHandle {
    inner: DuplexStream,
    destroyed: Arc<AtomicUsize>,
}

impl Drop for CountedHandle {
    fn drop(&mut self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

impl AsyncRead for CountedHandle {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for CountedHandle {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Connects port names to fake devices and counts opened and destroyed
/// handles
#[derive(Clone, Default)]
pub struct CountingOpener {
    devices: Arc<Mutex<HashMap<String, FakeXbee>>>,
    opened: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
    baud_rates: Arc<Mutex<Vec<u32>>>,
}

impl CountingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, port: &str, device: FakeXbee) -> &Self {
        self.devices.lock().unwrap().insert(port.to_string(), device);
        self
    }

    pub fn session(&self) -> Session {
        Session::new(
            Arc::new(self.clone()),
            SerialSettings::default(),
            fast_settings(),
        )
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn baud_rates(&self) -> Vec<u32> {
        self.baud_rates.lock().unwrap().clone()
    }

    /// Wait for dropped relays to release their handles
    pub async fn settled(&self) {
        for _ in 0..100 {
            if self.destroyed() == self.opened() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl PortOpener for CountingOpener {
    async fn open(&self, port: &str, settings: &SerialSettings) -> XbeeResult<Box<dyn SerialIo>> {
        let device = self
            .devices
            .lock()
            .unwrap()
            .get(port)
            .cloned()
            .ok_or_else(|| XbeeError::transport(port, "No such file or directory"))?;

        let (host, far) = tokio::io::duplex(8192);
        tokio::spawn(device.serve(far));

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.baud_rates.lock().unwrap().push(settings.baud_rate);
        Ok(Box::new(CountedHandle {
            inner: host,
            destroyed: self.destroyed.clone(),
        }))
    }
}
