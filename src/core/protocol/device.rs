use crate::core::protocol::ymodem::{self, CAN};
use crate::domain::config::ProtocolSettings;
use crate::domain::error::{XbeeError, XbeeResult};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tracing::{debug, trace};

const ESCAPE_SEQUENCE: &[u8] = b"+++";
const LINE_END: u8 = b'\r';
const ERROR_RESPONSE: &str = "ERROR";

/// Command/file protocol spoken by an XBee 3 in command mode.
///
/// AT commands are sent as `AT<command>\r` and answered with `\r`-terminated
/// lines. File transfers use YMODEM (see [`DeviceReader`](super::DeviceReader)
/// and [`DeviceWriter`](super::DeviceWriter)).
pub struct DeviceStream<L> {
    link: BufStream<L>,
    settings: ProtocolSettings,
    command_mode: bool,
}

impl<L> DeviceStream<L>
where
    L: AsyncRead + AsyncWrite + Send + Unpin,
{
    pub fn new(link: L, settings: ProtocolSettings) -> Self {
        Self {
            link: BufStream::new(link),
            settings,
            command_mode: false,
        }
    }

    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    /// Run one AT command.
    ///
    /// Without a terminator the response is a single line. With one, lines
    /// are collected until a line equal to the terminator arrives; `Some("")`
    /// therefore reads up to the first blank line. The terminator line itself
    /// is not returned.
    pub async fn command(&mut self, text: &str, terminator: Option<&str>) -> XbeeResult<Vec<String>> {
        self.send_command(text).await?;

        let lines = match terminator {
            None => vec![self.read_line().await?],
            Some(terminator) => {
                let mut lines = Vec::new();
                loop {
                    let line = self.read_line().await?;
                    if line == terminator {
                        break;
                    }
                    lines.push(line);
                }
                lines
            }
        };

        if lines.len() == 1 && lines[0] == ERROR_RESPONSE {
            return Err(XbeeError::protocol(format!("device rejected 'AT{}'", text)));
        }

        debug!("AT{} -> {} line(s)", text, lines.len());
        Ok(lines)
    }

    /// Send `AT<text>\r` without waiting for a response.
    pub(crate) async fn send_command(&mut self, text: &str) -> XbeeResult<()> {
        self.ensure_command_mode().await?;
        debug!("Sending AT{}", text);

        let mut frame = Vec::with_capacity(text.len() + 3);
        frame.extend_from_slice(b"AT");
        frame.extend_from_slice(text.as_bytes());
        frame.push(LINE_END);
        self.write_all(&frame).await
    }

    async fn ensure_command_mode(&mut self) -> XbeeResult<()> {
        if self.command_mode {
            return Ok(());
        }

        let guard = self.settings.guard_time();
        tokio::time::sleep(guard).await;
        self.write_all(ESCAPE_SEQUENCE).await?;
        tokio::time::sleep(guard).await;

        let reply = self.read_line().await?;
        if reply != "OK" {
            return Err(XbeeError::protocol(format!(
                "device did not enter command mode (got '{}')",
                reply
            )));
        }

        debug!("Entered command mode");
        self.command_mode = true;
        Ok(())
    }

    /// Read one `\r`-terminated line. Line feeds are dropped.
    pub(crate) async fn read_line(&mut self) -> XbeeResult<String> {
        let mut line = Vec::new();
        loop {
            match self.read_byte().await? {
                LINE_END => break,
                b'\n' => continue,
                byte => line.push(byte),
            }
        }

        let line = String::from_utf8_lossy(&line).into_owned();
        trace!("<- {:?}", line);
        Ok(line)
    }

    pub(crate) async fn read_byte(&mut self) -> XbeeResult<u8> {
        self.link.read_u8().await.map_err(link_error)
    }

    /// Read one byte, or `None` if nothing arrives within `wait`.
    pub(crate) async fn read_byte_within(&mut self, wait: Duration) -> XbeeResult<Option<u8>> {
        match tokio::time::timeout(wait, self.link.read_u8()).await {
            Ok(result) => result.map(Some).map_err(link_error),
            Err(_) => Ok(None),
        }
    }

    pub(crate) async fn read_exact(&mut self, buf: &mut [u8]) -> XbeeResult<()> {
        self.link.read_exact(buf).await.map_err(link_error)?;
        Ok(())
    }

    pub(crate) async fn write_all(&mut self, data: &[u8]) -> XbeeResult<()> {
        self.link.write_all(data).await.map_err(link_error)?;
        self.link.flush().await.map_err(link_error)
    }

    /// After a first CAN, a second one confirms the device aborted the transfer.
    pub(crate) async fn confirm_cancel(&mut self) -> XbeeResult<()> {
        match self.read_byte_within(self.settings.ymodem_poll()).await? {
            Some(CAN) => Err(XbeeError::protocol("transfer cancelled by device")),
            _ => Ok(()),
        }
    }

    pub(crate) fn log_block(&self, direction: &str, block: &[u8]) {
        if block.len() >= 3 {
            trace!("{} block header {}", direction, hex::encode(&block[..3]));
        }
    }
}

fn link_error(err: std::io::Error) -> XbeeError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            XbeeError::protocol("link closed before the response was complete")
        }
        _ => XbeeError::protocol(format!("link failure: {}", err)),
    }
}

/// Whether a byte can start a YMODEM block
pub(crate) fn is_block_start(byte: u8) -> bool {
    ymodem::block_size(byte).is_some()
}
