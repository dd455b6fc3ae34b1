use super::Session;
use crate::domain::error::{XbeeError, XbeeResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

const RELAY_BUFFER: usize = 4096;

impl Session {
    /// Relay raw bytes from the serial line at `port` into `out` until the
    /// line closes. No command mode, no framing.
    pub async fn tail<W>(&self, port: &str, out: &mut W) -> XbeeResult<u64>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let mut handle = self.opener.open(port, &self.serial).await?;
        info!("Tailing {}", port);

        let received = relay_to_output(port, &mut handle, out).await?;
        drop(handle);

        debug!("Tail of {} ended after {} bytes", port, received);
        Ok(received)
    }

    /// Like [`Session::tail`], but also forwards `input` to the device.
    ///
    /// The operation ends when the device side closes; running out of input
    /// only stops forwarding.
    pub async fn tail_interactive<R, W>(
        &self,
        port: &str,
        input: &mut R,
        out: &mut W,
    ) -> XbeeResult<u64>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let handle = self.opener.open(port, &self.serial).await?;
        let (mut from_device, mut to_device) = tokio::io::split(handle);
        info!("Tailing {} (interactive)", port);

        let forward = async {
            let mut buf = vec![0u8; RELAY_BUFFER];
            let mut sent = 0u64;
            loop {
                let n = input.read(&mut buf).await.map_err(XbeeError::from)?;
                if n == 0 {
                    break;
                }
                to_device
                    .write_all(&buf[..n])
                    .await
                    .map_err(|e| XbeeError::transport(port, e))?;
                to_device
                    .flush()
                    .await
                    .map_err(|e| XbeeError::transport(port, e))?;
                sent += n as u64;
            }
            debug!("Input closed after {} bytes; still relaying {}", sent, port);
            std::future::pending::<XbeeResult<u64>>().await
        };

        let received = tokio::select! {
            received = relay_to_output(port, &mut from_device, out) => received?,
            failed = forward => failed?,
        };

        debug!("Tail of {} ended after {} bytes", port, received);
        Ok(received)
    }
}

/// Copy serial input to `out`. Read failures blame the serial line, write
/// failures blame the output.
async fn relay_to_output<R, W>(port: &str, from: &mut R, out: &mut W) -> XbeeResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; RELAY_BUFFER];
    let mut total = 0u64;
    loop {
        let n = from
            .read(&mut buf)
            .await
            .map_err(|e| XbeeError::transport(port, e))?;
        if n == 0 {
            return Ok(total);
        }
        out.write_all(&buf[..n]).await.map_err(output_error)?;
        out.flush().await.map_err(output_error)?;
        total += n as u64;
    }
}

fn output_error(err: std::io::Error) -> XbeeError {
    XbeeError::Output(format!("failed to write output: {}", err))
}
