use std::io::{self, Read};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use tracing::debug;

const READ_BUFFER: usize = 4096;

/// Async reader over a blocking source such as stdin.
///
/// Reads happen on a dedicated thread that is never joined, so a read that
/// blocks forever does not hold up runtime shutdown. The thread exits at
/// EOF, on a read error, or on its next read after the reader is dropped.
pub struct BlockingReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl BlockingReader {
    /// Start reading `source` on its own thread
    pub fn spawn<R>(mut source: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let mut buf = [0u8; READ_BUFFER];
            loop {
                match source.read(&mut buf) {
                    Ok(0) => {
                        debug!("Input reached EOF");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("Input read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Self {
            rx,
            pending: Vec::new(),
        }
    }

    /// Reader over the process's standard input
    pub fn stdin() -> Self {
        Self::spawn(io::stdin())
    }
}

impl AsyncRead for BlockingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.pending.is_empty() {
            match ready!(self.rx.poll_recv(cx)) {
                Some(chunk) => self.pending = chunk,
                None => return Poll::Ready(Ok(())),
            }
        }

        let n = self.pending.len().min(buf.remaining());
        buf.put_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Poll::Ready(Ok(()))
    }
}
