//! Byte sources and sinks for streaming copies.
//!
//! A copy moves one chunk at a time: the next chunk is not pulled from the
//! source until the sink has accepted the previous one.

use crate::domain::error::XbeeResult;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const LOCAL_CHUNK_SIZE: usize = 8 * 1024;

/// Produces the bytes of a file
#[async_trait]
pub trait ByteSource: Send {
    /// Next chunk, or `None` once the source is exhausted
    async fn next_chunk(&mut self) -> XbeeResult<Option<Vec<u8>>>;
}

/// Consumes the bytes of a file
#[async_trait]
pub trait ByteSink: Send {
    async fn write_chunk(&mut self, chunk: &[u8]) -> XbeeResult<()>;

    /// Flush and complete the file
    async fn finish(&mut self) -> XbeeResult<()>;
}

/// Move every byte from `source` into `sink`. Returns the byte count.
pub async fn pump<R, W>(source: &mut R, sink: &mut W) -> XbeeResult<u64>
where
    R: ByteSource + ?Sized,
    W: ByteSink + ?Sized,
{
    let mut total = 0u64;
    while let Some(chunk) = source.next_chunk().await? {
        sink.write_chunk(&chunk).await?;
        total += chunk.len() as u64;
    }
    sink.finish().await?;
    Ok(total)
}

/// Reads a local file
pub struct LocalSource {
    file: File,
}

impl LocalSource {
    /// Open `path` and report its size
    pub async fn open(path: impl AsRef<Path>) -> XbeeResult<(Self, u64)> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        let length = tokio::fs::metadata(path).await?.len();
        Ok((Self { file }, length))
    }
}

#[async_trait]
impl ByteSource for LocalSource {
    async fn next_chunk(&mut self) -> XbeeResult<Option<Vec<u8>>> {
        let mut buf = vec![0u8; LOCAL_CHUNK_SIZE];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

/// Writes a local file, creating or truncating it
pub struct LocalSink {
    file: File,
}

impl LocalSink {
    pub async fn create(path: impl AsRef<Path>) -> XbeeResult<Self> {
        let file = File::create(path).await?;
        Ok(Self { file })
    }
}

#[async_trait]
impl ByteSink for LocalSink {
    async fn write_chunk(&mut self, chunk: &[u8]) -> XbeeResult<()> {
        self.file.write_all(chunk).await?;
        Ok(())
    }

    async fn finish(&mut self) -> XbeeResult<()> {
        self.file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::XbeeError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_copy() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.bin");
        let dst = dir.path().join("out.bin");
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src, &data).unwrap();

        let (mut source, length) = LocalSource::open(&src).await.unwrap();
        assert_eq!(length, data.len() as u64);

        let mut sink = LocalSink::create(&dst).await.unwrap();
        let copied = pump(&mut source, &mut sink).await.unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(std::fs::read(&dst).unwrap(), data);
    }

    #[tokio::test]
    async fn test_missing_source_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let result = LocalSource::open(dir.path().join("missing")).await;
        assert!(matches!(result, Err(XbeeError::Filesystem(_))));
    }

    struct FailingSink {
        accepted: usize,
    }

    #[async_trait]
    impl ByteSink for FailingSink {
        async fn write_chunk(&mut self, _chunk: &[u8]) -> XbeeResult<()> {
            self.accepted += 1;
            Err(XbeeError::protocol("sink rejected data"))
        }

        async fn finish(&mut self) -> XbeeResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_failure_stops_pump() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.bin");
        std::fs::write(&src, vec![1u8; 3 * LOCAL_CHUNK_SIZE]).unwrap();

        let (mut source, _) = LocalSource::open(&src).await.unwrap();
        let mut sink = FailingSink { accepted: 0 };
        let result = pump(&mut source, &mut sink).await;
        assert!(matches!(result, Err(XbeeError::Protocol(_))));
        assert_eq!(sink.accepted, 1);
    }
}
