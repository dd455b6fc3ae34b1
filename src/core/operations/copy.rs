use super::Session;
use crate::core::protocol::ymodem;
use crate::core::stream::{pump, ByteSink, ByteSource, LocalSink, LocalSource};
use crate::core::transport::Pipeline;
use crate::domain::error::XbeeResult;
use crate::domain::location::{resolve, DefaultField, Location, LocationArg};
use tracing::{debug, info};

impl Session {
    /// Copy a file between the local filesystem and a device, or between two
    /// devices. Returns the number of bytes copied.
    ///
    /// A device source reports its length before the target is opened, since
    /// a device target must be told the total size up front. Every pipeline
    /// opened here is closed before the outcome is returned.
    pub async fn copy(
        &self,
        source: impl Into<LocationArg>,
        target: impl Into<LocationArg>,
    ) -> XbeeResult<u64> {
        let source = resolve(source, DefaultField::Path);
        let mut target = resolve(target, DefaultField::Path);
        if target.path.as_deref().map_or(true, str::is_empty) {
            target.path = Some(ymodem::file_name(source.path_str()).to_string());
        }
        debug!("Copying {} to {}", source, target);

        let mut source_pipeline = None;
        let mut target_pipeline = None;
        let result = self
            .transfer(&source, &target, &mut source_pipeline, &mut target_pipeline)
            .await;

        for pipeline in [source_pipeline, target_pipeline].into_iter().flatten() {
            pipeline.close().await;
        }

        if let Ok(bytes) = &result {
            info!("Copied {} bytes from {} to {}", bytes, source, target);
        }
        result
    }

    async fn transfer<'p>(
        &self,
        source: &Location,
        target: &Location,
        source_slot: &'p mut Option<Pipeline>,
        target_slot: &'p mut Option<Pipeline>,
    ) -> XbeeResult<u64> {
        let (mut reader, length) = match source.device_name() {
            Some(device) => {
                let pipeline: &'p Pipeline = source_slot.insert(self.open_pipeline(device).await?);
                let reader = pipeline.open_read(source.path_str()).await?;
                let length = reader.length();
                let reader: Box<dyn ByteSource + 'p> = Box::new(reader);
                (reader, length)
            }
            None => {
                let (reader, length) = LocalSource::open(source.path_str()).await?;
                let reader: Box<dyn ByteSource + 'p> = Box::new(reader);
                (reader, length)
            }
        };

        let mut writer: Box<dyn ByteSink + 'p> = match target.device_name() {
            Some(device) => {
                let pipeline: &'p Pipeline = target_slot.insert(self.open_pipeline(device).await?);
                Box::new(pipeline.open_write(target.path_str(), length).await?)
            }
            None => Box::new(LocalSink::create(target.path_str()).await?),
        };

        pump(reader.as_mut(), writer.as_mut()).await
    }
}
