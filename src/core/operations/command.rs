use super::Session;
use crate::domain::error::XbeeResult;

impl Session {
    /// Run one AT command on the device at `port` and return its response
    /// lines.
    ///
    /// `None` reads a single response line; `Some(terminator)` collects lines
    /// until one equals the terminator (`Some("")`: until a blank line).
    pub async fn command(
        &self,
        port: &str,
        text: &str,
        terminator: Option<&str>,
    ) -> XbeeResult<Vec<String>> {
        let pipeline = self.open_pipeline(port).await?;
        let result = pipeline.command(text, terminator).await;
        pipeline.close().await;
        result
    }
}
