use super::Session;
use crate::domain::error::XbeeResult;
use crate::domain::location::{resolve, DefaultField, Location, LocationArg};
use tracing::debug;

impl Session {
    /// List a directory.
    ///
    /// A bare argument names a port, so `"/dev/ttyUSB0"` lists the device's
    /// current directory and `"/dev/ttyUSB0:/flash"` lists `/flash`. Device
    /// listings are returned exactly as the device prints them.
    pub async fn list(&self, source: impl Into<LocationArg>) -> XbeeResult<Vec<String>> {
        let source = resolve(source, DefaultField::Device);

        match source.device_name() {
            Some(device) => self.command(device, &list_command(&source), Some("")).await,
            None => list_local(source.path_str()).await,
        }
    }

    /// Remove a file or empty directory, on the device or locally.
    pub async fn remove(&self, source: impl Into<LocationArg>) -> XbeeResult<()> {
        let source = resolve(source, DefaultField::Path);

        match source.device_name() {
            Some(device) => {
                self.command(device, &format!("FS RM {}", source.path_str()), None)
                    .await?;
            }
            None => remove_local(source.path_str()).await?,
        }
        Ok(())
    }
}

fn list_command(source: &Location) -> String {
    match source.path.as_deref().filter(|path| !path.is_empty()) {
        Some(path) => format!("FS LS {}", path),
        None => "FS LS".to_string(),
    }
}

async fn list_local(path: &str) -> XbeeResult<Vec<String>> {
    let path = if path.is_empty() { "." } else { path };
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(path).await?;
    while let Some(entry) = dir.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();
    Ok(entries)
}

async fn remove_local(path: &str) -> XbeeResult<()> {
    let metadata = tokio::fs::symlink_metadata(path).await?;
    if metadata.is_dir() {
        debug!("Removing local directory {}", path);
        tokio::fs::remove_dir(path).await?;
    } else {
        debug!("Removing local file {}", path);
        tokio::fs::remove_file(path).await?;
    }
    Ok(())
}
