use super::Session;
use crate::core::transport::Pipeline;
use crate::domain::error::XbeeResult;
use crate::domain::info::DeviceInfo;
use tracing::debug;

/// Registers read for every port, in order
const INFO_REGISTERS: [&str; 3] = ["BL", "SH", "SL"];

impl Session {
    /// Read the Bluetooth address and serial number of each port, one port
    /// at a time, in input order.
    pub async fn info<I, P>(&self, ports: I) -> XbeeResult<Vec<DeviceInfo>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut records = Vec::new();
        for port in ports {
            let port = port.as_ref();
            let pipeline = self.open_pipeline(port).await?;
            let registers = read_registers(&pipeline).await;
            pipeline.close().await;

            let [bl, sh, sl] = registers?;
            debug!("{}: BL={} SH={} SL={}", port, bl, sh, sl);
            records.push(DeviceInfo::from_registers(port, &bl, &sh, &sl));
        }
        Ok(records)
    }
}

async fn read_registers(pipeline: &Pipeline) -> XbeeResult<[String; 3]> {
    let mut values: [String; 3] = Default::default();
    for (value, register) in values.iter_mut().zip(INFO_REGISTERS) {
        *value = pipeline
            .command(register, None)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
    }
    Ok(values)
}
