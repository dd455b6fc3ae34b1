//! YMODEM block format.
//!
//! Blocks are `[SOH|STX] seq !seq data[128|1024] crc_hi crc_lo` with
//! CRC-16/XMODEM over the data. Block 0 carries `name NUL length ...`.

use crate::domain::error::{XbeeError, XbeeResult};

pub const SOH: u8 = 0x01;
pub const STX: u8 = 0x02;
pub const EOT: u8 = 0x04;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;
pub const CAN: u8 = 0x18;
/// Receiver request for CRC mode
pub const CRC_REQUEST: u8 = b'C';
/// Padding for the final partial data block
pub const PAD: u8 = 0x1A;

pub const SHORT_BLOCK: usize = 128;
pub const LONG_BLOCK: usize = 1024;

/// CRC-16/XMODEM (poly 0x1021, init 0)
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Payload size announced by a block start byte
pub fn block_size(start: u8) -> Option<usize> {
    match start {
        SOH => Some(SHORT_BLOCK),
        STX => Some(LONG_BLOCK),
        _ => None,
    }
}

/// Encode a block, padding `data` up to the smallest block size that fits.
pub fn encode_block(seq: u8, data: &[u8], pad: u8) -> Vec<u8> {
    let size = if data.len() <= SHORT_BLOCK {
        SHORT_BLOCK
    } else {
        LONG_BLOCK
    };
    debug_assert!(data.len() <= LONG_BLOCK);

    let mut payload = Vec::with_capacity(size);
    payload.extend_from_slice(data);
    payload.resize(size, pad);

    let crc = crc16(&payload);
    let mut block = Vec::with_capacity(size + 5);
    block.push(if size == SHORT_BLOCK { SOH } else { STX });
    block.push(seq);
    block.push(!seq);
    block.extend_from_slice(&payload);
    block.extend_from_slice(&crc.to_be_bytes());
    block
}

/// Check the sequence complement and CRC of a received block body
/// (everything after the start byte).
pub fn verify_block(seq: u8, seq_complement: u8, payload: &[u8], crc: [u8; 2]) -> bool {
    seq ^ seq_complement == 0xFF && crc16(payload) == u16::from_be_bytes(crc)
}

/// Block 0 payload: `name NUL length NUL`. Fails if it does not fit in a
/// single long block.
pub fn header_payload(name: &str, length: u64) -> XbeeResult<Vec<u8>> {
    let length = length.to_string();
    if name.len() + length.len() + 2 > LONG_BLOCK {
        return Err(XbeeError::protocol(format!(
            "file name is too long for a transfer header ({} bytes)",
            name.len()
        )));
    }

    let mut payload = Vec::with_capacity(SHORT_BLOCK);
    payload.extend_from_slice(name.as_bytes());
    payload.push(0);
    payload.extend_from_slice(length.as_bytes());
    payload.push(0);
    Ok(payload)
}

/// Metadata announced in block 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub name: String,
    pub length: u64,
}

/// Parse block 0. Returns `None` for the empty block that ends a batch.
pub fn parse_header(payload: &[u8]) -> XbeeResult<Option<FileHeader>> {
    let name_end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    if name_end == 0 {
        return Ok(None);
    }
    let name = String::from_utf8_lossy(&payload[..name_end]).into_owned();

    let rest = payload.get(name_end + 1..).unwrap_or_default();
    let digits: Vec<u8> = rest
        .iter()
        .copied()
        .take_while(|b| b.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(XbeeError::protocol(format!(
            "file header for '{}' carries no length",
            name
        )));
    }
    let length = std::str::from_utf8(&digits)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| XbeeError::protocol(format!("invalid length in header for '{}'", name)))?;

    Ok(Some(FileHeader { name, length }))
}

/// Last component of a device path, used as the YMODEM file name
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').find(|part| !part.is_empty()).unwrap_or(path)
}
