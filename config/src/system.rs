//! The `system` namespace blob.
//!
//! ## Layout (version 1, 44 bytes)
//!
//! - `0x00` version byte + magic bytes (4 bytes)
//! - `0x04` station identifier, NUL-padded UTF-8 (16 bytes)
//! - `0x14` device identifier, NUL-padded UTF-8 (16 bytes)
//! - `0x24` sleep interval in seconds, u32 LE (4 bytes)
//! - `0x28` payload strategy code (1 byte)
//! - `0x29` reserved (3 bytes)

use fieldnode_common::payload::{PayloadStrategy, StationId};

use crate::{check_header, write_header, ConfigError};

pub const SYSTEM_BLOB_LEN: usize = 44;

/// How long the node sleeps between cycles when unconfigured.
pub const DEFAULT_SLEEP_SECONDS: u32 = 30;
pub const DEFAULT_STATION_ID: &str = "ST001";
pub const DEFAULT_DEVICE_ID: &str = "DEV01";

/// Station-level configuration, shared by every device variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(serde::Deserialize))]
pub struct SystemConfig {
    pub station_id: StationId,
    pub device_id: StationId,
    /// How long the node sleeps between wake cycles.
    pub sleep_seconds: u32,
    /// Which payload encoder this deployment uses.
    pub strategy: PayloadStrategy,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            station_id: StationId::try_from(DEFAULT_STATION_ID).unwrap_or_default(),
            device_id: StationId::try_from(DEFAULT_DEVICE_ID).unwrap_or_default(),
            sleep_seconds: DEFAULT_SLEEP_SECONDS,
            strategy: PayloadStrategy::Fragmented,
        }
    }
}

impl SystemConfig {
    /// Decode a `system` blob.
    pub fn read_from_slice(data: &[u8]) -> Result<Self, ConfigError> {
        check_header(data, SYSTEM_BLOB_LEN)?;

        let station_id = decode_padded_str(&data[0x04..0x14])?;
        let device_id = decode_padded_str(&data[0x14..0x24])?;
        let sleep_seconds = u32::from_le_bytes(
            data[0x24..0x28].try_into().map_err(|_| ConfigError::TooShort)?,
        );
        let strategy =
            PayloadStrategy::from_code(data[0x28]).ok_or(ConfigError::MalformedField)?;

        Ok(Self {
            station_id,
            device_id,
            sleep_seconds,
            strategy,
        })
    }

    /// Serialize the configuration into the blob representation.
    pub fn serialize(&self) -> [u8; SYSTEM_BLOB_LEN] {
        let mut data = [0; SYSTEM_BLOB_LEN];
        write_header(&mut data);
        encode_padded_str(&mut data[0x04..0x14], &self.station_id);
        encode_padded_str(&mut data[0x14..0x24], &self.device_id);
        data[0x24..0x28].copy_from_slice(&self.sleep_seconds.to_le_bytes());
        data[0x28] = self.strategy.code();
        data
    }
}

fn decode_padded_str(field: &[u8]) -> Result<StationId, ConfigError> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let s = core::str::from_utf8(&field[..end]).map_err(|_| ConfigError::MalformedField)?;
    StationId::try_from(s).map_err(|_| ConfigError::MalformedField)
}

fn encode_padded_str(field: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
}
