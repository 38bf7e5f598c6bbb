//! The `lorawan` namespace blob: the node's OTAA identity.
//!
//! ## Layout (version 1, 52 bytes)
//!
//! - `0x00` version byte + magic bytes (4 bytes)
//! - `0x04` JoinEUI (8 bytes)
//! - `0x0C` DevEUI (8 bytes)
//! - `0x14` AppKey (16 bytes)
//! - `0x24` NwkKey (16 bytes)

use crate::{check_header, write_header, ConfigError};

pub const IDENTITY_BLOB_LEN: usize = 52;

/// Long-term OTAA identity and root keys. Written at provisioning time and
/// immutable afterwards.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Deserialize))]
pub struct NetworkIdentity {
    /// LoRaWAN JoinEUI (8 bytes)
    #[cfg_attr(feature = "serde_support", serde(deserialize_with = "hex::serde::deserialize"))]
    pub join_eui: [u8; 8],
    /// LoRaWAN DevEUI (8 bytes)
    #[cfg_attr(feature = "serde_support", serde(deserialize_with = "hex::serde::deserialize"))]
    pub dev_eui: [u8; 8],
    /// LoRaWAN application root key (16 bytes)
    #[cfg_attr(feature = "serde_support", serde(deserialize_with = "hex::serde::deserialize"))]
    pub app_key: [u8; 16],
    /// LoRaWAN network root key (16 bytes)
    #[cfg_attr(feature = "serde_support", serde(deserialize_with = "hex::serde::deserialize"))]
    pub nwk_key: [u8; 16],
}

// Keys stay out of debug output; only the EUIs are shown.
impl core::fmt::Debug for NetworkIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NetworkIdentity")
            .field("join_eui", &self.join_eui)
            .field("dev_eui", &self.dev_eui)
            .finish_non_exhaustive()
    }
}

impl Default for NetworkIdentity {
    /// The unprovisioned identity: all zeroes. A join with it never
    /// completes, which is the intended behavior for a blank device.
    fn default() -> Self {
        Self {
            join_eui: [0; 8],
            dev_eui: [0; 8],
            app_key: [0; 16],
            nwk_key: [0; 16],
        }
    }
}

impl NetworkIdentity {
    /// Decode a `lorawan` blob.
    pub fn read_from_slice(data: &[u8]) -> Result<Self, ConfigError> {
        check_header(data, IDENTITY_BLOB_LEN)?;

        let join_eui: [u8; 8] = data[0x04..0x0C].try_into().map_err(|_| ConfigError::TooShort)?;
        let dev_eui: [u8; 8] = data[0x0C..0x14].try_into().map_err(|_| ConfigError::TooShort)?;
        let app_key: [u8; 16] = data[0x14..0x24].try_into().map_err(|_| ConfigError::TooShort)?;
        let nwk_key: [u8; 16] = data[0x24..0x34].try_into().map_err(|_| ConfigError::TooShort)?;

        Ok(Self {
            join_eui,
            dev_eui,
            app_key,
            nwk_key,
        })
    }

    /// Serialize the identity into the blob representation.
    pub fn serialize(&self) -> [u8; IDENTITY_BLOB_LEN] {
        let mut data = [0; IDENTITY_BLOB_LEN];
        write_header(&mut data);
        data[0x04..0x0C].copy_from_slice(&self.join_eui);
        data[0x0C..0x14].copy_from_slice(&self.dev_eui);
        data[0x14..0x24].copy_from_slice(&self.app_key);
        data[0x24..0x34].copy_from_slice(&self.nwk_key);
        data
    }

    /// Whether the identity has been provisioned at all.
    pub fn is_provisioned(&self) -> bool {
        self.dev_eui.iter().any(|&b| b != 0)
            || self.app_key.iter().any(|&b| b != 0)
            || self.nwk_key.iter().any(|&b| b != 0)
    }
}
