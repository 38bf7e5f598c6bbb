#![cfg_attr(not(test), no_std)]
//! # Device Configuration
//!
//! Configuration lives in a namespaced key-value store in non-volatile
//! flash. Each namespace holds one opaque binary blob with a one-byte
//! version followed by three magic bytes (a cheap corruption check), then
//! the versioned payload:
//!
//! ```text
//!        0           8          16          24          32
//!        +-----------+-----------+-----------+-----------+
//! 0x00   | Version   | Magic (0x5A 0xC3 0x7E)            |
//!        +-----------+-----------+-----------+-----------+
//! 0x04   | Versioned payload ...                         |
//!        +-----------------------------------------------+
//! ```
//!
//! ## Namespaces
//!
//! - `system` — [`SystemConfig`]: station/device identifiers, sleep
//!   interval, payload strategy.
//! - `lorawan` — [`NetworkIdentity`]: OTAA EUIs and root keys. Written at
//!   provisioning time, read-only afterwards.
//! - `sensors` — sensor enablement/calibration blobs, owned by the
//!   acquisition layer (opaque to this crate).
//! - `nonces` — the LoRaWAN anti-replay blob, written once per successful
//!   join. This is the only state that must survive full power loss.
//!
//! A missing namespace is not an error: callers substitute the documented
//! defaults and the node keeps running unprovisioned (with zeroed keys it
//! will simply never complete a join).

use core::fmt;

pub mod identity;
pub mod store;
pub mod system;

pub use identity::{NetworkIdentity, IDENTITY_BLOB_LEN};
pub use store::{ConfigStore, Namespace, RamConfigStore, StoreError, MAX_BLOB_LEN};
pub use system::{SystemConfig, SYSTEM_BLOB_LEN};

/// The three bytes following the version byte in every blob.
pub const MAGIC_BYTES: [u8; 3] = [0x5A, 0xC3, 0x7E];

/// Blob format version.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "serde_support", derive(serde_repr::Deserialize_repr))]
#[repr(u8)]
pub enum ConfigVersion {
    V1 = 1,
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "1"),
        }
    }
}

/// Errors when decoding a configuration blob.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The version byte is not supported.
    UnsupportedVersion(u8),
    /// Wrong magic bytes, the configuration data might be corrupted.
    WrongMagicBytes,
    /// The blob is shorter than the versioned layout requires.
    TooShort,
    /// A field does not decode (bad UTF-8 identifier, unknown strategy code).
    MalformedField,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(v) => write!(f, "Unsupported config format version ({})", v),
            Self::WrongMagicBytes => write!(f, "Wrong magic bytes"),
            Self::TooShort => write!(f, "Blob too short"),
            Self::MalformedField => write!(f, "Malformed field"),
        }
    }
}

/// Check the version byte and magic bytes at the start of `data`.
pub(crate) fn check_header(data: &[u8], min_len: usize) -> Result<(), ConfigError> {
    if data.len() < min_len {
        return Err(ConfigError::TooShort);
    }
    match data[0] {
        1 => {}
        other => return Err(ConfigError::UnsupportedVersion(other)),
    }
    if data[1..4] != MAGIC_BYTES {
        return Err(ConfigError::WrongMagicBytes);
    }
    Ok(())
}

/// Write the version byte and magic bytes into the first four bytes.
pub(crate) fn write_header(data: &mut [u8]) {
    data[0] = ConfigVersion::V1 as u8;
    data[1..4].copy_from_slice(&MAGIC_BYTES);
}
