//! The namespaced blob store boundary.
//!
//! On the device this is backed by the flash key-value store; on the host
//! (tests, tools) by [`RamConfigStore`].

use core::fmt;

use heapless::Vec;

/// Largest blob any namespace may hold.
pub const MAX_BLOB_LEN: usize = 64;

/// The configuration namespaces known to the node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Namespace {
    /// Station/device identifiers and cycle parameters.
    System,
    /// OTAA identity (EUIs and root keys).
    Lorawan,
    /// Sensor enablement and calibration, owned by the acquisition layer.
    Sensors,
    /// LoRaWAN anti-replay nonces. Must survive full power loss.
    Nonces,
}

impl Namespace {
    pub const COUNT: usize = 4;

    /// The key under which the blob is stored.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Lorawan => "lorawan",
            Self::Sensors => "sensors",
            Self::Nonces => "nonces",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::System => 0,
            Self::Lorawan => 1,
            Self::Sensors => 2,
            Self::Nonces => 3,
        }
    }
}

/// Errors from the underlying store.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The blob does not fit the namespace slot or the caller's buffer.
    Capacity,
    /// The backing storage failed.
    Storage,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity => write!(f, "blob exceeds capacity"),
            Self::Storage => write!(f, "backing storage failure"),
        }
    }
}

/// Namespaced typed-blob get/set.
pub trait ConfigStore {
    /// Read the blob stored under `namespace` into `out`.
    ///
    /// Returns `Ok(None)` if the namespace has never been written; callers
    /// substitute their documented defaults in that case.
    fn get(&mut self, namespace: Namespace, out: &mut [u8]) -> Result<Option<usize>, StoreError>;

    /// Write (or overwrite) the blob stored under `namespace`.
    fn set(&mut self, namespace: Namespace, data: &[u8]) -> Result<(), StoreError>;
}

/// In-memory store for tests and host tools.
#[derive(Debug, Default)]
pub struct RamConfigStore {
    slots: [Option<Vec<u8, MAX_BLOB_LEN>>; Namespace::COUNT],
}

impl RamConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every namespace, as a full storage wipe would.
    pub fn wipe(&mut self) {
        self.slots = Default::default();
    }
}

impl ConfigStore for RamConfigStore {
    fn get(&mut self, namespace: Namespace, out: &mut [u8]) -> Result<Option<usize>, StoreError> {
        match &self.slots[namespace.index()] {
            None => Ok(None),
            Some(blob) => {
                if out.len() < blob.len() {
                    return Err(StoreError::Capacity);
                }
                out[..blob.len()].copy_from_slice(blob);
                Ok(Some(blob.len()))
            }
        }
    }

    fn set(&mut self, namespace: Namespace, data: &[u8]) -> Result<(), StoreError> {
        let blob = Vec::from_slice(data).map_err(|_| StoreError::Capacity)?;
        self.slots[namespace.index()] = Some(blob);
        Ok(())
    }
}
