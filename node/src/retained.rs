//! State that survives deep sleep.
//!
//! The deep-sleep reset restarts the program at its entry point and zeroes
//! ordinary RAM; only a small retained region survives (and nothing at all
//! survives full power loss). This module defines exactly what crosses that
//! boundary and its byte layout in the retained region:
//!
//! ```text
//! 0x00                sessionBuffer (SESSION_BUF_LEN bytes, opaque)
//! SESSION_BUF_LEN     bootCount (u16 LE)
//! SESSION_BUF_LEN+2   bootsSinceUnsuccessfulJoin (u16 LE)
//! ```
//!
//! Nonces deliberately do NOT live here: they must survive full power loss
//! and are kept in the non-volatile `nonces` namespace instead. The session
//! does not need to, because a power loss forces a fresh join anyway, which
//! produces a fresh session.

use crate::radio::SESSION_BUF_LEN;

/// Total size of the retained region.
pub const RETAINED_REGION_LEN: usize = SESSION_BUF_LEN + 4;

/// Everything one cycle hands to the next across the deep-sleep reset.
///
/// Passed by reference into the activation manager and the sleep sequence;
/// there are no implicit globals. A zeroed value (what full power loss
/// leaves behind) is valid and simply makes the session resume fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedState {
    /// Opaque MAC session snapshot, rewritten at the end of every cycle.
    pub session: [u8; SESSION_BUF_LEN],
    /// Total wake cycles since the last full power loss.
    pub boot_count: u16,
    /// Wake cycles since a join last failed; reset by a successful join.
    /// Exists so an adaptive backoff can be added on top.
    pub boots_since_unsuccessful_join: u16,
}

impl Default for RetainedState {
    fn default() -> Self {
        Self {
            session: [0; SESSION_BUF_LEN],
            boot_count: 0,
            boots_since_unsuccessful_join: 0,
        }
    }
}

impl RetainedState {
    /// Serialize into the retained region layout.
    pub fn to_bytes(&self) -> [u8; RETAINED_REGION_LEN] {
        let mut data = [0; RETAINED_REGION_LEN];
        data[..SESSION_BUF_LEN].copy_from_slice(&self.session);
        data[SESSION_BUF_LEN..SESSION_BUF_LEN + 2].copy_from_slice(&self.boot_count.to_le_bytes());
        data[SESSION_BUF_LEN + 2..].copy_from_slice(&self.boots_since_unsuccessful_join.to_le_bytes());
        data
    }

    /// Rebuild from the retained region layout.
    pub fn from_bytes(data: &[u8; RETAINED_REGION_LEN]) -> Self {
        let mut session = [0; SESSION_BUF_LEN];
        session.copy_from_slice(&data[..SESSION_BUF_LEN]);
        let boot_count = u16::from_le_bytes([data[SESSION_BUF_LEN], data[SESSION_BUF_LEN + 1]]);
        let boots_since_unsuccessful_join =
            u16::from_le_bytes([data[SESSION_BUF_LEN + 2], data[SESSION_BUF_LEN + 3]]);
        Self {
            session,
            boot_count,
            boots_since_unsuccessful_join,
        }
    }
}
