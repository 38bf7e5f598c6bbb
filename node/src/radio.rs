//! Thin boundary over the LoRaWAN MAC stack.
//!
//! The node never talks to the radio driver directly; everything goes
//! through [`RadioLink`]. The session and nonces buffers are opaque to this
//! crate: their layout belongs to the stack, the node only moves them
//! between the stack, retained memory and non-volatile storage.

use core::fmt;

use fieldnode_config::NetworkIdentity;

/// Size of the opaque MAC session snapshot (derived keys, frame counters).
pub const SESSION_BUF_LEN: usize = 160;

/// Size of the opaque anti-replay nonces snapshot.
pub const NONCES_BUF_LEN: usize = 40;

/// FPort used for sensor uplinks.
pub const UPLINK_PORT: u8 = 1;

/// Datarate pinned after activation (regional DR3).
pub const UPLINK_DATARATE: u8 = 3;

/// Radio/MAC failures, with the stack's numeric code where one exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// The transceiver did not come up.
    InitFailed(i16),
    /// The peer rejected or ignored the join handshake.
    JoinFailed(i16),
    /// A bounded wait on a busy/ready signal expired.
    Timeout,
    /// An uplink was not accepted by the stack.
    TxFailed(i16),
    /// No downlink arrived where one was required (e.g. DeviceTime answer).
    NoDownlink,
    /// The restored buffer was rejected by the stack.
    BadBuffer,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed(code) => write!(f, "radio init failed ({})", code),
            Self::JoinFailed(code) => write!(f, "join failed ({})", code),
            Self::Timeout => write!(f, "radio busy timeout"),
            Self::TxFailed(code) => write!(f, "uplink failed ({})", code),
            Self::NoDownlink => write!(f, "expected downlink missing"),
            Self::BadBuffer => write!(f, "restored buffer rejected"),
        }
    }
}

/// A network time answer: seconds since the Unix epoch plus a 1/256 s
/// fraction, as delivered by the DeviceTime MAC exchange.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NetworkTime {
    pub epoch: u32,
    pub fraction: u8,
}

/// The operations the lifecycle needs from the MAC stack.
pub trait RadioLink {
    /// Bring up the transceiver. Fatal for the cycle on failure.
    fn begin(&mut self) -> Result<(), RadioError>;

    /// Load the OTAA identity into the stack. Does not transmit.
    fn configure_otaa(&mut self, identity: &NetworkIdentity) -> Result<(), RadioError>;

    /// Hand a previously persisted nonces blob back to the stack.
    fn restore_nonces(&mut self, buf: &[u8; NONCES_BUF_LEN]) -> Result<(), RadioError>;

    /// Hand a previously retained session blob back to the stack.
    fn restore_session(&mut self, buf: &[u8; SESSION_BUF_LEN]) -> Result<(), RadioError>;

    /// Attempt a stack-level session resume from the restored buffers.
    ///
    /// `Ok(true)` means the MAC is uplink-capable again with zero join
    /// traffic. `Ok(false)` means the session could not be resumed and a
    /// fresh join is required; that is not an error.
    fn try_resume(&mut self) -> Result<bool, RadioError>;

    /// Perform the OTAA join handshake. Costly and rate-limited.
    fn join(&mut self) -> Result<(), RadioError>;

    /// Copy the stack's current nonces state out for persistence.
    fn snapshot_nonces(&mut self, out: &mut [u8; NONCES_BUF_LEN]) -> Result<(), RadioError>;

    /// Copy the stack's current session state out for retention.
    fn snapshot_session(&mut self, out: &mut [u8; SESSION_BUF_LEN]) -> Result<(), RadioError>;

    /// Pin the uplink datarate.
    fn set_datarate(&mut self, datarate: u8) -> Result<(), RadioError>;

    /// Send one application payload. No retry; the caller logs failures.
    fn uplink(&mut self, payload: &[u8], port: u8) -> Result<(), RadioError>;

    /// Run the DeviceTime MAC exchange and return the piggybacked answer.
    fn request_network_time(&mut self) -> Result<NetworkTime, RadioError>;

    /// Put the transceiver into its lowest-power mode.
    fn sleep(&mut self);
}
