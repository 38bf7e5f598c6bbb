//! The local real-time clock boundary.

/// Maximum deviation between the network-provided epoch and the clock after
/// applying it, before the sync is considered failed.
pub const SYNC_TOLERANCE_SECONDS: u32 = 10;

/// A battery-backed calendar clock.
///
/// After a fresh join the clock is untrustworthy until it has been set from
/// the network; the activation manager refuses to report a usable session
/// until that happened (or the session was restored, in which case the
/// clock kept running).
pub trait Clock {
    /// Current Unix epoch seconds.
    fn epoch(&mut self) -> u32;

    /// Set the clock from a network time answer.
    fn set_epoch(&mut self, epoch: u32, fraction: u8);
}

/// Whether the clock took the `requested` epoch within tolerance.
pub fn verify_sync(clock: &mut impl Clock, requested: u32) -> bool {
    clock.epoch().abs_diff(requested) <= SYNC_TOLERANCE_SECONDS
}
