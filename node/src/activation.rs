//! The network activation state machine.
//!
//! Joins are costly and rate-limited, so the manager always tries to bring
//! the previous MAC session back first: nonces from non-volatile storage,
//! session snapshot from retained memory, then a stack-level resume. Only
//! when that fails does it spend airtime on a join handshake.
//!
//! After a *fresh* join the local clock cannot be trusted until it has been
//! set from the network, so the manager runs the DeviceTime exchange before
//! reporting the session usable. A restored session skips that step: the
//! clock kept running across sleep.

use core::fmt::{self, Write};

use embedded_hal::delay::DelayNs;
use fieldnode_config::{ConfigStore, Namespace, NetworkIdentity};

use crate::clock::{verify_sync, Clock};
use crate::radio::{RadioError, RadioLink, NONCES_BUF_LEN, UPLINK_DATARATE};
use crate::retained::RetainedState;

/// How often the DeviceTime exchange is attempted after a join.
pub const TIME_SYNC_ATTEMPTS: u32 = 3;

/// Pause between DeviceTime attempts.
pub const TIME_SYNC_RETRY_MS: u32 = 500;

/// Stabilization pause between the join accept and the first MAC exchange.
pub const POST_JOIN_SETTLE_MS: u32 = 1000;

/// How a cycle's activation attempt ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The previous session was resumed with zero join traffic.
    SessionRestored,
    /// A fresh join completed and the clock was synchronized.
    NewSession,
    /// The join handshake failed; no usable session this cycle.
    JoinFailed(RadioError),
    /// The join succeeded but the clock could not be synchronized; the MAC
    /// session is valid, but timestamps this cycle are not trustworthy.
    ClockSyncFailed,
}

impl ActivationOutcome {
    /// Whether the MAC is uplink-capable.
    pub fn is_active(self) -> bool {
        matches!(self, Self::SessionRestored | Self::NewSession)
    }
}

/// Internal states, in the order a cold boot walks them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Cold,
    RestoringNonces,
    RestoringSession,
    Joining,
    TimeSync,
}

/// Drive the radio to an uplink-capable state.
///
/// Side effects:
/// - persists the nonces blob exactly once, on a successful join (before
///   the time sync, because a time-sync failure does not invalidate the
///   join);
/// - resets `boots_since_unsuccessful_join` on a successful join and
///   increments it on a failed one; a clock-sync failure leaves it alone.
///
/// The session snapshot is deliberately NOT written here: uplinks mutate
/// the frame counters even after a restore, so the sleep sequence snapshots
/// the session unconditionally at the end of every cycle.
pub fn activate(
    radio: &mut impl RadioLink,
    store: &mut impl ConfigStore,
    clock: &mut impl Clock,
    delay: &mut impl DelayNs,
    retained: &mut RetainedState,
    identity: &NetworkIdentity,
    debug: &mut dyn fmt::Write,
) -> ActivationOutcome {
    let mut nonces = [0u8; NONCES_BUF_LEN];
    let mut state = State::Cold;

    loop {
        state = match state {
            State::Cold => {
                if let Err(e) = radio.configure_otaa(identity) {
                    writeln!(debug, "Activation: could not load identity: {}", e).ok();
                    return ActivationOutcome::JoinFailed(e);
                }
                State::RestoringNonces
            }

            State::RestoringNonces => match store.get(Namespace::Nonces, &mut nonces) {
                Ok(Some(len)) if len == NONCES_BUF_LEN => State::RestoringSession,
                Ok(Some(len)) => {
                    writeln!(debug, "Activation: nonces blob has wrong size ({})", len).ok();
                    State::Joining
                }
                Ok(None) => {
                    writeln!(debug, "Activation: no stored nonces, starting fresh join").ok();
                    State::Joining
                }
                Err(e) => {
                    writeln!(debug, "Activation: nonces read failed: {}", e).ok();
                    State::Joining
                }
            },

            State::RestoringSession => {
                let resumed = radio
                    .restore_nonces(&nonces)
                    .and_then(|()| radio.restore_session(&retained.session))
                    .and_then(|()| radio.try_resume());
                match resumed {
                    Ok(true) => {
                        writeln!(debug, "Activation: session restored").ok();
                        return ActivationOutcome::SessionRestored;
                    }
                    Ok(false) => {
                        writeln!(debug, "Activation: session resume refused, joining").ok();
                        State::Joining
                    }
                    Err(e) => {
                        writeln!(debug, "Activation: session restore failed: {}", e).ok();
                        State::Joining
                    }
                }
            }

            State::Joining => match radio.join() {
                Ok(()) => {
                    writeln!(debug, "Activation: join successful").ok();
                    retained.boots_since_unsuccessful_join = 0;
                    persist_nonces(radio, store, debug);
                    State::TimeSync
                }
                Err(e) => {
                    writeln!(debug, "Activation: join failed: {}", e).ok();
                    retained.boots_since_unsuccessful_join =
                        retained.boots_since_unsuccessful_join.saturating_add(1);
                    return ActivationOutcome::JoinFailed(e);
                }
            },

            State::TimeSync => {
                delay.delay_ms(POST_JOIN_SETTLE_MS);
                if let Err(e) = radio.set_datarate(UPLINK_DATARATE) {
                    writeln!(debug, "Activation: could not set datarate: {}", e).ok();
                }
                if sync_clock(radio, clock, delay, debug) {
                    return ActivationOutcome::NewSession;
                }
                writeln!(debug, "Activation: clock sync failed, session unusable this cycle").ok();
                return ActivationOutcome::ClockSyncFailed;
            }
        };
    }
}

/// Snapshot the nonces out of the stack and write them to flash. Called
/// exactly once per successful join.
fn persist_nonces(radio: &mut impl RadioLink, store: &mut impl ConfigStore, debug: &mut dyn fmt::Write) {
    let mut buf = [0u8; NONCES_BUF_LEN];
    if let Err(e) = radio.snapshot_nonces(&mut buf) {
        writeln!(debug, "Activation: nonces snapshot failed: {}", e).ok();
        return;
    }
    if let Err(e) = store.set(Namespace::Nonces, &buf) {
        // The join stays valid; the next power loss will cost a join with
        // stale nonces, which the network server rejects until reprovision.
        writeln!(debug, "Activation: nonces write failed: {}", e).ok();
    }
}

/// Run the DeviceTime exchange up to [`TIME_SYNC_ATTEMPTS`] times and apply
/// the answer. True once the applied clock verifies against the answer.
fn sync_clock(
    radio: &mut impl RadioLink,
    clock: &mut impl Clock,
    delay: &mut impl DelayNs,
    debug: &mut dyn fmt::Write,
) -> bool {
    for attempt in 1..=TIME_SYNC_ATTEMPTS {
        match radio.request_network_time() {
            Ok(time) => {
                clock.set_epoch(time.epoch, time.fraction);
                if verify_sync(clock, time.epoch) {
                    writeln!(debug, "Activation: clock set to epoch {}", time.epoch).ok();
                    return true;
                }
                writeln!(debug, "Activation: clock did not take epoch {}", time.epoch).ok();
            }
            Err(e) => {
                writeln!(debug, "Activation: DeviceTime attempt {} failed: {}", attempt, e).ok();
            }
        }
        if attempt < TIME_SYNC_ATTEMPTS {
            delay.delay_ms(TIME_SYNC_RETRY_MS);
        }
    }
    false
}
