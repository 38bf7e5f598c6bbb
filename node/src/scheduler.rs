//! One wake-to-sleep cycle.
//!
//! [`run_cycle`] is the single entry point the board support package calls
//! after every wake. It owns the fixed order of a cycle: undo pin latching,
//! load configuration, power the sensors, activate the network, read,
//! encode, transmit, and hand control to the sleep sequence. Whatever goes
//! wrong mid-cycle, the node ends up asleep with a fresh session snapshot;
//! the only exception is a pending configuration request, which keeps the
//! node awake for provisioning.

use core::fmt::{self, Write};

use embedded_hal::delay::DelayNs;
use fieldnode_common::payload::{
    encode_delimited, encode_fragmented, Frame, FrameHeader, PayloadStrategy, MAX_FRAMES,
    MAX_PAYLOAD,
};
use fieldnode_common::reading::Reading;
use fieldnode_config::{
    ConfigStore, Namespace, NetworkIdentity, SystemConfig, MAX_BLOB_LEN,
};
use heapless::Vec;

use crate::acquisition::{SensorAcquisition, MAX_READINGS};
use crate::activation::{activate, ActivationOutcome};
use crate::clock::Clock;
use crate::radio::{RadioError, RadioLink, UPLINK_PORT};
use crate::retained::RetainedState;
use crate::sleep::{on_wake, save_and_sleep, PowerRails, SleepControl};

/// Settling time between rail power-up and the first sensor access.
pub const SENSOR_SETTLE_MS: u32 = 100;

/// Pause between consecutive uplink fragments, to stay clear of the duty
/// cycle enforcement window of the stack.
pub const INTER_FRAME_PAUSE_MS: u32 = 500;

/// How a cycle ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Activation and transmission ran; see the frame counters for detail.
    Uplinked,
    /// The configuration request pin was asserted; the node stays awake.
    ProvisioningRequested,
    /// The transceiver did not come up.
    RadioInitFailed(RadioError),
    /// No usable session this cycle.
    JoinFailed(RadioError),
    /// Fresh join, but the clock could not be synchronized.
    ClockSyncFailed,
}

/// Summary of one cycle, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub frames_attempted: usize,
    pub frames_failed: usize,
    /// Readings dropped by the delimited encoder's truncation.
    pub readings_dropped: usize,
}

impl CycleReport {
    fn bare(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            frames_attempted: 0,
            frames_failed: 0,
            readings_dropped: 0,
        }
    }
}

/// Run one complete wake-to-sleep cycle.
///
/// Does not return on real hardware (the sleep sequence ends in a reset);
/// the report is for host tests and for callers whose
/// [`SleepControl::enter_deep_sleep`] returns.
pub fn run_cycle(
    radio: &mut impl RadioLink,
    store: &mut impl ConfigStore,
    clock: &mut impl Clock,
    sensors: &mut impl SensorAcquisition,
    rails: &mut impl PowerRails,
    control: &mut impl SleepControl,
    delay: &mut impl DelayNs,
    retained: &mut RetainedState,
    debug: &mut dyn fmt::Write,
) -> CycleReport {
    on_wake(control);
    retained.boot_count = retained.boot_count.wrapping_add(1);
    writeln!(
        debug,
        "Cycle: boot {} ({} since last failed join)",
        retained.boot_count, retained.boots_since_unsuccessful_join
    )
    .ok();

    let config = load_system_config(store, debug);
    let identity = load_identity(store, debug);

    rails.all_on();
    delay.delay_ms(SENSOR_SETTLE_MS);

    if control.config_request_pending() {
        // Stay awake; the provisioning service takes over from here.
        writeln!(debug, "Cycle: configuration request pending, staying awake").ok();
        return CycleReport::bare(CycleOutcome::ProvisioningRequested);
    }

    if let Err(e) = radio.begin() {
        writeln!(debug, "Cycle: radio init failed: {}", e).ok();
        let report = CycleReport::bare(CycleOutcome::RadioInitFailed(e));
        save_and_sleep(radio, rails, control, retained, config.sleep_seconds, debug);
        return report;
    }

    match activate(radio, store, clock, delay, retained, &identity, debug) {
        ActivationOutcome::SessionRestored | ActivationOutcome::NewSession => {}
        ActivationOutcome::JoinFailed(e) => {
            let report = CycleReport::bare(CycleOutcome::JoinFailed(e));
            save_and_sleep(radio, rails, control, retained, config.sleep_seconds, debug);
            return report;
        }
        ActivationOutcome::ClockSyncFailed => {
            // A frame with a bogus timestamp is worse than a missing one.
            let report = CycleReport::bare(CycleOutcome::ClockSyncFailed);
            save_and_sleep(radio, rails, control, retained, config.sleep_seconds, debug);
            return report;
        }
    }

    let readings = collect_readings(sensors, debug);
    let header = FrameHeader {
        station_id: config.station_id.clone(),
        device_id: config.device_id.clone(),
        battery_volts: sensors.battery_volts(),
        timestamp: clock.epoch(),
    };

    let mut report = CycleReport::bare(CycleOutcome::Uplinked);
    if readings.is_empty() {
        writeln!(debug, "Cycle: no readings, skipping transmission").ok();
    } else {
        let frames = encode_frames(&header, &readings, config.strategy, &mut report, debug);
        transmit(radio, &frames, delay, &mut report, debug);
    }

    save_and_sleep(radio, rails, control, retained, config.sleep_seconds, debug);
    report
}

/// Load the `system` blob, falling back to factory defaults on any problem.
fn load_system_config(store: &mut impl ConfigStore, debug: &mut dyn fmt::Write) -> SystemConfig {
    let mut buf = [0u8; MAX_BLOB_LEN];
    match store.get(Namespace::System, &mut buf) {
        Ok(Some(len)) => match SystemConfig::read_from_slice(&buf[..len]) {
            Ok(config) => config,
            Err(e) => {
                writeln!(debug, "Cycle: system blob invalid ({}), using defaults", e).ok();
                SystemConfig::default()
            }
        },
        Ok(None) => {
            writeln!(debug, "Cycle: no system blob, using defaults").ok();
            SystemConfig::default()
        }
        Err(e) => {
            writeln!(debug, "Cycle: system blob unreadable ({}), using defaults", e).ok();
            SystemConfig::default()
        }
    }
}

/// Load the `lorawan` identity blob. An unprovisioned node gets the zeroed
/// identity, which the network rejects at join time; the cycle still runs
/// so the failure is visible in the diagnostics.
fn load_identity(store: &mut impl ConfigStore, debug: &mut dyn fmt::Write) -> NetworkIdentity {
    let mut buf = [0u8; MAX_BLOB_LEN];
    match store.get(Namespace::Lorawan, &mut buf) {
        Ok(Some(len)) => match NetworkIdentity::read_from_slice(&buf[..len]) {
            Ok(identity) => identity,
            Err(e) => {
                writeln!(debug, "Cycle: identity blob invalid ({})", e).ok();
                NetworkIdentity::default()
            }
        },
        Ok(None) => {
            writeln!(debug, "Cycle: node is not provisioned").ok();
            NetworkIdentity::default()
        }
        Err(e) => {
            writeln!(debug, "Cycle: identity blob unreadable ({})", e).ok();
            NetworkIdentity::default()
        }
    }
}

fn collect_readings(
    sensors: &mut impl SensorAcquisition,
    debug: &mut dyn fmt::Write,
) -> Vec<Reading, MAX_READINGS> {
    let mut readings: Vec<Reading, MAX_READINGS> = Vec::new();
    for request in sensors.enabled_sensors() {
        let reading = sensors.read(&request);
        if reading.is_failed() {
            writeln!(debug, "Cycle: sensor {} failed", reading.sensor_id).ok();
        }
        if readings.push(reading).is_err() {
            break;
        }
    }
    writeln!(debug, "Cycle: collected {} readings", readings.len()).ok();
    readings
}

fn encode_frames(
    header: &FrameHeader,
    readings: &[Reading],
    strategy: PayloadStrategy,
    report: &mut CycleReport,
    debug: &mut dyn fmt::Write,
) -> Vec<Frame, MAX_FRAMES> {
    match strategy {
        PayloadStrategy::Fragmented => encode_fragmented(header, readings, MAX_PAYLOAD),
        PayloadStrategy::Delimited => {
            let outcome = encode_delimited(header, readings, MAX_PAYLOAD);
            if outcome.dropped > 0 {
                writeln!(debug, "Cycle: payload full, dropped {} readings", outcome.dropped).ok();
            }
            report.readings_dropped = outcome.dropped;
            let mut frames = Vec::new();
            if outcome.encoded > 0 {
                frames.push(outcome.frame).ok();
            } else {
                writeln!(debug, "Cycle: no reading fits, skipping transmission").ok();
            }
            frames
        }
    }
}

/// Send each frame once, in order. A failed frame is logged and counted,
/// never retried; the readings it carried are lost.
fn transmit(
    radio: &mut impl RadioLink,
    frames: &[Frame],
    delay: &mut impl DelayNs,
    report: &mut CycleReport,
    debug: &mut dyn fmt::Write,
) {
    for (i, frame) in frames.iter().enumerate() {
        report.frames_attempted += 1;
        match radio.uplink(frame.as_bytes(), UPLINK_PORT) {
            Ok(()) => {
                writeln!(debug, "Cycle: sent frame {}/{} ({} bytes)", i + 1, frames.len(), frame.len()).ok();
            }
            Err(e) => {
                report.frames_failed += 1;
                writeln!(debug, "Cycle: frame {}/{} failed: {}", i + 1, frames.len(), e).ok();
            }
        }
        if i + 1 < frames.len() {
            delay.delay_ms(INTER_FRAME_PAUSE_MS);
        }
    }
}
