//! Shared test doubles for the lifecycle modules.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use fieldnode_config::NetworkIdentity;

use crate::clock::Clock;
use crate::radio::{NetworkTime, RadioError, RadioLink, NONCES_BUF_LEN, SESSION_BUF_LEN};
use crate::sleep::{PowerRails, SleepControl};

/// One observable hardware action, recorded in call order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    SnapshotSession,
    RailsOn,
    RailsOff,
    FlushDiagnostics,
    RadioSleep,
    ExpanderSleep,
    ReleaseBuses,
    HoldPins,
    ReleaseHeldPins,
    ArmTimerWakeup(u32),
    ArmConfigWakeup,
    EnterDeepSleep,
}

pub type EventLog = Rc<RefCell<Vec<BoardEvent>>>;

/// Scriptable [`RadioLink`] double. Results are consumed front to back.
pub struct StubRadio {
    pub begin_result: Result<(), RadioError>,
    pub resume_result: Option<Result<bool, RadioError>>,
    pub join_results: Vec<Result<(), RadioError>>,
    pub time_results: Vec<Result<NetworkTime, RadioError>>,
    pub uplink_results: Vec<Result<(), RadioError>>,
    pub nonces: [u8; NONCES_BUF_LEN],
    pub session: [u8; SESSION_BUF_LEN],
    pub join_calls: u32,
    pub time_requests: u32,
    pub nonces_snapshots: u32,
    pub restored_nonces: Option<[u8; NONCES_BUF_LEN]>,
    pub restored_session: Option<[u8; SESSION_BUF_LEN]>,
    pub configured_identity: Option<NetworkIdentity>,
    pub datarates: Vec<u8>,
    pub uplinks: Vec<(Vec<u8>, u8)>,
    pub events: Option<EventLog>,
}

impl StubRadio {
    pub fn new() -> Self {
        Self {
            begin_result: Ok(()),
            resume_result: None,
            join_results: Vec::new(),
            time_results: Vec::new(),
            uplink_results: Vec::new(),
            nonces: [0; NONCES_BUF_LEN],
            session: [0; SESSION_BUF_LEN],
            join_calls: 0,
            time_requests: 0,
            nonces_snapshots: 0,
            restored_nonces: None,
            restored_session: None,
            configured_identity: None,
            datarates: Vec::new(),
            uplinks: Vec::new(),
            events: None,
        }
    }

    fn record(&self, event: BoardEvent) {
        if let Some(events) = &self.events {
            events.borrow_mut().push(event);
        }
    }
}

impl RadioLink for StubRadio {
    fn begin(&mut self) -> Result<(), RadioError> {
        self.begin_result
    }

    fn configure_otaa(&mut self, identity: &NetworkIdentity) -> Result<(), RadioError> {
        self.configured_identity = Some(identity.clone());
        Ok(())
    }

    fn restore_nonces(&mut self, buf: &[u8; NONCES_BUF_LEN]) -> Result<(), RadioError> {
        self.restored_nonces = Some(*buf);
        Ok(())
    }

    fn restore_session(&mut self, buf: &[u8; SESSION_BUF_LEN]) -> Result<(), RadioError> {
        self.restored_session = Some(*buf);
        Ok(())
    }

    fn try_resume(&mut self) -> Result<bool, RadioError> {
        self.resume_result.take().unwrap_or(Ok(false))
    }

    fn join(&mut self) -> Result<(), RadioError> {
        self.join_calls += 1;
        if self.join_results.is_empty() {
            Err(RadioError::Timeout)
        } else {
            self.join_results.remove(0)
        }
    }

    fn snapshot_nonces(&mut self, out: &mut [u8; NONCES_BUF_LEN]) -> Result<(), RadioError> {
        self.nonces_snapshots += 1;
        out.copy_from_slice(&self.nonces);
        Ok(())
    }

    fn snapshot_session(&mut self, out: &mut [u8; SESSION_BUF_LEN]) -> Result<(), RadioError> {
        self.record(BoardEvent::SnapshotSession);
        out.copy_from_slice(&self.session);
        Ok(())
    }

    fn set_datarate(&mut self, datarate: u8) -> Result<(), RadioError> {
        self.datarates.push(datarate);
        Ok(())
    }

    fn uplink(&mut self, payload: &[u8], port: u8) -> Result<(), RadioError> {
        self.uplinks.push((payload.to_vec(), port));
        if self.uplink_results.is_empty() {
            Ok(())
        } else {
            self.uplink_results.remove(0)
        }
    }

    fn request_network_time(&mut self) -> Result<NetworkTime, RadioError> {
        self.time_requests += 1;
        if self.time_results.is_empty() {
            Err(RadioError::NoDownlink)
        } else {
            self.time_results.remove(0)
        }
    }

    fn sleep(&mut self) {
        self.record(BoardEvent::RadioSleep);
    }
}

/// [`Clock`] double. `set_error` simulates a clock that does not take the
/// requested epoch.
pub struct StubClock {
    pub now: u32,
    pub set_error: u32,
    pub set_calls: u32,
}

impl StubClock {
    pub fn new(now: u32) -> Self {
        Self {
            now,
            set_error: 0,
            set_calls: 0,
        }
    }
}

impl Clock for StubClock {
    fn epoch(&mut self) -> u32 {
        self.now
    }

    fn set_epoch(&mut self, epoch: u32, _fraction: u8) {
        self.set_calls += 1;
        self.now = epoch + self.set_error;
    }
}

/// [`PowerRails`] double, optionally recording into a shared event log.
pub struct StubRails {
    pub events: Option<EventLog>,
}

impl StubRails {
    pub fn new() -> Self {
        Self { events: None }
    }

    pub fn on_log(events: &EventLog) -> Self {
        Self {
            events: Some(events.clone()),
        }
    }

    fn record(&self, event: BoardEvent) {
        if let Some(events) = &self.events {
            events.borrow_mut().push(event);
        }
    }
}

impl PowerRails for StubRails {
    fn all_on(&mut self) {
        self.record(BoardEvent::RailsOn);
    }

    fn all_off(&mut self) {
        self.record(BoardEvent::RailsOff);
    }
}

/// [`SleepControl`] double recording every call in order.
pub struct StubBoard {
    pub events: EventLog,
    pub config_pending: bool,
}

impl StubBoard {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
            config_pending: false,
        }
    }

    pub fn deep_sleep_entered(&self) -> bool {
        self.events.borrow().contains(&BoardEvent::EnterDeepSleep)
    }
}

impl SleepControl for StubBoard {
    fn flush_diagnostics(&mut self) {
        self.events.borrow_mut().push(BoardEvent::FlushDiagnostics);
    }

    fn expander_sleep(&mut self) {
        self.events.borrow_mut().push(BoardEvent::ExpanderSleep);
    }

    fn release_buses(&mut self) {
        self.events.borrow_mut().push(BoardEvent::ReleaseBuses);
    }

    fn hold_pins(&mut self) {
        self.events.borrow_mut().push(BoardEvent::HoldPins);
    }

    fn release_held_pins(&mut self) {
        self.events.borrow_mut().push(BoardEvent::ReleaseHeldPins);
    }

    fn arm_timer_wakeup(&mut self, seconds: u32) {
        self.events.borrow_mut().push(BoardEvent::ArmTimerWakeup(seconds));
    }

    fn arm_config_wakeup(&mut self) {
        self.events.borrow_mut().push(BoardEvent::ArmConfigWakeup);
    }

    fn config_request_pending(&mut self) -> bool {
        self.config_pending
    }

    fn enter_deep_sleep(&mut self) {
        self.events.borrow_mut().push(BoardEvent::EnterDeepSleep);
    }
}

/// [`DelayNs`] double that returns immediately.
pub struct NullDelay;

impl DelayNs for NullDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// [`DelayNs`] double recording every requested pause in milliseconds.
pub struct RecordingDelay {
    pub ms: Vec<u32>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self { ms: Vec::new() }
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}
