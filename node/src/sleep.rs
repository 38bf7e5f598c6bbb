//! The sleep/wake boundary.
//!
//! Entering deep sleep is an ordered shutdown, not a single call. The
//! session snapshot must be taken while the radio is still powered, rails
//! must drop before buses are released, and pins must be latched last so
//! externally visible lines (relays, enable pins) hold their level while
//! the core is off. [`save_and_sleep`] owns that ordering; board code only
//! provides the primitive operations.

use core::fmt::{self, Write};

use crate::radio::RadioLink;
use crate::retained::RetainedState;

/// Switchable supply rails for sensors and peripherals.
pub trait PowerRails {
    /// Enable all peripheral rails.
    fn all_on(&mut self);

    /// Drop all peripheral rails.
    fn all_off(&mut self);
}

/// Board-level deep-sleep primitives.
///
/// Implementations perform the raw operation only; sequencing is the
/// responsibility of [`save_and_sleep`].
pub trait SleepControl {
    /// Flush buffered diagnostics out of the debug channel.
    fn flush_diagnostics(&mut self);

    /// Put the IO expander into its lowest-power mode.
    fn expander_sleep(&mut self);

    /// Release the peripheral buses so their lines can float.
    fn release_buses(&mut self);

    /// Latch output pins at their current level across the sleep reset.
    fn hold_pins(&mut self);

    /// Release pins latched by a previous [`SleepControl::hold_pins`].
    fn release_held_pins(&mut self);

    /// Arm the timer wake source.
    fn arm_timer_wakeup(&mut self, seconds: u32);

    /// Arm the configuration-request pin as a wake source.
    fn arm_config_wakeup(&mut self);

    /// Whether the configuration-request pin is asserted right now.
    fn config_request_pending(&mut self) -> bool;

    /// Enter deep sleep. Does not return; the next wake restarts the
    /// program at its entry point. Test doubles return instead.
    fn enter_deep_sleep(&mut self);
}

/// First thing after a wake: undo the pin latching so outputs are
/// drivable again.
pub fn on_wake(control: &mut impl SleepControl) {
    control.release_held_pins();
}

/// Snapshot the session into retained memory, shut the board down in
/// order, and enter deep sleep.
///
/// The snapshot happens unconditionally, even after a failed cycle:
/// uplinks mutate the MAC frame counters, and retaining a stale snapshot
/// would make the next resume replay counter values the network has
/// already seen.
pub fn save_and_sleep(
    radio: &mut impl RadioLink,
    rails: &mut impl PowerRails,
    control: &mut impl SleepControl,
    retained: &mut RetainedState,
    sleep_seconds: u32,
    debug: &mut dyn fmt::Write,
) {
    if let Err(e) = radio.snapshot_session(&mut retained.session) {
        writeln!(debug, "Sleep: session snapshot failed: {}", e).ok();
    }
    writeln!(debug, "Sleep: entering deep sleep for {} s", sleep_seconds).ok();
    rails.all_off();
    control.flush_diagnostics();
    radio.sleep();
    control.expander_sleep();
    control.release_buses();
    control.hold_pins();
    control.arm_timer_wakeup(sleep_seconds);
    control.arm_config_wakeup();
    control.enter_deep_sleep();
}
