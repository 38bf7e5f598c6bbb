#![cfg_attr(not(test), no_std)]
//! Uplink lifecycle core for the FieldNode sensor station.
//!
//! One wake-to-sleep cycle is strictly sequential: wake, load config,
//! init hardware, activate the LoRaWAN session (restoring it from retained
//! memory when possible), read sensors, encode, transmit, snapshot the
//! session and enter deep sleep. The deep-sleep reset zeroes ordinary
//! memory, so everything a cycle hands to the next one goes through
//! [`retained::RetainedState`] (sleep-retained RAM) or the nonces namespace
//! of the config store (true non-volatile flash).
//!
//! Hardware is reached exclusively through the traits in [`radio`],
//! [`clock`], [`acquisition`] and [`sleep`]; the crate itself is
//! platform-agnostic and fully host-testable.

pub mod acquisition;
pub mod activation;
pub mod clock;
pub mod radio;
pub mod retained;
pub mod scheduler;
pub mod sleep;

#[cfg(test)]
mod testutil;
