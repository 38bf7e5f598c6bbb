#![cfg_attr(not(test), no_std)]
//! Shared data model and payload codec for the FieldNode sensor station.
//!
//! This crate is platform-agnostic: it is used by the node lifecycle crate
//! on the device and by the host-side CLI tools for decoding uplinks.

pub mod payload;
pub mod reading;
