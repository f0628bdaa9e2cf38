//! hdc-cli: Command-line frontend for hdc-rs
//!
//! Provides the `hdc-rs` binary, a thin layer over [`hdc_client`] used to
//! drive a device by hand.

pub mod commands;
pub mod output;
