//! Console host for the DG-LAB chat bot.
//!
//! Each stdin line is one chat message. Replies go to stdout, logs to stderr.
//! Pairing codes are rendered as QR images and hosted on sm.ms; the device
//! side is a [`dglab_runtime::PairingServer`] started per connection.

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod device;
pub mod logging;
pub mod qr;
pub mod smms;
