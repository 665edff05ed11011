//! Wire types for the DG-LAB socket protocol (v2).
//!
//! The vendor app and the bot never talk to each other directly. Both connect to a
//! relay server, which pairs a local client with the app and forwards text payloads
//! wrapped in a small JSON [`Envelope`].
//!
//! # Main Types
//!
//! - [`Envelope`] / [`MessageType`] / [`RetCode`] - the relay framing
//! - [`AppReport`] - payloads the app sends (strength readings, feedback buttons)
//! - [`AppCommand`] - payloads sent to the app (strength changes, pulses, clear)
//! - [`PulseOperation`] - one 100ms unit of waveform output
//!
//! Types here are pure data: they parse and format payloads and nothing else.

pub mod error;
pub mod message;
pub mod pairing;
pub mod types;

pub use error::{ProtocolError, Result};
pub use message::*;
pub use pairing::*;
pub use types::*;
