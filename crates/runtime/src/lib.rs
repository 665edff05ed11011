//! DG-LAB socket relay runtime.
//!
//! Hosts the websocket endpoint the vendor app connects to and pairs it with an
//! in-process [`LocalClient`]:
//!
//! ```text
//! ┌──────────┐  ws   ┌───────────────┐  mpsc  ┌─────────────┐
//! │ DG-LAB   │◄─────►│ PairingServer │◄──────►│ LocalClient │
//! │ app      │       │ (axum relay)  │        │ + handle    │
//! └──────────┘       └───────────────┘        └─────────────┘
//! ```
//!
//! The local client never opens a socket. Its outbound commands are written
//! straight into the bound app connection's queue, and everything addressed to
//! it (bind acceptance, app reports, heartbeats, break notices) arrives through
//! a bounded event channel.

pub mod client;
pub mod error;
pub mod server;
mod state;

pub use client::{ClientEvent, ClientHandle, LocalClient};
pub use error::{Error, Result};
pub use server::{PairingServer, ServerConfig};
