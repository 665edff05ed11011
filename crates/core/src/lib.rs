//! Chat-driven session manager for a single DG-LAB device.
//!
//! A group chat sends short text commands (`connect`, `set A 20`, `change B 潮汐`,
//! ...). The [`Dispatcher`] parses and validates them, drives the single device
//! [`Session`] through its lifecycle, and answers through a [`ChatTransport`].
//!
//! ```text
//! text ─► command::parse ─► schema::validate ─► Dispatcher ─► Session / DeviceControl
//!                                                   │
//!                                                   └─► lifecycle task: bind ─► polling loop
//! ```
//!
//! Everything outside the session core is reached through traits:
//! [`DeviceConnector`] for the relay, [`PairingPublisher`] and [`MediaHost`]
//! for getting the pairing code in front of the user, [`ChatTransport`] for
//! replies.

pub mod command;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod pulse_loop;
pub mod reply;
pub mod schema;
pub mod session;
pub mod transport;
pub mod waveform;

pub use command::{Command, CommandKind, ParseError, parse};
pub use device::{DeviceConnector, DeviceControl, DeviceEvent, DeviceLink};
pub use dispatch::{Dispatcher, Reply};
pub use error::{CatalogError, DeviceError, TransportError, UploadError};
pub use pulse_loop::{BATCH_PLAYBACK, PulsePacer};
pub use schema::{
	ArgSlot, ArgValue, ChangeArgs, Rejection, StrengthArgs, validate, validate_change, validate_strength,
};
pub use session::{ConnectionState, LifecycleGuard, Session, SessionSnapshot};
pub use transport::{ChatTransport, MediaHost, MediaRef, PairingPublisher, ReplyTarget};
pub use waveform::{PulseBatch, Waveform, WaveformCatalog};

pub use dglab_protocol::{Channel, PulseOperation, StrengthData, StrengthOperation};
