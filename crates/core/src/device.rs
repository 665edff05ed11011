//! The device relay, seen from the session core.

use std::sync::Arc;

use async_trait::async_trait;
use dglab_protocol::{Channel, FeedbackButton, PulseOperation, StrengthData, StrengthOperation};

use crate::error::DeviceError;

/// One inbound device event, consumed once per polling tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
	Strength(StrengthData),
	Feedback(FeedbackButton),
	Heartbeat,
	Disconnected,
	/// A frame the session has no use for, kept for logging.
	Unexpected(String),
}

/// Commands to a bound device. Shared between the dispatcher and the polling loop.
#[async_trait]
pub trait DeviceControl: Send + Sync {
	async fn set_strength(
		&self,
		channel: Channel,
		operation: StrengthOperation,
		value: u8,
	) -> Result<(), DeviceError>;

	async fn add_pulses(&self, channel: Channel, pulses: &[PulseOperation]) -> Result<(), DeviceError>;

	/// Drops the pulses queued on `channel` but not yet played.
	async fn clear_pulses(&self, channel: Channel) -> Result<(), DeviceError>;
}

/// One pairing attempt: owns the event stream and the pairing artifact.
#[async_trait]
pub trait DeviceLink: Send {
	/// URL the app scans to pair.
	fn pairing_url(&self) -> String;

	fn control(&self) -> Arc<dyn DeviceControl>;

	/// Waits for the app to accept the pairing.
	async fn bind(&mut self) -> Result<(), DeviceError>;

	/// Next event, `None` once the link is gone.
	async fn next_event(&mut self) -> Option<DeviceEvent>;

	/// Tears the link down.
	async fn close(self: Box<Self>);
}

/// Opens a fresh [`DeviceLink`] for each connection lifecycle.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
	async fn open(&self) -> Result<Box<dyn DeviceLink>, DeviceError>;
}
