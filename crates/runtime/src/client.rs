//! In-process client the app binds to.

use dglab_protocol::{
	AppCommand, AppReport, Channel, Envelope, FeedbackButton, MAX_MESSAGE_LEN,
	MAX_PULSES_PER_MESSAGE, MessageType, ProtocolError, PulseOperation, RetCode, StrengthData,
	StrengthOperation, pairing_url,
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::state::SharedState;

/// Something that happened on the relay, as seen by a local client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
	/// An app accepted the pairing.
	Bound { target_id: String },
	Strength(StrengthData),
	Feedback(FeedbackButton),
	Heartbeat,
	/// The bound app went away.
	Disconnected,
	/// The relay answered with a non-success code.
	Refused(RetCode),
	/// A frame whose payload could not be understood.
	Invalid { raw: String, error: ProtocolError },
}

/// Receiving half of a local client plus its pairing details.
pub struct LocalClient {
	client_id: String,
	port: u16,
	target_id: Option<String>,
	events: mpsc::Receiver<Envelope>,
	state: SharedState,
}

impl LocalClient {
	pub(crate) fn new(
		client_id: String,
		port: u16,
		events: mpsc::Receiver<Envelope>,
		state: SharedState,
	) -> Self {
		Self {
			client_id,
			port,
			target_id: None,
			events,
			state,
		}
	}

	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Id of the bound app, if any.
	pub fn target_id(&self) -> Option<&str> {
		self.target_id.as_deref()
	}

	/// URL to encode in the pairing QR code, reachable at `host`.
	pub fn pairing_url(&self, host: &str) -> String {
		pairing_url(host, self.port, &self.client_id)
	}

	/// Cloneable sending half.
	pub fn handle(&self) -> ClientHandle {
		ClientHandle {
			client_id: self.client_id.clone(),
			state: self.state.clone(),
		}
	}

	/// Waits until an app binds, skipping heartbeats. Returns the app's id.
	pub async fn bind(&mut self) -> Result<String> {
		loop {
			match self.recv().await {
				Some(ClientEvent::Bound { target_id }) => return Ok(target_id),
				Some(ClientEvent::Heartbeat) => {}
				Some(other) => {
					debug!(target = "dglab", client = %self.client_id, event = ?other, "ignored while waiting for bind");
				}
				None => return Err(Error::ServerClosed),
			}
		}
	}

	/// Next event, or `None` once the server is gone.
	pub async fn recv(&mut self) -> Option<ClientEvent> {
		let envelope = self.events.recv().await?;
		Some(self.translate(envelope))
	}

	fn translate(&mut self, envelope: Envelope) -> ClientEvent {
		match envelope.kind {
			MessageType::Bind => match envelope.ret_code() {
				Ok(RetCode::Success) => {
					self.target_id = Some(envelope.target_id.clone());
					ClientEvent::Bound {
						target_id: envelope.target_id,
					}
				}
				Ok(code) => ClientEvent::Refused(code),
				Err(error) => ClientEvent::Invalid {
					raw: envelope.message,
					error,
				},
			},
			MessageType::Msg => match AppReport::parse(&envelope.message) {
				Ok(AppReport::Strength(data)) => ClientEvent::Strength(data),
				Ok(AppReport::Feedback(button)) => ClientEvent::Feedback(button),
				Err(error) => ClientEvent::Invalid {
					raw: envelope.message,
					error,
				},
			},
			MessageType::Heartbeat => ClientEvent::Heartbeat,
			MessageType::Break => {
				self.target_id = None;
				ClientEvent::Disconnected
			}
			MessageType::Error => match envelope.ret_code() {
				Ok(code) => ClientEvent::Refused(code),
				Err(error) => ClientEvent::Invalid {
					raw: envelope.message,
					error,
				},
			},
		}
	}
}

/// Sends commands to whichever app is bound to the client.
#[derive(Clone)]
pub struct ClientHandle {
	client_id: String,
	state: SharedState,
}

impl ClientHandle {
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	pub fn is_bound(&self) -> bool {
		self.state.peer_of(&self.client_id).is_some()
	}

	pub fn send(&self, command: &AppCommand) -> Result<()> {
		let app_id = self
			.state
			.peer_of(&self.client_id)
			.ok_or_else(|| Error::NotBound(self.client_id.clone()))?;
		let envelope = Envelope::new(
			MessageType::Msg,
			self.client_id.clone(),
			app_id.clone(),
			command.to_message(),
		);
		if envelope.message.len() > MAX_MESSAGE_LEN {
			return Err(Error::Rejected(RetCode::MessageTooLong));
		}
		if !self.state.send_remote(&app_id, &envelope) {
			return Err(Error::NotBound(self.client_id.clone()));
		}
		Ok(())
	}

	pub fn set_strength(&self, channel: Channel, operation: StrengthOperation, value: u8) -> Result<()> {
		self.send(&AppCommand::Strength {
			channel,
			operation,
			value,
		})
	}

	/// Queues pulses on the app, split into messages of at most 100 units.
	pub fn add_pulses(&self, channel: Channel, pulses: &[PulseOperation]) -> Result<()> {
		for chunk in pulses.chunks(MAX_PULSES_PER_MESSAGE) {
			self.send(&AppCommand::pulse(channel, chunk.to_vec())?)?;
		}
		Ok(())
	}

	/// Empties the app's pulse queue for `channel`.
	pub fn clear_pulses(&self, channel: Channel) -> Result<()> {
		self.send(&AppCommand::Clear(channel))
	}
}
