//! Routes parsed commands to session operations and sends the replies.

use std::sync::Arc;

use dglab_protocol::StrengthOperation;
use tracing::{debug, error, info, warn};

use crate::command::{Command, CommandKind, ParseError, parse};
use crate::device::DeviceConnector;
use crate::pulse_loop::run_lifecycle;
use crate::reply;
use crate::schema::{ChangeArgs, Rejection, StrengthArgs, validate_change, validate_strength};
use crate::session::{ConnectionState, Session};
use crate::transport::{ChatTransport, MediaRef, PairingPublisher, ReplyTarget};
use crate::waveform::WaveformCatalog;

/// What to send back for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
	Text(String),
	Media(MediaRef),
}

impl From<Rejection> for Reply {
	fn from(rejection: Rejection) -> Self {
		Reply::Text(rejection.to_string())
	}
}

impl From<&str> for Reply {
	fn from(text: &str) -> Self {
		Reply::Text(text.to_string())
	}
}

pub struct Dispatcher {
	session: Session,
	catalog: Arc<WaveformCatalog>,
	transport: Arc<dyn ChatTransport>,
	publisher: Arc<dyn PairingPublisher>,
	connector: Arc<dyn DeviceConnector>,
}

impl Dispatcher {
	pub fn new(
		session: Session,
		catalog: Arc<WaveformCatalog>,
		transport: Arc<dyn ChatTransport>,
		publisher: Arc<dyn PairingPublisher>,
		connector: Arc<dyn DeviceConnector>,
	) -> Self {
		Self {
			session,
			catalog,
			transport,
			publisher,
			connector,
		}
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	/// Handles one inbound chat message end to end.
	pub async fn handle(&self, target: &ReplyTarget, text: &str) {
		let reply = match parse(text) {
			Ok(command) => {
				debug!(target = "dglab", command = %command.name, args = ?command.args, "command received");
				Some(self.execute(target, &command).await)
			}
			Err(ParseError::Empty) => {
				debug!(target = "dglab", "ignoring empty message");
				None
			}
			Err(err @ ParseError::Unknown(_)) => {
				debug!(target = "dglab", text, "unknown command");
				Some(Reply::Text(err.to_string()))
			}
		};
		if let Some(reply) = reply {
			self.send(target, &reply).await;
		}
	}

	/// Runs `command` and returns the reply, without sending it.
	pub async fn execute(&self, target: &ReplyTarget, command: &Command) -> Reply {
		match command.kind {
			CommandKind::Connect => self.connect(target, &command.args).await,
			CommandKind::Set => self.strength(StrengthOperation::SetTo, &command.args).await,
			CommandKind::Increase => self.strength(StrengthOperation::Increase, &command.args).await,
			CommandKind::Decrease => self.strength(StrengthOperation::Decrease, &command.args).await,
			CommandKind::Close => self.close(),
			CommandKind::Status => self.status(&command.args),
			CommandKind::Change => self.change(&command.args),
			CommandKind::Help => Reply::Text(reply::help(&self.catalog.names())),
		}
	}

	async fn send(&self, target: &ReplyTarget, reply: &Reply) {
		let result = match reply {
			Reply::Text(text) => self.transport.send_text(target, text).await,
			Reply::Media(media) => self.transport.send_media(target, media).await,
		};
		if let Err(err) = result {
			error!(target = "dglab", group = %target.group_id, error = %err, "failed to send reply");
		}
	}

	async fn connect(&self, target: &ReplyTarget, args: &[String]) -> Reply {
		if !args.is_empty() {
			return Rejection::UnexpectedArgs { command: "connect" }.into();
		}
		match self.session.state() {
			ConnectionState::Bound => return reply::ALREADY_CONNECTED.into(),
			ConnectionState::Pairing => {
				return match self.session.pairing_media() {
					Some(media) => {
						info!(target = "dglab", "resending pairing code");
						Reply::Media(media)
					}
					None => reply::AWAITING_CONNECTION.into(),
				};
			}
			ConnectionState::Unbound => {}
		}

		let link = match self.connector.open().await {
			Ok(link) => link,
			Err(err) => {
				error!(target = "dglab", error = %err, "failed to open pairing server");
				return reply::SERVER_START_FAILED.into();
			}
		};

		let pairing_url = link.pairing_url();
		info!(target = "dglab", url = %pairing_url, "pairing server ready");
		let media = match self.publisher.publish(target, &pairing_url).await {
			Ok(media) => media,
			Err(err) => {
				warn!(target = "dglab", error = %err, "failed to publish pairing code");
				link.close().await;
				return reply::UPLOAD_FAILED.into();
			}
		};

		let Some(guard) = self.session.begin_pairing(media.clone()) else {
			link.close().await;
			return reply::ALREADY_CONNECTED.into();
		};
		tokio::spawn(run_lifecycle(guard, link, self.catalog.clone()));
		Reply::Media(media)
	}

	async fn strength(&self, operation: StrengthOperation, args: &[String]) -> Reply {
		let StrengthArgs { channel, value } = match validate_strength(&self.session, args) {
			Ok(parsed) => parsed,
			Err(rejection) => return rejection.into(),
		};
		let Some(control) = self.session.control() else {
			return Rejection::NotConnected.into();
		};

		match control.set_strength(channel, operation, value).await {
			Ok(()) => {
				info!(target = "dglab", channel = %channel, mode = operation.mode(), value, "strength command sent");
				Reply::Text(reply::strength(channel, operation, value))
			}
			Err(err) => {
				warn!(target = "dglab", channel = %channel, error = %err, "strength command failed");
				reply::SEND_FAILED.into()
			}
		}
	}

	fn change(&self, args: &[String]) -> Reply {
		let ChangeArgs { channel, waveform } =
			match validate_change(&self.session, &self.catalog.names(), args) {
				Ok(parsed) => parsed,
				Err(rejection) => return rejection.into(),
			};
		self.session.set_waveform(channel, &waveform);
		Reply::Text(reply::waveform_changed(channel, &waveform))
	}

	fn close(&self) -> Reply {
		self.session.request_close();
		reply::CLOSE_SENT.into()
	}

	fn status(&self, args: &[String]) -> Reply {
		if !args.is_empty() {
			return Rejection::UnexpectedArgs { command: "status" }.into();
		}
		Reply::Text(reply::status(&self.session.snapshot()))
	}
}
