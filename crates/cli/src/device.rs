//! The relay runtime behind the session core's device traits.

use std::sync::Arc;

use async_trait::async_trait;
use dglab::{DeviceConnector, DeviceControl, DeviceError, DeviceEvent, DeviceLink};
use dglab_protocol::{Channel, PulseOperation, StrengthOperation};
use dglab_runtime::{ClientEvent, ClientHandle, LocalClient, PairingServer, ServerConfig};
use tracing::info;

/// Starts a fresh pairing server for every lifecycle.
pub struct RelayConnector {
	server: ServerConfig,
	public_host: String,
}

impl RelayConnector {
	pub fn new(server: ServerConfig, public_host: impl Into<String>) -> Self {
		Self {
			server,
			public_host: public_host.into(),
		}
	}
}

#[async_trait]
impl DeviceConnector for RelayConnector {
	async fn open(&self) -> Result<Box<dyn DeviceLink>, DeviceError> {
		let server = PairingServer::start(self.server.clone())
			.await
			.map_err(|e| DeviceError::Start(e.to_string()))?;
		let client = server.new_local_client();
		let pairing_url = client.pairing_url(&self.public_host);
		Ok(Box::new(RelayLink {
			server,
			client,
			pairing_url,
		}))
	}
}

pub struct RelayLink {
	server: PairingServer,
	client: LocalClient,
	pairing_url: String,
}

#[async_trait]
impl DeviceLink for RelayLink {
	fn pairing_url(&self) -> String {
		self.pairing_url.clone()
	}

	fn control(&self) -> Arc<dyn DeviceControl> {
		Arc::new(RelayControl {
			handle: self.client.handle(),
		})
	}

	async fn bind(&mut self) -> Result<(), DeviceError> {
		let app_id = self
			.client
			.bind()
			.await
			.map_err(|e| DeviceError::Bind(e.to_string()))?;
		info!(target = "dglab", client = %self.client.client_id(), app = %app_id, "app bound");
		Ok(())
	}

	async fn next_event(&mut self) -> Option<DeviceEvent> {
		let event = match self.client.recv().await? {
			ClientEvent::Strength(data) => DeviceEvent::Strength(data),
			ClientEvent::Feedback(button) => DeviceEvent::Feedback(button),
			ClientEvent::Heartbeat => DeviceEvent::Heartbeat,
			ClientEvent::Disconnected => DeviceEvent::Disconnected,
			ClientEvent::Bound { target_id } => DeviceEvent::Unexpected(format!("bind from {target_id}")),
			ClientEvent::Refused(code) => DeviceEvent::Unexpected(format!("relay code {code}")),
			ClientEvent::Invalid { raw, error } => DeviceEvent::Unexpected(format!("{raw}: {error}")),
		};
		Some(event)
	}

	async fn close(self: Box<Self>) {
		self.server.shutdown().await;
	}
}

struct RelayControl {
	handle: ClientHandle,
}

fn device_error(err: dglab_runtime::Error) -> DeviceError {
	match err {
		dglab_runtime::Error::NotBound(_) => DeviceError::NotBound,
		other => DeviceError::Send(other.to_string()),
	}
}

#[async_trait]
impl DeviceControl for RelayControl {
	async fn set_strength(
		&self,
		channel: Channel,
		operation: StrengthOperation,
		value: u8,
	) -> Result<(), DeviceError> {
		self.handle
			.set_strength(channel, operation, value)
			.map_err(device_error)
	}

	async fn add_pulses(&self, channel: Channel, pulses: &[PulseOperation]) -> Result<(), DeviceError> {
		self.handle.add_pulses(channel, pulses).map_err(device_error)
	}

	async fn clear_pulses(&self, channel: Channel) -> Result<(), DeviceError> {
		self.handle.clear_pulses(channel).map_err(device_error)
	}
}
