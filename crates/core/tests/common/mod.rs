//! In-process fakes for the collaborators around the session core.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dglab::{
	Channel, ChatTransport, ConnectionState, DeviceConnector, DeviceControl, DeviceError,
	DeviceEvent, DeviceLink, Dispatcher, MediaRef, PairingPublisher, PulseOperation, ReplyTarget,
	Session, StrengthOperation, TransportError, UploadError, WaveformCatalog,
};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
	Text(String),
	Media(MediaRef),
}

#[derive(Default)]
pub struct RecordingTransport {
	sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
	pub fn sent(&self) -> Vec<Sent> {
		self.sent.lock().clone()
	}

	pub fn last(&self) -> Option<Sent> {
		self.sent.lock().last().cloned()
	}

	pub fn last_text(&self) -> String {
		match self.last() {
			Some(Sent::Text(text)) => text,
			other => panic!("expected a text reply, got {other:?}"),
		}
	}
}

#[async_trait]
impl ChatTransport for RecordingTransport {
	async fn send_text(&self, _target: &ReplyTarget, text: &str) -> Result<(), TransportError> {
		self.sent.lock().push(Sent::Text(text.to_string()));
		Ok(())
	}

	async fn upload_media(&self, _target: &ReplyTarget, url: &str) -> Result<MediaRef, TransportError> {
		Ok(MediaRef(format!("chat:{url}")))
	}

	async fn send_media(&self, _target: &ReplyTarget, media: &MediaRef) -> Result<(), TransportError> {
		self.sent.lock().push(Sent::Media(media.clone()));
		Ok(())
	}
}

#[derive(Default)]
pub struct FakePublisher {
	pub publishes: AtomicUsize,
	pub fail: AtomicBool,
}

#[async_trait]
impl PairingPublisher for FakePublisher {
	async fn publish(&self, _target: &ReplyTarget, pairing_url: &str) -> Result<MediaRef, UploadError> {
		if self.fail.load(Ordering::SeqCst) {
			return Err(UploadError::Rejected {
				code: "flood".into(),
				message: "too many uploads".into(),
			});
		}
		let n = self.publishes.fetch_add(1, Ordering::SeqCst) + 1;
		Ok(MediaRef(format!("media-{n}:{pairing_url}")))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Strength(Channel, StrengthOperation, u8),
	Pulses(Channel, Vec<PulseOperation>),
	Clear(Channel),
}

#[derive(Default)]
pub struct FakeControl {
	calls: Mutex<Vec<Call>>,
}

impl FakeControl {
	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn strength_calls(&self) -> Vec<Call> {
		self.calls()
			.into_iter()
			.filter(|c| matches!(c, Call::Strength(..)))
			.collect()
	}

	pub fn pulse_calls(&self) -> Vec<(Channel, Vec<PulseOperation>)> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				Call::Pulses(channel, pulses) => Some((channel, pulses)),
				Call::Strength(..) | Call::Clear(_) => None,
			})
			.collect()
	}
}

#[async_trait]
impl DeviceControl for FakeControl {
	async fn set_strength(
		&self,
		channel: Channel,
		operation: StrengthOperation,
		value: u8,
	) -> Result<(), DeviceError> {
		self.calls.lock().push(Call::Strength(channel, operation, value));
		Ok(())
	}

	async fn add_pulses(&self, channel: Channel, pulses: &[PulseOperation]) -> Result<(), DeviceError> {
		self.calls.lock().push(Call::Pulses(channel, pulses.to_vec()));
		Ok(())
	}

	async fn clear_pulses(&self, channel: Channel) -> Result<(), DeviceError> {
		self.calls.lock().push(Call::Clear(channel));
		Ok(())
	}
}

/// The app's side of one fake link.
pub struct AppSide {
	bind: Option<oneshot::Sender<()>>,
	pub events: mpsc::Sender<DeviceEvent>,
	pub control: Arc<FakeControl>,
	pub closed: Arc<AtomicBool>,
}

impl AppSide {
	pub fn accept(&mut self) {
		if let Some(bind) = self.bind.take() {
			let _ = bind.send(());
		}
	}

	pub async fn emit(&self, event: DeviceEvent) {
		self.events.send(event).await.expect("link dropped");
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}
}

struct FakeLink {
	url: String,
	bind: Option<oneshot::Receiver<()>>,
	events: mpsc::Receiver<DeviceEvent>,
	control: Arc<FakeControl>,
	closed: Arc<AtomicBool>,
}

#[async_trait]
impl DeviceLink for FakeLink {
	fn pairing_url(&self) -> String {
		self.url.clone()
	}

	fn control(&self) -> Arc<dyn DeviceControl> {
		self.control.clone()
	}

	async fn bind(&mut self) -> Result<(), DeviceError> {
		let Some(bind) = self.bind.take() else {
			return Err(DeviceError::Bind("already waited".into()));
		};
		bind.await.map_err(|_| DeviceError::Bind("app side dropped".into()))
	}

	async fn next_event(&mut self) -> Option<DeviceEvent> {
		self.events.recv().await
	}

	async fn close(self: Box<Self>) {
		self.closed.store(true, Ordering::SeqCst);
	}
}

#[derive(Default)]
pub struct FakeConnector {
	opened: Mutex<Vec<AppSide>>,
	opens: AtomicUsize,
	pub fail: AtomicBool,
}

impl FakeConnector {
	pub fn open_count(&self) -> usize {
		self.opens.load(Ordering::SeqCst)
	}

	/// Takes the app side of the most recent link.
	pub fn take_app(&self) -> AppSide {
		self.opened.lock().pop().expect("no link opened")
	}
}

#[async_trait]
impl DeviceConnector for FakeConnector {
	async fn open(&self) -> Result<Box<dyn DeviceLink>, DeviceError> {
		if self.fail.load(Ordering::SeqCst) {
			return Err(DeviceError::Start("address in use".into()));
		}
		let (bind_tx, bind_rx) = oneshot::channel();
		let (events_tx, events_rx) = mpsc::channel(16);
		let control = Arc::new(FakeControl::default());
		let closed = Arc::new(AtomicBool::new(false));
		let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
		let url = format!("fake://pair/{n}");
		self.opened.lock().push(AppSide {
			bind: Some(bind_tx),
			events: events_tx,
			control: control.clone(),
			closed: closed.clone(),
		});
		Ok(Box::new(FakeLink {
			url,
			bind: Some(bind_rx),
			events: events_rx,
			control,
			closed,
		}))
	}
}

pub struct Harness {
	pub dispatcher: Dispatcher,
	pub transport: Arc<RecordingTransport>,
	pub publisher: Arc<FakePublisher>,
	pub connector: Arc<FakeConnector>,
	pub catalog: Arc<WaveformCatalog>,
	pub target: ReplyTarget,
}

impl Harness {
	pub fn new() -> Self {
		let catalog = Arc::new(WaveformCatalog::builtin());
		let transport = Arc::new(RecordingTransport::default());
		let publisher = Arc::new(FakePublisher::default());
		let connector = Arc::new(FakeConnector::default());
		let dispatcher = Dispatcher::new(
			Session::new(catalog.default_name()),
			catalog.clone(),
			transport.clone(),
			publisher.clone(),
			connector.clone(),
		);
		Self {
			dispatcher,
			transport,
			publisher,
			connector,
			catalog,
			target: ReplyTarget::new("group-1", "msg-1"),
		}
	}

	pub fn session(&self) -> &Session {
		self.dispatcher.session()
	}

	pub async fn say(&self, text: &str) {
		self.dispatcher.handle(&self.target, text).await;
	}

	/// Sends `text` and returns the text reply.
	pub async fn ask(&self, text: &str) -> String {
		self.say(text).await;
		self.transport.last_text()
	}

	/// Connects and lets the app accept; returns the app side.
	pub async fn bound(&self) -> AppSide {
		self.say("connect").await;
		let mut app = self.connector.take_app();
		app.accept();
		wait_for_state(self.session(), ConnectionState::Bound).await;
		app
	}
}

pub async fn wait_for_state(session: &Session, state: ConnectionState) {
	wait_until(|| session.state() == state).await;
}

pub async fn wait_until(mut check: impl FnMut() -> bool) {
	tokio::time::timeout(WAIT, async {
		while !check() {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.expect("condition not reached in time");
}
