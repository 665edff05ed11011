//! The relay websocket server the app connects to.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use dglab_protocol::{
	BIND_ASSIGN_MESSAGE, BIND_REQUEST_MESSAGE, Envelope, MAX_MESSAGE_LEN, MessageType, RetCode,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::LocalClient;
use crate::error::{Error, Result};
use crate::state::{BindOutcome, RelayState, SharedState};

/// Default port the app is pointed at.
pub const DEFAULT_PORT: u16 = 5678;

/// Default heartbeat period; shorter than one 25-unit pulse batch (2.5s), so
/// the polling loop ticks before the queued pulses run out.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Default capacity of each local client's event queue.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct ServerConfig {
	/// Interface to listen on.
	pub host: String,
	/// Port to listen on, `0` picks a free one.
	pub port: u16,
	pub heartbeat_interval: Duration,
	pub event_buffer: usize,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: DEFAULT_PORT,
			heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
			event_buffer: DEFAULT_EVENT_BUFFER,
		}
	}
}

#[derive(Clone)]
struct ServerContext {
	state: SharedState,
	shutdown: watch::Receiver<bool>,
}

/// A running relay. Dropping it stops the listener, the heartbeat and every connection.
pub struct PairingServer {
	state: SharedState,
	local_addr: SocketAddr,
	event_buffer: usize,
	shutdown_tx: watch::Sender<bool>,
	serve_task: Option<JoinHandle<()>>,
	heartbeat_task: Option<JoinHandle<()>>,
}

impl PairingServer {
	pub async fn start(config: ServerConfig) -> Result<Self> {
		let addr = format!("{}:{}", config.host, config.port);
		let listener = TcpListener::bind((config.host.as_str(), config.port))
			.await
			.map_err(|source| Error::Listen {
				addr: addr.clone(),
				source,
			})?;
		let local_addr = listener.local_addr()?;

		let state: SharedState = Arc::new(RelayState::default());
		let (shutdown_tx, shutdown_rx) = watch::channel(false);

		let app = Router::new()
			.route("/", get(upgrade_root))
			.route("/{client_id}", get(upgrade_with_id))
			.with_state(ServerContext {
				state: Arc::clone(&state),
				shutdown: shutdown_rx.clone(),
			});

		info!(target = "dglab", addr = %local_addr, "pairing server listening");

		let mut serve_shutdown = shutdown_rx.clone();
		let serve_task = tokio::spawn(async move {
			let result = axum::serve(listener, app.into_make_service())
				.with_graceful_shutdown(async move {
					let _ = serve_shutdown.wait_for(|stop| *stop).await;
				})
				.await;
			if let Err(err) = result {
				warn!(target = "dglab", error = %err, "pairing server stopped with error");
			}
		});

		let heartbeat_task = tokio::spawn(heartbeat_loop(
			Arc::clone(&state),
			config.heartbeat_interval,
			shutdown_rx,
		));

		Ok(Self {
			state,
			local_addr,
			event_buffer: config.event_buffer.max(1),
			shutdown_tx,
			serve_task: Some(serve_task),
			heartbeat_task: Some(heartbeat_task),
		})
	}

	pub fn local_addr(&self) -> SocketAddr {
		self.local_addr
	}

	/// Registers an in-process client the app can bind to.
	pub fn new_local_client(&self) -> LocalClient {
		let client_id = Uuid::new_v4().to_string();
		let (tx, rx) = mpsc::channel(self.event_buffer);
		self.state.locals.insert(client_id.clone(), tx);
		debug!(target = "dglab", client = %client_id, "local client registered");
		LocalClient::new(client_id, self.local_addr.port(), rx, Arc::clone(&self.state))
	}

	/// Stops the server and waits for its tasks to finish.
	pub async fn shutdown(mut self) {
		self.signal_shutdown();
		if let Some(task) = self.serve_task.take() {
			let _ = task.await;
		}
		if let Some(task) = self.heartbeat_task.take() {
			let _ = task.await;
		}
		info!(target = "dglab", addr = %self.local_addr, "pairing server stopped");
	}

	fn signal_shutdown(&self) {
		let _ = self.shutdown_tx.send(true);
		self.state.clear();
	}
}

impl Drop for PairingServer {
	fn drop(&mut self) {
		self.signal_shutdown();
	}
}

async fn upgrade_root(ws: WebSocketUpgrade, State(ctx): State<ServerContext>) -> Response {
	ws.on_upgrade(move |socket| handle_app_socket(socket, ctx, None))
}

async fn upgrade_with_id(
	Path(client_id): Path<String>,
	ws: WebSocketUpgrade,
	State(ctx): State<ServerContext>,
) -> Response {
	ws.on_upgrade(move |socket| handle_app_socket(socket, ctx, Some(client_id)))
}

/// Resolves once shutdown is signalled, without holding the `watch::Ref`.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
	let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn heartbeat_loop(state: SharedState, interval: Duration, mut shutdown: watch::Receiver<bool>) {
	let mut ticker = tokio::time::interval(interval);
	// First tick fires immediately.
	ticker.tick().await;
	loop {
		tokio::select! {
			_ = ticker.tick() => state.broadcast_heartbeat(),
			_ = stopped(&mut shutdown) => break,
		}
	}
}

async fn handle_app_socket(socket: WebSocket, ctx: ServerContext, requested: Option<String>) {
	let app_id = Uuid::new_v4().to_string();
	let state = ctx.state;
	let mut shutdown = ctx.shutdown;
	if *shutdown.borrow() {
		return;
	}

	info!(target = "dglab", app = %app_id, requested = ?requested, "app connected");

	let (tx, rx) = mpsc::unbounded_channel();
	state.remotes.insert(app_id.clone(), tx);

	let mut rx_stream = UnboundedReceiverStream::new(rx);
	let (mut ws_tx, mut ws_rx) = socket.split();

	let send_task = tokio::spawn(async move {
		while let Some(msg) = rx_stream.next().await {
			if ws_tx.send(msg).await.is_err() {
				break;
			}
		}
	});

	state.send_remote(
		&app_id,
		&Envelope::new(MessageType::Bind, app_id.clone(), "", BIND_ASSIGN_MESSAGE),
	);

	loop {
		tokio::select! {
			_ = stopped(&mut shutdown) => break,
			msg = ws_rx.next() => match msg {
				Some(Ok(Message::Text(text))) => handle_app_frame(&state, &app_id, &text).await,
				Some(Ok(Message::Close(_))) | None => break,
				Some(Ok(_)) => {}
				Some(Err(err)) => {
					warn!(target = "dglab", app = %app_id, error = %err, "app websocket error");
					break;
				}
			},
		}
	}

	state.remotes.remove(&app_id);
	if let Some(local_id) = state.unbind(&app_id) {
		let notice = Envelope::code(
			MessageType::Break,
			local_id.clone(),
			app_id.clone(),
			RetCode::ClientDisconnected,
		);
		state.send_local(&local_id, notice).await;
	}

	send_task.abort();
	info!(target = "dglab", app = %app_id, "app disconnected");
}

async fn handle_app_frame(state: &RelayState, app_id: &str, raw: &str) {
	let reject = |code: RetCode| {
		state.send_remote(app_id, &Envelope::code(MessageType::Error, app_id, "", code));
	};

	let envelope = match Envelope::from_json(raw) {
		Ok(envelope) => envelope,
		Err(err) => {
			debug!(target = "dglab", app = %app_id, error = %err, "non-JSON frame from app");
			reject(RetCode::NonJsonContent);
			return;
		}
	};

	if envelope.message.len() > MAX_MESSAGE_LEN {
		reject(RetCode::MessageTooLong);
		return;
	}

	match envelope.kind {
		MessageType::Bind if envelope.message == BIND_REQUEST_MESSAGE => {
			if envelope.target_id != app_id {
				reject(RetCode::IncompatibleRelationship);
				return;
			}
			let local_id = envelope.client_id;
			match state.bind(&local_id, app_id) {
				BindOutcome::Bound => {
					let accepted = Envelope::code(
						MessageType::Bind,
						local_id.clone(),
						app_id,
						RetCode::Success,
					);
					state.send_remote(app_id, &accepted);
					state.send_local(&local_id, accepted).await;
					info!(target = "dglab", app = %app_id, client = %local_id, "app bound");
				}
				BindOutcome::Refused(code) => {
					warn!(target = "dglab", app = %app_id, client = %local_id, %code, "bind refused");
					state.send_remote(
						app_id,
						&Envelope::code(MessageType::Bind, local_id, app_id, code),
					);
				}
			}
		}
		MessageType::Msg => match state.peer_of(app_id) {
			Some(local_id) if local_id == envelope.client_id => {
				let forwarded =
					Envelope::new(MessageType::Msg, local_id.clone(), app_id, envelope.message);
				state.send_local(&local_id, forwarded).await;
			}
			_ => reject(RetCode::IncompatibleRelationship),
		},
		MessageType::Break => {
			if let Some(local_id) = state.unbind(app_id) {
				let notice = Envelope::code(
					MessageType::Break,
					local_id.clone(),
					app_id,
					RetCode::ClientDisconnected,
				);
				state.send_local(&local_id, notice).await;
			}
		}
		MessageType::Heartbeat => {}
		other => {
			debug!(target = "dglab", app = %app_id, kind = ?other, "ignoring frame from app");
		}
	}
}

#[cfg(test)]
mod tests {
	use std::future::Future;

	use super::*;

	fn assert_send_handler<F, Fut>(_: F)
	where
		F: Fn(WebSocket, ServerContext, Option<String>) -> Fut,
		Fut: Future<Output = ()> + Send,
	{
	}

	#[test]
	fn app_socket_handler_is_send() {
		assert_send_handler(handle_app_socket);
	}

	#[tokio::test]
	async fn stopped_resolves_after_shutdown_signal() {
		let (tx, mut rx) = watch::channel(false);
		let waiter = tokio::spawn(async move { stopped(&mut rx).await });
		tx.send(true).unwrap();
		tokio::time::timeout(Duration::from_secs(1), waiter)
			.await
			.expect("stopped should resolve")
			.unwrap();
	}
}
