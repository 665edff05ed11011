//! Shared relay bookkeeping: remote connections, local clients and the pairs between them.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use dglab_protocol::{Envelope, MessageType, RetCode};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Outcome of an app's bind request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindOutcome {
	Bound,
	Refused(RetCode),
}

#[derive(Default)]
pub(crate) struct RelayState {
	/// App websocket connections by their server-assigned id.
	pub(crate) remotes: DashMap<String, mpsc::UnboundedSender<Message>>,
	/// In-process clients by id.
	pub(crate) locals: DashMap<String, mpsc::Sender<Envelope>>,
	/// Bound pairs, stored in both directions.
	bindings: Mutex<HashMap<String, String>>,
}

pub(crate) type SharedState = Arc<RelayState>;

impl RelayState {
	pub(crate) fn peer_of(&self, id: &str) -> Option<String> {
		self.bindings.lock().get(id).cloned()
	}

	/// Pairs `local_id` with `app_id` when both exist and neither is already bound.
	pub(crate) fn bind(&self, local_id: &str, app_id: &str) -> BindOutcome {
		if !self.locals.contains_key(local_id) {
			return BindOutcome::Refused(RetCode::TargetClientNotFound);
		}
		if !self.remotes.contains_key(app_id) {
			return BindOutcome::Refused(RetCode::IncompatibleRelationship);
		}

		let mut bindings = self.bindings.lock();
		if bindings.contains_key(local_id) || bindings.contains_key(app_id) {
			return BindOutcome::Refused(RetCode::IdAlreadyBound);
		}
		bindings.insert(local_id.to_string(), app_id.to_string());
		bindings.insert(app_id.to_string(), local_id.to_string());
		BindOutcome::Bound
	}

	/// Drops the pair containing `id`, returning the other side.
	pub(crate) fn unbind(&self, id: &str) -> Option<String> {
		let mut bindings = self.bindings.lock();
		let peer = bindings.remove(id)?;
		bindings.remove(&peer);
		Some(peer)
	}

	pub(crate) fn send_remote(&self, app_id: &str, envelope: &Envelope) -> bool {
		let Some(tx) = self.remotes.get(app_id).map(|r| r.value().clone()) else {
			return false;
		};
		tx.send(Message::Text(envelope.to_json().into())).is_ok()
	}

	/// Queues `envelope` for a local client, waiting if its buffer is full.
	pub(crate) async fn send_local(&self, local_id: &str, envelope: Envelope) -> bool {
		let Some(tx) = self.locals.get(local_id).map(|r| r.value().clone()) else {
			debug!(target = "dglab", client = local_id, "dropping frame for unknown local client");
			return false;
		};
		tx.send(envelope).await.is_ok()
	}

	/// Sends a heartbeat to every connection and local client.
	///
	/// Local heartbeats are dropped rather than queued when the client is behind.
	pub(crate) fn broadcast_heartbeat(&self) {
		let remotes: Vec<(String, mpsc::UnboundedSender<Message>)> = self
			.remotes
			.iter()
			.map(|r| (r.key().clone(), r.value().clone()))
			.collect();
		for (id, tx) in remotes {
			let peer = self.peer_of(&id).unwrap_or_default();
			let frame = Envelope::code(MessageType::Heartbeat, id, peer, RetCode::Success);
			let _ = tx.send(Message::Text(frame.to_json().into()));
		}

		let locals: Vec<(String, mpsc::Sender<Envelope>)> = self
			.locals
			.iter()
			.map(|r| (r.key().clone(), r.value().clone()))
			.collect();
		for (id, tx) in locals {
			let peer = self.peer_of(&id).unwrap_or_default();
			let frame = Envelope::code(MessageType::Heartbeat, id.clone(), peer, RetCode::Success);
			if tx.try_send(frame).is_err() {
				warn!(target = "dglab", client = %id, "local client lagging, heartbeat dropped");
			}
		}
	}

	/// Forgets every connection so their queues close.
	pub(crate) fn clear(&self) {
		self.remotes.clear();
		self.locals.clear();
		self.bindings.lock().clear();
	}
}
