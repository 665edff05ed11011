//! The single device session and its connection lifecycle.
//!
//! [`Session`] is a cheap handle shared by the dispatcher and the lifecycle
//! task. A lifecycle starts with [`Session::begin_pairing`], which is the only
//! way out of [`ConnectionState::Unbound`] and hands back a [`LifecycleGuard`].
//! While the guard lives no second lifecycle can start; dropping it returns the
//! session to `Unbound`.

use std::sync::Arc;

use dglab_protocol::{Channel, StrengthData};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::device::DeviceControl;
use crate::transport::MediaRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
	/// No connection attempt active.
	Unbound,
	/// Pairing code issued, waiting for the app.
	Pairing,
	/// App bound, polling loop running.
	Bound,
}

/// Point-in-time copy of the session fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
	pub state: ConnectionState,
	pub waveforms: [String; 2],
	pub last_strength: Option<StrengthData>,
	pub close_requested: bool,
	pub pulse_loop_closed: bool,
}

struct Inner {
	state: ConnectionState,
	waveforms: [String; 2],
	waveform_changed: [bool; 2],
	last_strength: Option<StrengthData>,
	close_requested: bool,
	pulse_loop_closed: bool,
	pairing_media: Option<MediaRef>,
	control: Option<Arc<dyn DeviceControl>>,
	abort_pairing: Option<Arc<Notify>>,
}

#[derive(Clone)]
pub struct Session {
	inner: Arc<Mutex<Inner>>,
}

impl Session {
	pub fn new(default_waveform: &str) -> Self {
		Self {
			inner: Arc::new(Mutex::new(Inner {
				state: ConnectionState::Unbound,
				waveforms: [default_waveform.to_string(), default_waveform.to_string()],
				waveform_changed: [false; 2],
				last_strength: None,
				close_requested: false,
				pulse_loop_closed: false,
				pairing_media: None,
				control: None,
				abort_pairing: None,
			})),
		}
	}

	pub fn state(&self) -> ConnectionState {
		self.inner.lock().state
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		let inner = self.inner.lock();
		SessionSnapshot {
			state: inner.state,
			waveforms: inner.waveforms.clone(),
			last_strength: inner.last_strength,
			close_requested: inner.close_requested,
			pulse_loop_closed: inner.pulse_loop_closed,
		}
	}

	/// Media reference of the pairing code while pairing.
	pub fn pairing_media(&self) -> Option<MediaRef> {
		let inner = self.inner.lock();
		match inner.state {
			ConnectionState::Pairing => inner.pairing_media.clone(),
			_ => None,
		}
	}

	/// Device commands, available only while bound.
	pub fn control(&self) -> Option<Arc<dyn DeviceControl>> {
		let inner = self.inner.lock();
		match inner.state {
			ConnectionState::Bound => inner.control.clone(),
			_ => None,
		}
	}

	pub fn waveform(&self, channel: Channel) -> String {
		self.inner.lock().waveforms[channel.index()].clone()
	}

	/// Takes effect on the next polling tick, which also flushes the pulses
	/// already queued on `channel`.
	pub fn set_waveform(&self, channel: Channel, name: &str) {
		let mut inner = self.inner.lock();
		inner.waveforms[channel.index()] = name.to_string();
		inner.waveform_changed[channel.index()] = true;
		debug!(target = "dglab", channel = %channel, waveform = name, "waveform selected");
	}

	/// Consumes the pending selection change on `channel`.
	pub fn take_waveform_change(&self, channel: Channel) -> bool {
		std::mem::take(&mut self.inner.lock().waveform_changed[channel.index()])
	}

	pub fn last_strength(&self) -> Option<StrengthData> {
		self.inner.lock().last_strength
	}

	pub fn record_strength(&self, data: StrengthData) {
		self.inner.lock().last_strength = Some(data);
	}

	/// Asks the lifecycle to end. Observed at the next tick, or at once while pairing.
	pub fn request_close(&self) {
		let mut inner = self.inner.lock();
		inner.close_requested = true;
		inner.pulse_loop_closed = true;
		if let Some(abort) = &inner.abort_pairing {
			abort.notify_one();
		}
		info!(target = "dglab", state = ?inner.state, "close requested");
	}

	/// Consumes a pending close request, clearing both flags.
	pub fn take_close_request(&self) -> bool {
		let mut inner = self.inner.lock();
		if !inner.close_requested {
			return false;
		}
		inner.close_requested = false;
		inner.pulse_loop_closed = false;
		true
	}

	pub fn pulse_loop_closed(&self) -> bool {
		self.inner.lock().pulse_loop_closed
	}

	/// Moves `Unbound → Pairing` and starts a lifecycle.
	///
	/// Returns `None` if a lifecycle is already running.
	pub fn begin_pairing(&self, media: MediaRef) -> Option<LifecycleGuard> {
		let mut inner = self.inner.lock();
		if inner.state != ConnectionState::Unbound {
			return None;
		}
		let abort = Arc::new(Notify::new());
		inner.state = ConnectionState::Pairing;
		inner.pairing_media = Some(media);
		inner.last_strength = None;
		inner.waveform_changed = [false; 2];
		inner.close_requested = false;
		inner.pulse_loop_closed = false;
		inner.abort_pairing = Some(abort.clone());
		info!(target = "dglab", "session pairing");
		Some(LifecycleGuard {
			session: self.clone(),
			abort,
		})
	}

	#[cfg(test)]
	pub(crate) fn force_state(&self, state: ConnectionState) {
		self.inner.lock().state = state;
	}
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("Session")
			.field("state", &inner.state)
			.field("waveforms", &inner.waveforms)
			.field("last_strength", &inner.last_strength)
			.finish_non_exhaustive()
	}
}

/// Proof that the current lifecycle owns the session.
///
/// Dropping it ends the lifecycle: the session goes back to `Unbound`.
pub struct LifecycleGuard {
	session: Session,
	abort: Arc<Notify>,
}

impl LifecycleGuard {
	pub fn session(&self) -> &Session {
		&self.session
	}

	/// Notified when `close` arrives before the app binds.
	pub fn abort_signal(&self) -> Arc<Notify> {
		self.abort.clone()
	}

	/// `Pairing → Bound`.
	pub fn mark_bound(&self, control: Arc<dyn DeviceControl>) -> bool {
		let mut inner = self.session.inner.lock();
		if inner.state != ConnectionState::Pairing {
			return false;
		}
		inner.state = ConnectionState::Bound;
		inner.control = Some(control);
		inner.pairing_media = None;
		inner.abort_pairing = None;
		info!(target = "dglab", "session bound");
		true
	}

	/// The app went away: `Bound → Unbound` with the pulse loop marked closed.
	pub fn mark_remote_disconnect(&self) {
		let mut inner = self.session.inner.lock();
		inner.pulse_loop_closed = true;
		reset(&mut inner);
		info!(target = "dglab", "app disconnected");
	}
}

impl Drop for LifecycleGuard {
	fn drop(&mut self) {
		let mut inner = self.session.inner.lock();
		if inner.state != ConnectionState::Unbound {
			reset(&mut inner);
			info!(target = "dglab", "session unbound");
		}
	}
}

fn reset(inner: &mut Inner) {
	inner.state = ConnectionState::Unbound;
	inner.control = None;
	inner.pairing_media = None;
	inner.abort_pairing = None;
}
