//! The lifecycle task: wait for the app to bind, then run the polling loop.
//!
//! One tick tops up each channel with a [`PulseBatch`](crate::PulseBatch) and
//! then waits for exactly one device event. The relay heartbeat keeps ticks
//! coming while the app is silent, so the device buffer never runs dry.
//!
//! Events can arrive much faster than the app plays pulses, so a
//! [`PulsePacer`] tracks how much playback is already queued per channel and
//! only pushes another batch once less than one batch is left.

use std::sync::Arc;
use std::time::Duration;

use dglab_protocol::Channel;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::device::{DeviceControl, DeviceEvent, DeviceLink};
use crate::session::{LifecycleGuard, Session};
use crate::waveform::{PULSE_WINDOW, WaveformCatalog};

/// Playback time of one pulse unit.
pub const PULSE_UNIT: Duration = Duration::from_millis(100);

/// Playback time of one batch (2.5s).
pub const BATCH_PLAYBACK: Duration = PULSE_UNIT.saturating_mul(PULSE_WINDOW as u32);

/// Per-channel estimate of when the queued pulses run out.
///
/// A batch is due while at most [`BATCH_PLAYBACK`] is left, so the queue
/// never holds more than two batches.
#[derive(Debug, Default, Clone)]
pub struct PulsePacer {
	queued_until: [Option<Instant>; 2],
}

impl PulsePacer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Playback still queued on `channel` at `now`.
	pub fn lead(&self, channel: Channel, now: Instant) -> Duration {
		self.queued_until[channel.index()]
			.map(|until| until.saturating_duration_since(now))
			.unwrap_or_default()
	}

	pub fn is_due(&self, channel: Channel, now: Instant) -> bool {
		self.lead(channel, now) <= BATCH_PLAYBACK
	}

	/// Records one batch queued at `now`, behind whatever is still playing.
	pub fn record_batch(&mut self, channel: Channel, now: Instant) {
		let start = match self.queued_until[channel.index()] {
			Some(until) if until > now => until,
			_ => now,
		};
		self.queued_until[channel.index()] = Some(start + BATCH_PLAYBACK);
	}

	/// Forgets the queue on `channel`, after the app was told to drop it.
	pub fn reset(&mut self, channel: Channel) {
		self.queued_until[channel.index()] = None;
	}
}

/// Why the polling loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
	/// `close` was observed at the top of a tick.
	CloseRequested,
	/// The app reported a disconnect.
	RemoteDisconnect,
	/// The event stream ended.
	StreamEnded,
}

/// Runs one tick. `Some` means the loop must stop.
pub async fn tick(
	session: &Session,
	link: &mut dyn DeviceLink,
	control: &dyn DeviceControl,
	catalog: &WaveformCatalog,
	pacer: &mut PulsePacer,
) -> Option<LoopExit> {
	if session.take_close_request() {
		return Some(LoopExit::CloseRequested);
	}

	if !session.pulse_loop_closed() {
		for channel in Channel::ALL {
			feed_channel(session, control, catalog, pacer, channel).await;
		}
	}

	match link.next_event().await {
		Some(DeviceEvent::Strength(data)) => {
			debug!(target = "dglab", a = data.a, b = data.b, a_limit = data.a_limit, b_limit = data.b_limit, "strength reading");
			session.record_strength(data);
			None
		}
		Some(DeviceEvent::Heartbeat) => None,
		Some(DeviceEvent::Feedback(button)) => {
			info!(target = "dglab", button = button.index(), channel = %button.channel(), "feedback button pressed");
			None
		}
		Some(DeviceEvent::Unexpected(raw)) => {
			warn!(target = "dglab", raw = %raw, "ignoring unexpected device event");
			None
		}
		Some(DeviceEvent::Disconnected) => Some(LoopExit::RemoteDisconnect),
		None => Some(LoopExit::StreamEnded),
	}
}

async fn feed_channel(
	session: &Session,
	control: &dyn DeviceControl,
	catalog: &WaveformCatalog,
	pacer: &mut PulsePacer,
	channel: Channel,
) {
	if session.take_waveform_change(channel) {
		match control.clear_pulses(channel).await {
			Ok(()) => pacer.reset(channel),
			Err(error) => {
				warn!(target = "dglab", channel = %channel, error = %error, "pulse clear failed");
			}
		}
	}

	let now = Instant::now();
	if !pacer.is_due(channel, now) {
		return;
	}
	let batch = catalog.batch(&session.waveform(channel));
	match control.add_pulses(channel, batch.pulses()).await {
		Ok(()) => pacer.record_batch(channel, now),
		Err(error) => {
			warn!(target = "dglab", channel = %channel, error = %error, "pulse push failed");
		}
	}
}

/// Ticks until the loop stops.
pub async fn run_polling_loop(
	session: &Session,
	link: &mut dyn DeviceLink,
	control: &dyn DeviceControl,
	catalog: &WaveformCatalog,
) -> LoopExit {
	let mut pacer = PulsePacer::new();
	loop {
		if let Some(exit) = tick(session, link, control, catalog, &mut pacer).await {
			return exit;
		}
	}
}

/// Drives one connection lifecycle from `Pairing` back to `Unbound`.
///
/// The link is closed before the guard is released.
pub async fn run_lifecycle(
	guard: LifecycleGuard,
	mut link: Box<dyn DeviceLink>,
	catalog: Arc<WaveformCatalog>,
) {
	let abort = guard.abort_signal();
	let bound = tokio::select! {
		result = link.bind() => Some(result),
		_ = abort.notified() => None,
	};

	let Some(bound) = bound else {
		info!(target = "dglab", "pairing aborted by close");
		link.close().await;
		return;
	};
	if let Err(error) = bound {
		warn!(target = "dglab", error = %error, "pairing ended before the app bound");
		link.close().await;
		return;
	}

	let control = link.control();
	if !guard.mark_bound(control.clone()) {
		link.close().await;
		return;
	}

	let session = guard.session().clone();
	let exit = run_polling_loop(&session, link.as_mut(), control.as_ref(), &catalog).await;
	info!(target = "dglab", exit = ?exit, "polling loop stopped");

	link.close().await;
	match exit {
		LoopExit::CloseRequested => {}
		LoopExit::RemoteDisconnect | LoopExit::StreamEnded => guard.mark_remote_disconnect(),
	}
}
