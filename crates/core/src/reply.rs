//! Chat reply texts.

use dglab_protocol::{Channel, StrengthData, StrengthOperation};

use crate::command::CommandKind;
use crate::session::{ConnectionState, SessionSnapshot};

pub const ALREADY_CONNECTED: &str = "Already connected to the app, cannot connect again";
pub const UPLOAD_FAILED: &str = "Failed to upload the pairing code";
pub const SERVER_START_FAILED: &str = "Failed to start the pairing server";
pub const CLOSE_SENT: &str = "Disconnect signal sent, the response may take a while";
pub const SEND_FAILED: &str = "Failed to send the command to the app";
pub const NOT_CONNECTED: &str = "Not connected";
pub const AWAITING_CONNECTION: &str = "Currently awaiting connection";
pub const AWAITING_READING: &str = "Connected, awaiting the first strength reading";

/// Echo of a strength command as sent.
pub fn strength(channel: Channel, operation: StrengthOperation, value: u8) -> String {
	match operation {
		StrengthOperation::SetTo => format!("Channel {channel} strength set to {value}"),
		StrengthOperation::Increase => format!("Channel {channel} increased by {value}"),
		StrengthOperation::Decrease => format!("Channel {channel} decreased by {value}"),
	}
}

pub fn waveform_changed(channel: Channel, name: &str) -> String {
	format!("Channel {channel} waveform changed to {name}, the change may take a moment")
}

pub fn status(snapshot: &SessionSnapshot) -> String {
	match (snapshot.state, snapshot.last_strength) {
		(ConnectionState::Unbound, _) => NOT_CONNECTED.to_string(),
		(ConnectionState::Pairing, _) => AWAITING_CONNECTION.to_string(),
		(ConnectionState::Bound, None) => AWAITING_READING.to_string(),
		(ConnectionState::Bound, Some(data)) => bound_status(&data),
	}
}

fn bound_status(data: &StrengthData) -> String {
	let mut text = String::from("Connected");
	for channel in Channel::ALL {
		text.push_str(&format!(
			"\nChannel {channel}: {} (limit {})",
			data.current(channel),
			data.limit(channel)
		));
	}
	text
}

pub fn help(waveforms: &[&str]) -> String {
	let mut text = String::from("Commands:");
	for kind in CommandKind::ALL {
		text.push_str("\n  ");
		text.push_str(kind.usage());
	}
	text.push_str("\nWaveforms: ");
	text.push_str(&waveforms.join(", "));
	text.push_str("\nTip: if output stops, pausing and resuming the waveform in the app restores it.");
	text
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snapshot(state: ConnectionState, last_strength: Option<StrengthData>) -> SessionSnapshot {
		SessionSnapshot {
			state,
			waveforms: ["呼吸".into(), "呼吸".into()],
			last_strength,
			close_requested: false,
			pulse_loop_closed: false,
		}
	}

	#[test]
	fn strength_echo_names_the_operation() {
		assert_eq!(
			strength(Channel::A, StrengthOperation::SetTo, 100),
			"Channel A strength set to 100"
		);
		assert_eq!(
			strength(Channel::B, StrengthOperation::Increase, 50),
			"Channel B increased by 50"
		);
		assert_eq!(
			strength(Channel::A, StrengthOperation::Decrease, 10),
			"Channel A decreased by 10"
		);
	}

	#[test]
	fn status_per_state() {
		assert_eq!(status(&snapshot(ConnectionState::Unbound, None)), "Not connected");
		assert_eq!(
			status(&snapshot(ConnectionState::Pairing, None)),
			"Currently awaiting connection"
		);
		assert_eq!(
			status(&snapshot(ConnectionState::Bound, None)),
			"Connected, awaiting the first strength reading"
		);
		let reading = StrengthData {
			a: 10,
			b: 5,
			a_limit: 100,
			b_limit: 100,
		};
		assert_eq!(
			status(&snapshot(ConnectionState::Bound, Some(reading))),
			"Connected\nChannel A: 10 (limit 100)\nChannel B: 5 (limit 100)"
		);
	}

	#[test]
	fn help_lists_commands_and_waveforms() {
		let text = help(&["呼吸", "潮汐"]);
		for kind in CommandKind::ALL {
			assert!(text.contains(kind.name()), "{}", kind.name());
		}
		assert!(text.contains("呼吸, 潮汐"));
	}
}
