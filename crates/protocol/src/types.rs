//! Payload types carried in [`Envelope::message`](crate::Envelope).
//!
//! The app reports with `strength-…` and `feedback-…`; the server drives the app
//! with `strength-…`, `pulse-…` and `clear-…`.

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Maximum number of pulse units one `pulse-` message may carry.
pub const MAX_PULSES_PER_MESSAGE: usize = 100;

/// Valid range for a pulse frequency byte.
pub const PULSE_FREQUENCY_RANGE: (u8, u8) = (10, 240);

/// Valid range for a pulse strength byte.
pub const PULSE_STRENGTH_RANGE: (u8, u8) = (0, 100);

/// One of the two independent output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
	A,
	B,
}

impl Channel {
	pub const ALL: [Channel; 2] = [Channel::A, Channel::B];

	/// Numeric id used by `strength-` and `clear-` payloads.
	pub fn number(self) -> u8 {
		match self {
			Channel::A => 1,
			Channel::B => 2,
		}
	}

	pub fn letter(self) -> &'static str {
		match self {
			Channel::A => "A",
			Channel::B => "B",
		}
	}

	pub fn from_number(n: u8) -> Option<Self> {
		match n {
			1 => Some(Channel::A),
			2 => Some(Channel::B),
			_ => None,
		}
	}

	pub fn index(self) -> usize {
		match self {
			Channel::A => 0,
			Channel::B => 1,
		}
	}
}

impl fmt::Display for Channel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.letter())
	}
}

/// Accepts exactly the literals `A` and `B`.
impl FromStr for Channel {
	type Err = ProtocolError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"A" => Ok(Channel::A),
			"B" => Ok(Channel::B),
			other => Err(ProtocolError::UnknownChannel(other.to_string())),
		}
	}
}

/// How a `strength-` command changes the channel's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrengthOperation {
	Decrease,
	Increase,
	SetTo,
}

impl StrengthOperation {
	pub fn mode(self) -> u8 {
		match self {
			StrengthOperation::Decrease => 0,
			StrengthOperation::Increase => 1,
			StrengthOperation::SetTo => 2,
		}
	}

	pub fn from_mode(mode: u8) -> Option<Self> {
		match mode {
			0 => Some(StrengthOperation::Decrease),
			1 => Some(StrengthOperation::Increase),
			2 => Some(StrengthOperation::SetTo),
			_ => None,
		}
	}
}

/// Current strength and user-configured limit for both channels, as the app reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StrengthData {
	pub a: u8,
	pub b: u8,
	pub a_limit: u8,
	pub b_limit: u8,
}

impl StrengthData {
	pub fn current(&self, channel: Channel) -> u8 {
		match channel {
			Channel::A => self.a,
			Channel::B => self.b,
		}
	}

	pub fn limit(&self, channel: Channel) -> u8 {
		match channel {
			Channel::A => self.a_limit,
			Channel::B => self.b_limit,
		}
	}
}

/// One of the ten shape buttons in the app, 0-4 on channel A and 5-9 on channel B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackButton(u8);

impl FeedbackButton {
	pub fn new(index: u8) -> Option<Self> {
		(index <= 9).then_some(Self(index))
	}

	pub fn index(self) -> u8 {
		self.0
	}

	pub fn channel(self) -> Channel {
		if self.0 < 5 { Channel::A } else { Channel::B }
	}
}

/// One 100ms unit of waveform output: four frequency bytes then four strength bytes.
///
/// Serializes as `[[f, f, f, f], [s, s, s, s]]`, the shape waveform files use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PulseOperation(pub [u8; 4], pub [u8; 4]);

impl PulseOperation {
	pub fn frequency(&self) -> [u8; 4] {
		self.0
	}

	pub fn strength(&self) -> [u8; 4] {
		self.1
	}

	/// Checks every byte against [`PULSE_FREQUENCY_RANGE`] and [`PULSE_STRENGTH_RANGE`].
	pub fn validate(&self) -> Result<()> {
		let (fmin, fmax) = PULSE_FREQUENCY_RANGE;
		let (smin, smax) = PULSE_STRENGTH_RANGE;
		if let Some(&value) = self.0.iter().find(|v| !(fmin..=fmax).contains(*v)) {
			return Err(ProtocolError::PulseOutOfRange {
				field: "frequency",
				value,
				min: fmin,
				max: fmax,
			});
		}
		if let Some(&value) = self.1.iter().find(|v| !(smin..=smax).contains(*v)) {
			return Err(ProtocolError::PulseOutOfRange {
				field: "strength",
				value,
				min: smin,
				max: smax,
			});
		}
		Ok(())
	}

	/// 16 uppercase hex characters, the unit format inside `pulse-` payloads.
	pub fn to_hex(&self) -> String {
		let mut out = String::with_capacity(16);
		for byte in self.0.iter().chain(self.1.iter()) {
			let _ = write!(out, "{byte:02X}");
		}
		out
	}

	pub fn from_hex(raw: &str) -> Result<Self> {
		let malformed = || ProtocolError::Malformed {
			kind: "pulse",
			raw: raw.to_string(),
		};
		if raw.len() != 16 || !raw.is_ascii() {
			return Err(malformed());
		}
		let mut bytes = [0u8; 8];
		for (i, byte) in bytes.iter_mut().enumerate() {
			*byte = u8::from_str_radix(&raw[i * 2..i * 2 + 2], 16).map_err(|_| malformed())?;
		}
		Ok(Self(
			[bytes[0], bytes[1], bytes[2], bytes[3]],
			[bytes[4], bytes[5], bytes[6], bytes[7]],
		))
	}
}

/// Payloads the app sends in `msg` envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppReport {
	Strength(StrengthData),
	Feedback(FeedbackButton),
}

impl AppReport {
	pub fn parse(raw: &str) -> Result<Self> {
		if let Some(body) = raw.strip_prefix("strength-") {
			let malformed = || ProtocolError::Malformed {
				kind: "strength",
				raw: raw.to_string(),
			};
			let values = body
				.split('+')
				.map(|v| v.trim().parse::<u8>())
				.collect::<std::result::Result<Vec<_>, _>>()
				.map_err(|_| malformed())?;
			let [a, b, a_limit, b_limit] = values[..] else {
				return Err(malformed());
			};
			return Ok(AppReport::Strength(StrengthData {
				a,
				b,
				a_limit,
				b_limit,
			}));
		}

		if let Some(body) = raw.strip_prefix("feedback-") {
			return body
				.trim()
				.parse::<u8>()
				.ok()
				.and_then(FeedbackButton::new)
				.map(AppReport::Feedback)
				.ok_or_else(|| ProtocolError::Malformed {
					kind: "feedback",
					raw: raw.to_string(),
				});
		}

		Err(ProtocolError::UnknownPayload(raw.to_string()))
	}

	pub fn to_message(&self) -> String {
		match self {
			AppReport::Strength(s) => {
				format!("strength-{}+{}+{}+{}", s.a, s.b, s.a_limit, s.b_limit)
			}
			AppReport::Feedback(button) => format!("feedback-{}", button.index()),
		}
	}
}

/// Payloads sent to the app in `msg` envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
	Strength {
		channel: Channel,
		operation: StrengthOperation,
		value: u8,
	},
	Pulse {
		channel: Channel,
		pulses: Vec<PulseOperation>,
	},
	Clear(Channel),
}

impl AppCommand {
	/// Builds a pulse command, rejecting batches the app would refuse.
	pub fn pulse(channel: Channel, pulses: Vec<PulseOperation>) -> Result<Self> {
		if pulses.len() > MAX_PULSES_PER_MESSAGE {
			return Err(ProtocolError::TooManyPulses(pulses.len()));
		}
		Ok(AppCommand::Pulse { channel, pulses })
	}

	pub fn to_message(&self) -> String {
		match self {
			AppCommand::Strength {
				channel,
				operation,
				value,
			} => format!("strength-{}+{}+{}", channel.number(), operation.mode(), value),
			AppCommand::Pulse { channel, pulses } => {
				let hex: Vec<String> = pulses.iter().map(PulseOperation::to_hex).collect();
				let list = serde_json::to_string(&hex).unwrap_or_else(|_| "[]".to_string());
				format!("pulse-{}:{}", channel.letter(), list)
			}
			AppCommand::Clear(channel) => format!("clear-{}", channel.number()),
		}
	}

	pub fn parse(raw: &str) -> Result<Self> {
		if let Some(body) = raw.strip_prefix("strength-") {
			let malformed = || ProtocolError::Malformed {
				kind: "strength",
				raw: raw.to_string(),
			};
			let parts: Vec<u8> = body
				.split('+')
				.map(|v| v.parse::<u8>())
				.collect::<std::result::Result<_, _>>()
				.map_err(|_| malformed())?;
			let [channel, mode, value] = parts[..] else {
				return Err(malformed());
			};
			return Ok(AppCommand::Strength {
				channel: Channel::from_number(channel).ok_or_else(malformed)?,
				operation: StrengthOperation::from_mode(mode).ok_or_else(malformed)?,
				value,
			});
		}

		if let Some(body) = raw.strip_prefix("pulse-") {
			let malformed = || ProtocolError::Malformed {
				kind: "pulse",
				raw: raw.to_string(),
			};
			let (channel, list) = body.split_once(':').ok_or_else(malformed)?;
			let channel: Channel = channel.parse()?;
			let hex: Vec<String> = serde_json::from_str(list).map_err(|_| malformed())?;
			let pulses = hex
				.iter()
				.map(|h| PulseOperation::from_hex(h))
				.collect::<Result<Vec<_>>>()?;
			return Ok(AppCommand::Pulse { channel, pulses });
		}

		if let Some(body) = raw.strip_prefix("clear-") {
			return body
				.parse::<u8>()
				.ok()
				.and_then(Channel::from_number)
				.map(AppCommand::Clear)
				.ok_or_else(|| ProtocolError::Malformed {
					kind: "clear",
					raw: raw.to_string(),
				});
		}

		Err(ProtocolError::UnknownPayload(raw.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn channel_accepts_only_upper_case_literals() {
		assert_eq!("A".parse::<Channel>().unwrap(), Channel::A);
		assert_eq!("B".parse::<Channel>().unwrap(), Channel::B);
		assert!("a".parse::<Channel>().is_err());
		assert!("C".parse::<Channel>().is_err());
		assert!("AB".parse::<Channel>().is_err());
	}

	#[test]
	fn strength_report_parses() {
		let report = AppReport::parse("strength-10+5+100+80").unwrap();
		assert_eq!(
			report,
			AppReport::Strength(StrengthData {
				a: 10,
				b: 5,
				a_limit: 100,
				b_limit: 80
			})
		);
	}

	#[test]
	fn strength_report_with_missing_field_is_malformed() {
		assert!(matches!(
			AppReport::parse("strength-10+5+100"),
			Err(ProtocolError::Malformed { kind: "strength", .. })
		));
		assert!(AppReport::parse("strength-x+5+100+100").is_err());
	}

	#[test]
	fn feedback_report_maps_to_channel() {
		let AppReport::Feedback(button) = AppReport::parse("feedback-7").unwrap() else {
			panic!("expected feedback");
		};
		assert_eq!(button.index(), 7);
		assert_eq!(button.channel(), Channel::B);
		assert!(AppReport::parse("feedback-10").is_err());
	}

	#[test]
	fn unknown_report_is_flagged() {
		assert_eq!(
			AppReport::parse("hello"),
			Err(ProtocolError::UnknownPayload("hello".into()))
		);
	}

	#[test]
	fn strength_command_formats_channel_number_and_mode() {
		let cmd = AppCommand::Strength {
			channel: Channel::B,
			operation: StrengthOperation::Increase,
			value: 50,
		};
		assert_eq!(cmd.to_message(), "strength-2+1+50");
		assert_eq!(AppCommand::parse("strength-2+1+50").unwrap(), cmd);
	}

	#[test]
	fn pulse_command_encodes_hex_units() {
		let pulse = PulseOperation([10, 10, 20, 30], [0, 5, 10, 100]);
		assert_eq!(pulse.to_hex(), "0A0A141E00050A64");

		let cmd = AppCommand::pulse(Channel::A, vec![pulse, pulse]).unwrap();
		assert_eq!(
			cmd.to_message(),
			r#"pulse-A:["0A0A141E00050A64","0A0A141E00050A64"]"#
		);
		assert_eq!(AppCommand::parse(&cmd.to_message()).unwrap(), cmd);
	}

	#[test]
	fn pulse_command_rejects_oversized_batch() {
		let pulses = vec![PulseOperation([10; 4], [0; 4]); MAX_PULSES_PER_MESSAGE + 1];
		assert_eq!(
			AppCommand::pulse(Channel::A, pulses),
			Err(ProtocolError::TooManyPulses(101))
		);
	}

	#[test]
	fn clear_command_uses_channel_number() {
		assert_eq!(AppCommand::Clear(Channel::A).to_message(), "clear-1");
		assert_eq!(AppCommand::parse("clear-2").unwrap(), AppCommand::Clear(Channel::B));
	}

	#[test]
	fn pulse_validation_checks_byte_ranges() {
		assert!(PulseOperation([10, 10, 10, 10], [0, 50, 100, 0]).validate().is_ok());
		assert_eq!(
			PulseOperation([9, 10, 10, 10], [0; 4]).validate(),
			Err(ProtocolError::PulseOutOfRange {
				field: "frequency",
				value: 9,
				min: 10,
				max: 240
			})
		);
		assert!(PulseOperation([10; 4], [0, 0, 101, 0]).validate().is_err());
	}

	#[test]
	fn pulse_operation_serializes_as_nested_arrays() {
		let pulse = PulseOperation([10, 10, 10, 10], [0, 5, 10, 20]);
		let json = serde_json::to_string(&pulse).unwrap();
		assert_eq!(json, "[[10,10,10,10],[0,5,10,20]]");
		let back: PulseOperation = serde_json::from_str(&json).unwrap();
		assert_eq!(back, pulse);
	}
}
