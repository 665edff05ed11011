//! Per-command argument schemas and the validator that enforces them.

use dglab_protocol::Channel;
use thiserror::Error;
use tracing::error;

use crate::session::{ConnectionState, Session};

/// Channel tokens accepted by every channel slot.
pub const CHANNEL_NAMES: &[&str] = &["A", "B"];

/// Inclusive bounds for strength arguments.
pub const STRENGTH_RANGE: (u32, u32) = (0, 200);

/// One positional argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSlot<'a> {
	FreeString,
	/// Digits only.
	Integer,
	OneOf(&'a [&'a str]),
	/// Digits only, within `min..=max`.
	IntRange { min: u32, max: u32 },
}

/// A slot's accepted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
	Text(String),
	Int(u32),
}

impl ArgValue {
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			Self::Int(_) => None,
		}
	}

	pub fn as_int(&self) -> Option<u32> {
		match self {
			Self::Int(value) => Some(*value),
			Self::Text(_) => None,
		}
	}
}

/// Why a command's arguments were refused. The display text is the chat reply.
///
/// Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
	#[error("Not connected, cannot adjust parameters")]
	NotConnected,

	#[error("This command takes {expected} argument(s), got {got}")]
	ArgCount { expected: usize, got: usize },

	#[error("Argument {position} has a format error, expected digits")]
	Format { position: usize },

	#[error("Argument {position} has an invalid name: {value}")]
	UnknownName { position: usize, value: String },

	#[error("Argument {position} is out of range ({min}-{max})")]
	OutOfRange { position: usize, min: u32, max: u32 },

	#[error("The {command} command takes no arguments")]
	UnexpectedArgs { command: &'static str },

	/// Validated values did not fit the slot types the caller asked for.
	#[error("Internal error while reading the arguments")]
	Internal,
}

/// Typed arguments of `set`, `increase` and `decrease`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrengthArgs {
	pub channel: Channel,
	pub value: u8,
}

/// Typed arguments of `change`. The name is a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeArgs {
	pub channel: Channel,
	pub waveform: String,
}

/// Schema shared by `set`, `increase` and `decrease`.
pub fn strength_schema() -> [ArgSlot<'static>; 2] {
	[
		ArgSlot::OneOf(CHANNEL_NAMES),
		ArgSlot::IntRange {
			min: STRENGTH_RANGE.0,
			max: STRENGTH_RANGE.1,
		},
	]
}

/// Validates a strength command against [`strength_schema`].
pub fn validate_strength(session: &Session, args: &[String]) -> Result<StrengthArgs, Rejection> {
	let values = validate(session, &strength_schema(), args)?;
	strength_args(&values)
}

/// Validates `change` against the channel names and `waveforms`.
pub fn validate_change(
	session: &Session,
	waveforms: &[&str],
	args: &[String],
) -> Result<ChangeArgs, Rejection> {
	let schema = [ArgSlot::OneOf(CHANNEL_NAMES), ArgSlot::OneOf(waveforms)];
	let values = validate(session, &schema, args)?;
	change_args(&values)
}

fn strength_args(values: &[ArgValue]) -> Result<StrengthArgs, Rejection> {
	let [ArgValue::Text(channel), ArgValue::Int(value)] = values else {
		return Err(mismatch(values));
	};
	match (channel.parse::<Channel>(), u8::try_from(*value)) {
		(Ok(channel), Ok(value)) => Ok(StrengthArgs { channel, value }),
		_ => Err(mismatch(values)),
	}
}

fn change_args(values: &[ArgValue]) -> Result<ChangeArgs, Rejection> {
	let [ArgValue::Text(channel), ArgValue::Text(waveform)] = values else {
		return Err(mismatch(values));
	};
	let Ok(channel) = channel.parse::<Channel>() else {
		return Err(mismatch(values));
	};
	Ok(ChangeArgs {
		channel,
		waveform: waveform.clone(),
	})
}

fn mismatch(values: &[ArgValue]) -> Rejection {
	error!(target = "dglab", values = ?values, "validated arguments do not match their schema");
	Rejection::Internal
}

/// Checks `args` against `schema`, stopping at the first failure.
///
/// Order: the session must be bound, the count must match, then each slot.
pub fn validate(
	session: &Session,
	schema: &[ArgSlot<'_>],
	args: &[String],
) -> Result<Vec<ArgValue>, Rejection> {
	if session.state() != ConnectionState::Bound {
		return Err(Rejection::NotConnected);
	}
	if args.len() != schema.len() {
		return Err(Rejection::ArgCount {
			expected: schema.len(),
			got: args.len(),
		});
	}
	schema
		.iter()
		.zip(args)
		.enumerate()
		.map(|(index, (slot, arg))| check_slot(index + 1, *slot, arg))
		.collect()
}

fn check_slot(position: usize, slot: ArgSlot<'_>, raw: &str) -> Result<ArgValue, Rejection> {
	match slot {
		ArgSlot::FreeString => Ok(ArgValue::Text(raw.to_string())),
		ArgSlot::Integer => {
			ensure_digits(position, raw)?;
			raw.parse()
				.map(ArgValue::Int)
				.map_err(|_| Rejection::Format { position })
		}
		ArgSlot::OneOf(allowed) => {
			if allowed.contains(&raw) {
				Ok(ArgValue::Text(raw.to_string()))
			} else {
				Err(Rejection::UnknownName {
					position,
					value: raw.to_string(),
				})
			}
		}
		ArgSlot::IntRange { min, max } => {
			ensure_digits(position, raw)?;
			let out_of_range = Rejection::OutOfRange { position, min, max };
			let value: u32 = raw.parse().map_err(|_| out_of_range.clone())?;
			if (min..=max).contains(&value) {
				Ok(ArgValue::Int(value))
			} else {
				Err(out_of_range)
			}
		}
	}
}

fn ensure_digits(position: usize, raw: &str) -> Result<(), Rejection> {
	if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
		Ok(())
	} else {
		Err(Rejection::Format { position })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	fn bound_session() -> Session {
		let session = Session::new("呼吸");
		session.force_state(ConnectionState::Bound);
		session
	}

	#[test]
	fn unbound_session_is_rejected_first() {
		let session = Session::new("呼吸");
		let err = validate(&session, &strength_schema(), &args(&["X"])).unwrap_err();
		assert_eq!(err, Rejection::NotConnected);
	}

	#[test]
	fn pairing_session_is_not_connected() {
		let session = Session::new("呼吸");
		session.force_state(ConnectionState::Pairing);
		let err = validate(&session, &strength_schema(), &args(&["A", "1"])).unwrap_err();
		assert_eq!(err, Rejection::NotConnected);
	}

	#[test]
	fn count_is_checked_before_slots() {
		let session = bound_session();
		let err = validate(&session, &strength_schema(), &args(&["Z"])).unwrap_err();
		assert_eq!(err, Rejection::ArgCount { expected: 2, got: 1 });
	}

	#[test]
	fn accepts_valid_strength_args() {
		let session = bound_session();
		let values = validate(&session, &strength_schema(), &args(&["B", "200"])).unwrap();
		assert_eq!(values, vec![ArgValue::Text("B".into()), ArgValue::Int(200)]);
	}

	#[test]
	fn only_literal_channels_pass() {
		let session = bound_session();
		for bad in ["a", "C", "AB", "1"] {
			let err = validate(&session, &strength_schema(), &args(&[bad, "1"])).unwrap_err();
			assert_eq!(
				err,
				Rejection::UnknownName {
					position: 1,
					value: bad.into()
				}
			);
		}
	}

	#[test]
	fn non_digit_values_are_format_errors() {
		let session = bound_session();
		for bad in ["-1", "1.5", "+3", "ten", "１"] {
			let err = validate(&session, &strength_schema(), &args(&["A", bad])).unwrap_err();
			assert_eq!(err, Rejection::Format { position: 2 }, "{bad}");
		}
	}

	#[test]
	fn range_is_inclusive() {
		let session = bound_session();
		for ok in ["0", "200", "007"] {
			assert!(validate(&session, &strength_schema(), &args(&["A", ok])).is_ok());
		}
		for bad in ["201", "250", "99999999999999999999"] {
			let err = validate(&session, &strength_schema(), &args(&["A", bad])).unwrap_err();
			assert_eq!(
				err,
				Rejection::OutOfRange {
					position: 2,
					min: 0,
					max: 200
				}
			);
		}
	}

	#[test]
	fn free_string_and_integer_slots() {
		let session = bound_session();
		let schema = [ArgSlot::FreeString, ArgSlot::Integer];
		let values = validate(&session, &schema, &args(&["anything", "42"])).unwrap();
		assert_eq!(values[0].as_text(), Some("anything"));
		assert_eq!(values[1].as_int(), Some(42));
		let err = validate(&session, &schema, &args(&["x", "4a"])).unwrap_err();
		assert_eq!(err, Rejection::Format { position: 2 });
	}

	#[test]
	fn strength_arguments_come_back_typed() {
		let session = bound_session();
		let parsed = validate_strength(&session, &args(&["B", "150"])).unwrap();
		assert_eq!(
			parsed,
			StrengthArgs {
				channel: Channel::B,
				value: 150
			}
		);
		assert_eq!(
			validate_strength(&Session::new("呼吸"), &args(&["B", "150"])).unwrap_err(),
			Rejection::NotConnected
		);
	}

	#[test]
	fn change_arguments_come_back_typed() {
		let session = bound_session();
		let parsed = validate_change(&session, &["呼吸", "潮汐"], &args(&["A", "潮汐"])).unwrap();
		assert_eq!(parsed.channel, Channel::A);
		assert_eq!(parsed.waveform, "潮汐");
		let err = validate_change(&session, &["呼吸"], &args(&["A", "潮汐"])).unwrap_err();
		assert_eq!(
			err,
			Rejection::UnknownName {
				position: 2,
				value: "潮汐".into()
			}
		);
	}

	#[test]
	fn mismatched_values_are_internal_errors() {
		let swapped = [ArgValue::Int(1), ArgValue::Text("A".into())];
		assert_eq!(strength_args(&swapped).unwrap_err(), Rejection::Internal);
		let too_big = [ArgValue::Text("A".into()), ArgValue::Int(300)];
		assert_eq!(strength_args(&too_big).unwrap_err(), Rejection::Internal);
		let bad_channel = [ArgValue::Text("C".into()), ArgValue::Text("呼吸".into())];
		assert_eq!(change_args(&bad_channel).unwrap_err(), Rejection::Internal);
		assert_eq!(change_args(&[]).unwrap_err(), Rejection::Internal);
	}

	#[test]
	fn rejection_text_is_user_facing() {
		assert_eq!(
			Rejection::OutOfRange {
				position: 2,
				min: 0,
				max: 200
			}
			.to_string(),
			"Argument 2 is out of range (0-200)"
		);
	}
}
