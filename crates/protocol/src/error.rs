use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Payloads that do not match the protocol grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
	#[error("unknown payload: {0}")]
	UnknownPayload(String),

	#[error("malformed {kind} payload: {raw}")]
	Malformed { kind: &'static str, raw: String },

	#[error("unknown channel: {0}")]
	UnknownChannel(String),

	#[error("unknown return code: {0}")]
	UnknownRetCode(String),

	#[error("pulse {field} byte {value} outside {min}..={max}")]
	PulseOutOfRange {
		field: &'static str,
		value: u8,
		min: u8,
		max: u8,
	},

	#[error("too many pulses in one message: {0} (max {max})", max = crate::MAX_PULSES_PER_MESSAGE)]
	TooManyPulses(usize),
}
