//! Relay framing: the JSON envelope every websocket frame carries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Longest envelope `message` the relay forwards.
pub const MAX_MESSAGE_LEN: usize = 1950;

/// `message` of the id-assignment frame the server sends on connect.
pub const BIND_ASSIGN_MESSAGE: &str = "targetId";

/// `message` the app sends when it asks to be bound to a client.
pub const BIND_REQUEST_MESSAGE: &str = "DGLAB";

/// Envelope `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
	/// Id assignment and the bind handshake.
	Bind,
	/// Application payload (strength, pulses, feedback).
	Msg,
	/// Keep-alive, sent by the server at a fixed interval.
	Heartbeat,
	/// One side of a bound pair went away.
	Break,
	/// Relay error, `message` carries a [`RetCode`].
	Error,
}

/// One websocket frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
	#[serde(rename = "type")]
	pub kind: MessageType,
	pub client_id: String,
	pub target_id: String,
	pub message: String,
}

impl Envelope {
	pub fn new(
		kind: MessageType,
		client_id: impl Into<String>,
		target_id: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			kind,
			client_id: client_id.into(),
			target_id: target_id.into(),
			message: message.into(),
		}
	}

	/// Frame carrying a bare return code.
	pub fn code(
		kind: MessageType,
		client_id: impl Into<String>,
		target_id: impl Into<String>,
		code: RetCode,
	) -> Self {
		Self::new(kind, client_id, target_id, code.to_string())
	}

	/// Parses the `message` field as a return code.
	pub fn ret_code(&self) -> Result<RetCode> {
		self.message.parse()
	}

	pub fn to_json(&self) -> String {
		// Envelope only holds strings and a unit enum.
		serde_json::to_string(self).unwrap_or_default()
	}

	pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
		serde_json::from_str(raw)
	}
}

/// Numeric status codes carried in envelope messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetCode {
	Success,
	ClientDisconnected,
	InvalidClientId,
	ServerDelay,
	IdAlreadyBound,
	TargetClientNotFound,
	IncompatibleRelationship,
	NonJsonContent,
	RecipientNotFound,
	MessageTooLong,
	ServerInternalError,
}

impl RetCode {
	pub fn code(self) -> u16 {
		match self {
			Self::Success => 200,
			Self::ClientDisconnected => 209,
			Self::InvalidClientId => 210,
			Self::ServerDelay => 211,
			Self::IdAlreadyBound => 400,
			Self::TargetClientNotFound => 401,
			Self::IncompatibleRelationship => 402,
			Self::NonJsonContent => 403,
			Self::RecipientNotFound => 404,
			Self::MessageTooLong => 405,
			Self::ServerInternalError => 500,
		}
	}

	pub fn from_code(code: u16) -> Option<Self> {
		Some(match code {
			200 => Self::Success,
			209 => Self::ClientDisconnected,
			210 => Self::InvalidClientId,
			211 => Self::ServerDelay,
			400 => Self::IdAlreadyBound,
			401 => Self::TargetClientNotFound,
			402 => Self::IncompatibleRelationship,
			403 => Self::NonJsonContent,
			404 => Self::RecipientNotFound,
			405 => Self::MessageTooLong,
			500 => Self::ServerInternalError,
			_ => return None,
		})
	}
}

impl fmt::Display for RetCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.code())
	}
}

impl std::str::FromStr for RetCode {
	type Err = ProtocolError;

	fn from_str(s: &str) -> Result<Self> {
		s.trim()
			.parse::<u16>()
			.ok()
			.and_then(Self::from_code)
			.ok_or_else(|| ProtocolError::UnknownRetCode(s.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn envelope_uses_camel_case_and_type_tag() {
		let env = Envelope::new(MessageType::Bind, "abc", "", BIND_ASSIGN_MESSAGE);
		let json = env.to_json();
		assert!(json.contains(r#""type":"bind""#));
		assert!(json.contains(r#""clientId":"abc""#));
		assert!(json.contains(r#""targetId":"""#));
		assert!(json.contains(r#""message":"targetId""#));
	}

	#[test]
	fn envelope_parses_app_frame() {
		let raw = r#"{"type":"msg","clientId":"c1","targetId":"t1","message":"strength-1+2+3+4"}"#;
		let env = Envelope::from_json(raw).unwrap();
		assert_eq!(env.kind, MessageType::Msg);
		assert_eq!(env.client_id, "c1");
		assert_eq!(env.target_id, "t1");
		assert_eq!(env.message, "strength-1+2+3+4");
	}

	#[test]
	fn unknown_type_is_rejected() {
		let raw = r#"{"type":"hello","clientId":"","targetId":"","message":""}"#;
		assert!(Envelope::from_json(raw).is_err());
	}

	#[test]
	fn ret_code_round_trips_through_message() {
		let env = Envelope::code(MessageType::Break, "c", "t", RetCode::ClientDisconnected);
		assert_eq!(env.message, "209");
		assert_eq!(env.ret_code().unwrap(), RetCode::ClientDisconnected);
	}

	#[test]
	fn unknown_ret_code_fails() {
		assert_eq!(
			"299".parse::<RetCode>(),
			Err(ProtocolError::UnknownRetCode("299".into()))
		);
		assert!("DGLAB".parse::<RetCode>().is_err());
	}
}
