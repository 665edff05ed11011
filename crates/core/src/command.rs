//! Chat text → [`Command`].

use thiserror::Error;

/// The closed set of chat commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
	Connect,
	Set,
	Increase,
	Decrease,
	Close,
	Status,
	Change,
	Help,
}

impl CommandKind {
	pub const ALL: [CommandKind; 8] = [
		CommandKind::Connect,
		CommandKind::Set,
		CommandKind::Increase,
		CommandKind::Decrease,
		CommandKind::Close,
		CommandKind::Status,
		CommandKind::Change,
		CommandKind::Help,
	];

	pub fn lookup(name: &str) -> Option<Self> {
		match name {
			"connect" => Some(Self::Connect),
			"set" => Some(Self::Set),
			"increase" => Some(Self::Increase),
			"decrease" => Some(Self::Decrease),
			"close" => Some(Self::Close),
			"status" => Some(Self::Status),
			"change" => Some(Self::Change),
			"help" => Some(Self::Help),
			_ => None,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Connect => "connect",
			Self::Set => "set",
			Self::Increase => "increase",
			Self::Decrease => "decrease",
			Self::Close => "close",
			Self::Status => "status",
			Self::Change => "change",
			Self::Help => "help",
		}
	}

	/// Usage line shown by `help`.
	pub fn usage(self) -> &'static str {
		match self {
			Self::Connect => "connect: pair with the app (scan the code it sends)",
			Self::Set => "set <A|B> <0-200>: set channel strength",
			Self::Increase => "increase <A|B> <0-200>: raise channel strength",
			Self::Decrease => "decrease <A|B> <0-200>: lower channel strength",
			Self::Close => "close: disconnect from the app",
			Self::Status => "status: show connection state and strength",
			Self::Change => "change <A|B> <waveform>: switch channel waveform",
			Self::Help => "help: show this message",
		}
	}
}

/// One parsed chat message. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
	pub kind: CommandKind,
	pub name: String,
	pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("empty command")]
	Empty,

	#[error("Command does not exist")]
	Unknown(String),
}

/// Splits `text` on whitespace: the first token names the command, the rest are arguments.
pub fn parse(text: &str) -> Result<Command, ParseError> {
	let mut tokens = text.split_whitespace();
	let name = tokens.next().ok_or(ParseError::Empty)?;
	let kind = CommandKind::lookup(name).ok_or_else(|| ParseError::Unknown(name.to_string()))?;
	Ok(Command {
		kind,
		name: name.to_string(),
		args: tokens.map(str::to_string).collect(),
	})
}
