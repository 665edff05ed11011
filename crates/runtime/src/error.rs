//! Error types for the relay runtime.

use dglab_protocol::{ProtocolError, RetCode};
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// The listening socket could not be opened.
	#[error("failed to bind pairing server to {addr}: {source}")]
	Listen {
		addr: String,
		#[source]
		source: std::io::Error,
	},

	/// The local client has no app bound to it yet (or the app left).
	#[error("client {0} is not bound to an app")]
	NotBound(String),

	/// The server shut down while the operation was pending.
	#[error("pairing server closed")]
	ServerClosed,

	/// The relay refused the frame.
	#[error("relay rejected message with code {0}")]
	Rejected(RetCode),

	#[error(transparent)]
	Protocol(#[from] ProtocolError),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
