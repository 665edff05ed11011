//! Error types for collaborator failures.
//!
//! User input problems are not errors here; they are [`Rejection`](crate::Rejection)s
//! answered in chat.

use std::path::PathBuf;

use dglab_protocol::ProtocolError;
use thiserror::Error;

/// The device relay failed.
#[derive(Debug, Error)]
pub enum DeviceError {
	#[error("failed to start pairing server: {0}")]
	Start(String),

	#[error("pairing ended before the app bound: {0}")]
	Bind(String),

	#[error("device is not bound")]
	NotBound,

	#[error("device send failed: {0}")]
	Send(String),
}

/// The pairing code could not be published.
#[derive(Debug, Error)]
pub enum UploadError {
	#[error("failed to render pairing code: {0}")]
	Render(String),

	#[error("image host rejected upload: {code}: {message}")]
	Rejected { code: String, message: String },

	#[error("image host request failed: {0}")]
	Http(String),

	#[error("chat platform rejected media: {0}")]
	Republish(#[from] TransportError),
}

/// The chat platform could not be reached.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("send failed: {0}")]
	Send(String),

	#[error("media upload failed: {0}")]
	Media(String),
}

/// A waveform file could not be loaded.
#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("failed to read waveform file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid waveform file: {0}")]
	Json(#[from] serde_json::Error),

	#[error("waveform catalog is empty")]
	Empty,

	#[error("waveform {0} has no pulses")]
	EmptyWaveform(String),

	#[error("waveform {name}: {source}")]
	InvalidPulse {
		name: String,
		#[source]
		source: ProtocolError,
	},
}
