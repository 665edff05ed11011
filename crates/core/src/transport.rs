//! Chat platform and media hosting collaborators.

use async_trait::async_trait;

use crate::error::{TransportError, UploadError};

/// Where a reply goes: the group plus the message being answered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplyTarget {
	pub group_id: String,
	pub message_id: String,
}

impl ReplyTarget {
	pub fn new(group_id: impl Into<String>, message_id: impl Into<String>) -> Self {
		Self {
			group_id: group_id.into(),
			message_id: message_id.into(),
		}
	}
}

/// Opaque handle to media already uploaded to the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaRef(pub String);

#[async_trait]
pub trait ChatTransport: Send + Sync {
	async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<(), TransportError>;

	/// Republishes an externally hosted file so it can be sent as rich media.
	async fn upload_media(&self, target: &ReplyTarget, url: &str) -> Result<MediaRef, TransportError>;

	async fn send_media(&self, target: &ReplyTarget, media: &MediaRef) -> Result<(), TransportError>;
}

/// Image hosting. An image the host already has counts as uploaded.
#[async_trait]
pub trait MediaHost: Send + Sync {
	/// Uploads `bytes` and returns a stable public URL.
	async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError>;
}

/// Turns a pairing URL into media the chat can show.
#[async_trait]
pub trait PairingPublisher: Send + Sync {
	async fn publish(&self, target: &ReplyTarget, pairing_url: &str) -> Result<MediaRef, UploadError>;
}
