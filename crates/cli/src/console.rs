//! Chat transport backed by the terminal: stdin lines in, stdout lines out.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dglab::{ChatTransport, MediaRef, ReplyTarget, TransportError};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

pub struct ConsoleTransport {
	group: String,
	next_message: AtomicU64,
	stdout: Mutex<Stdout>,
}

impl ConsoleTransport {
	pub fn new(group: impl Into<String>) -> Self {
		Self {
			group: group.into(),
			next_message: AtomicU64::new(1),
			stdout: Mutex::new(tokio::io::stdout()),
		}
	}

	/// Target for the next inbound line.
	pub fn next_target(&self) -> ReplyTarget {
		let id = self.next_message.fetch_add(1, Ordering::Relaxed);
		ReplyTarget::new(self.group.clone(), id.to_string())
	}

	async fn write_line(&self, target: &ReplyTarget, body: &str) -> Result<(), TransportError> {
		let line = format_line(target, body);
		let mut stdout = self.stdout.lock().await;
		stdout
			.write_all(line.as_bytes())
			.await
			.map_err(|e| TransportError::Send(e.to_string()))?;
		stdout
			.flush()
			.await
			.map_err(|e| TransportError::Send(e.to_string()))
	}
}

fn format_line(target: &ReplyTarget, body: &str) -> String {
	format!("[{} #{}] {}\n", target.group_id, target.message_id, body)
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
	async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<(), TransportError> {
		self.write_line(target, text).await
	}

	/// The terminal shows hosted images by URL.
	async fn upload_media(&self, _target: &ReplyTarget, url: &str) -> Result<MediaRef, TransportError> {
		Ok(MediaRef(url.to_string()))
	}

	async fn send_media(&self, target: &ReplyTarget, media: &MediaRef) -> Result<(), TransportError> {
		self.write_line(target, &format!("[image] {}", media.0)).await
	}
}
