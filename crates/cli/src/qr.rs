//! Pairing URL → QR code image → chat media.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use dglab::{ChatTransport, MediaHost, MediaRef, PairingPublisher, ReplyTarget, UploadError};
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use tracing::debug;

const QR_FILE_NAME: &str = "qrcode.png";
const QR_MIN_SIZE: u32 = 300;

/// Renders `data` as a black-on-white QR code PNG.
pub fn render_png(data: &str) -> Result<Vec<u8>, UploadError> {
	let code = QrCode::new(data.as_bytes()).map_err(|e| UploadError::Render(e.to_string()))?;
	let image = code
		.render::<Luma<u8>>()
		.min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
		.build();
	let mut buffer = Vec::new();
	image
		.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
		.map_err(|e| UploadError::Render(e.to_string()))?;
	Ok(buffer)
}

/// Publishes the pairing code: render, host it, then hand the URL to the chat platform.
pub struct QrPublisher {
	host: Arc<dyn MediaHost>,
	transport: Arc<dyn ChatTransport>,
}

impl QrPublisher {
	pub fn new(host: Arc<dyn MediaHost>, transport: Arc<dyn ChatTransport>) -> Self {
		Self { host, transport }
	}
}

#[async_trait]
impl PairingPublisher for QrPublisher {
	async fn publish(&self, target: &ReplyTarget, pairing_url: &str) -> Result<MediaRef, UploadError> {
		let png = render_png(pairing_url)?;
		debug!(target = "dglab", bytes = png.len(), "pairing code rendered");
		let hosted = self.host.upload(QR_FILE_NAME, png).await?;
		Ok(self.transport.upload_media(target, &hosted).await?)
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;
	use dglab::TransportError;

	#[test]
	fn renders_a_png() {
		let png = render_png("https://www.dungeon-lab.com/app-download.php#DGLAB-SOCKET#ws://127.0.0.1:5678/abc").unwrap();
		assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
		let decoded = image::load_from_memory(&png).unwrap();
		assert!(decoded.width() >= QR_MIN_SIZE);
	}

	#[derive(Default)]
	struct RecordingHost {
		uploads: Mutex<Vec<(String, usize)>>,
	}

	#[async_trait]
	impl MediaHost for RecordingHost {
		async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
			self.uploads.lock().push((file_name.to_string(), bytes.len()));
			Ok("https://img.example/qr.png".to_string())
		}
	}

	struct EchoTransport;

	#[async_trait]
	impl ChatTransport for EchoTransport {
		async fn send_text(&self, _: &ReplyTarget, _: &str) -> Result<(), TransportError> {
			Ok(())
		}

		async fn upload_media(&self, _: &ReplyTarget, url: &str) -> Result<MediaRef, TransportError> {
			Ok(MediaRef(format!("chat:{url}")))
		}

		async fn send_media(&self, _: &ReplyTarget, _: &MediaRef) -> Result<(), TransportError> {
			Ok(())
		}
	}

	#[tokio::test]
	async fn publish_uploads_then_republishes() {
		let host = Arc::new(RecordingHost::default());
		let publisher = QrPublisher::new(host.clone(), Arc::new(EchoTransport));

		let media = publisher
			.publish(&ReplyTarget::new("g", "m"), "ws://example/1")
			.await
			.unwrap();

		assert_eq!(media, MediaRef("chat:https://img.example/qr.png".into()));
		let uploads = host.uploads.lock();
		assert_eq!(uploads.len(), 1);
		assert_eq!(uploads[0].0, "qrcode.png");
	}
}
