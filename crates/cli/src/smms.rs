//! sm.ms image hosting.

use async_trait::async_trait;
use dglab::{MediaHost, UploadError};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::SmmsConfig;

#[derive(Debug, Deserialize)]
struct UploadResponse {
	#[serde(default)]
	code: String,
	#[serde(default)]
	message: String,
	data: Option<UploadedImage>,
	/// Present when the image was uploaded before: the existing URL.
	images: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadedImage {
	url: String,
}

pub struct SmmsHost {
	client: reqwest::Client,
	upload_url: String,
	token: Option<String>,
}

impl SmmsHost {
	pub fn new(config: &SmmsConfig) -> Self {
		Self {
			client: reqwest::Client::new(),
			upload_url: format!("{}/upload", config.base_url.trim_end_matches('/')),
			token: config.token.clone(),
		}
	}
}

#[async_trait]
impl MediaHost for SmmsHost {
	async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
		let part = Part::bytes(bytes)
			.file_name(file_name.to_string())
			.mime_str("image/png")
			.map_err(|e| UploadError::Http(e.to_string()))?;
		let form = Form::new().part("smfile", part);

		let mut request = self.client.post(&self.upload_url).multipart(form);
		if let Some(token) = &self.token {
			request = request.header(AUTHORIZATION, token);
		}

		let response = request
			.send()
			.await
			.map_err(|e| UploadError::Http(e.to_string()))?;
		let status = response.status();
		let body: UploadResponse = response
			.json()
			.await
			.map_err(|e| UploadError::Http(format!("{status}: {e}")))?;
		debug!(target = "dglab", code = %body.code, message = %body.message, "sm.ms response");

		match (body.code.as_str(), body.data, body.images) {
			("success", Some(data), _) => {
				info!(target = "dglab", url = %data.url, "pairing code uploaded");
				Ok(data.url)
			}
			("image_repeated", _, Some(url)) => {
				info!(target = "dglab", url = %url, "pairing code already hosted");
				Ok(url)
			}
			_ => Err(UploadError::Rejected {
				code: body.code,
				message: body.message,
			}),
		}
	}
}
