//! Bot configuration: a JSON file with CLI flags layered on top.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dglab_runtime::ServerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cli::Cli;

pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5678;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 2;
pub const DEFAULT_SMMS_BASE_URL: &str = "https://smms.app/api/v2";
pub const DEFAULT_GROUP: &str = "console";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("heartbeat interval must be at least one second")]
	Heartbeat,
}

/// sm.ms image hosting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SmmsConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,
	pub base_url: String,
}

impl Default for SmmsConfig {
	fn default() -> Self {
		Self {
			token: None,
			base_url: DEFAULT_SMMS_BASE_URL.to_string(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BotConfig {
	pub listen_host: String,
	pub port: u16,
	/// Host written into the pairing URL. Falls back to the listen host.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub public_host: Option<String>,
	pub heartbeat_secs: u64,
	pub smms: SmmsConfig,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub waveforms_file: Option<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group: Option<String>,
}

impl Default for BotConfig {
	fn default() -> Self {
		Self {
			listen_host: DEFAULT_LISTEN_HOST.to_string(),
			port: DEFAULT_PORT,
			public_host: None,
			heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
			smms: SmmsConfig::default(),
			waveforms_file: None,
			group: None,
		}
	}
}

/// `<config dir>/dglab-bot/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("dglab-bot").join("config.json"))
}

impl BotConfig {
	/// Loads `path`, or the default location when `None`.
	///
	/// A missing default file yields defaults; a missing explicit file is an error.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		match path {
			Some(path) => Self::read(path),
			None => match default_config_path() {
				Some(path) if path.exists() => Self::read(&path),
				_ => {
					debug!(target = "dglab", "no config file, using defaults");
					Ok(Self::default())
				}
			},
		}
	}

	fn read(path: &Path) -> Result<Self, ConfigError> {
		let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		debug!(target = "dglab", path = %path.display(), "config loaded");
		Ok(config)
	}

	/// Loads the file named by `--config` and applies the other flags.
	pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
		let mut config = Self::load(cli.config.as_deref())?;
		config.apply_cli(cli);
		if config.heartbeat_secs == 0 {
			return Err(ConfigError::Heartbeat);
		}
		Ok(config)
	}

	pub fn apply_cli(&mut self, cli: &Cli) {
		if let Some(host) = &cli.listen {
			self.listen_host = host.clone();
		}
		if let Some(port) = cli.port {
			self.port = port;
		}
		if let Some(host) = &cli.public_host {
			self.public_host = Some(host.clone());
		}
		if let Some(secs) = cli.heartbeat_secs {
			self.heartbeat_secs = secs;
		}
		if let Some(path) = &cli.waveforms {
			self.waveforms_file = Some(path.clone());
		}
		if let Some(group) = &cli.group {
			self.group = Some(group.clone());
		}
	}

	/// Host the app dials. An unspecified listen address maps to loopback.
	pub fn pairing_host(&self) -> String {
		if let Some(host) = &self.public_host {
			return host.clone();
		}
		match self.listen_host.parse::<IpAddr>() {
			Ok(ip) if ip.is_unspecified() => "127.0.0.1".to_string(),
			_ => self.listen_host.clone(),
		}
	}

	/// Whether the pairing code points at this machine only, so a phone cannot reach it.
	pub fn pairing_host_is_loopback(&self) -> bool {
		let host = self.pairing_host();
		host.eq_ignore_ascii_case("localhost")
			|| host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
	}

	pub fn group(&self) -> &str {
		self.group.as_deref().unwrap_or(DEFAULT_GROUP)
	}

	pub fn server_config(&self) -> ServerConfig {
		ServerConfig {
			host: self.listen_host.clone(),
			port: self.port,
			heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
			..ServerConfig::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_keys_take_defaults() {
		let config: BotConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
		assert_eq!(config.port, 9000);
		assert_eq!(config.listen_host, DEFAULT_LISTEN_HOST);
		assert_eq!(config.heartbeat_secs, DEFAULT_HEARTBEAT_SECS);
		assert_eq!(config.smms.base_url, DEFAULT_SMMS_BASE_URL);
	}

	#[test]
	fn loads_camel_case_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(
			&path,
			r#"{
				"listenHost": "127.0.0.1",
				"publicHost": "bot.example.org",
				"heartbeatSecs": 3,
				"smms": {"token": "secret", "baseUrl": "http://localhost:1/api"},
				"waveformsFile": "waves.json"
			}"#,
		)
		.unwrap();

		let config = BotConfig::load(Some(&path)).unwrap();

		assert_eq!(config.listen_host, "127.0.0.1");
		assert_eq!(config.port, DEFAULT_PORT);
		assert_eq!(config.pairing_host(), "bot.example.org");
		assert_eq!(config.smms.token.as_deref(), Some("secret"));
		assert_eq!(config.smms.base_url, "http://localhost:1/api");
		assert_eq!(config.waveforms_file, Some(PathBuf::from("waves.json")));
		assert_eq!(config.server_config().heartbeat_interval, Duration::from_secs(3));
	}

	#[test]
	fn explicit_missing_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = BotConfig::load(Some(&dir.path().join("nope.json"))).unwrap_err();
		assert!(matches!(err, ConfigError::Read { .. }));
	}

	#[test]
	fn malformed_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(&path, "{ not json").unwrap();
		assert!(matches!(BotConfig::load(Some(&path)), Err(ConfigError::Parse { .. })));
	}

	#[test]
	fn cli_flags_override_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(&path, r#"{"port": 7000, "group": "from-file"}"#).unwrap();
		let cli = Cli {
			config: Some(path),
			port: Some(7001),
			listen: Some("127.0.0.1".into()),
			..Cli::default()
		};

		let config = BotConfig::resolve(&cli).unwrap();

		assert_eq!(config.port, 7001);
		assert_eq!(config.listen_host, "127.0.0.1");
		assert_eq!(config.group(), "from-file");
	}

	#[test]
	fn zero_heartbeat_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(&path, "{}").unwrap();
		let cli = Cli {
			config: Some(path),
			heartbeat_secs: Some(0),
			..Cli::default()
		};
		assert!(matches!(BotConfig::resolve(&cli), Err(ConfigError::Heartbeat)));
	}

	#[test]
	fn unspecified_listen_host_pairs_over_loopback() {
		let config = BotConfig::default();
		assert_eq!(config.pairing_host(), "127.0.0.1");
		assert!(config.pairing_host_is_loopback());
		assert_eq!(config.group(), DEFAULT_GROUP);
	}

	#[test]
	fn public_host_makes_pairing_reachable() {
		let mut config = BotConfig::default();
		config.public_host = Some("192.168.1.20".into());
		assert!(!config.pairing_host_is_loopback());

		config.public_host = Some("localhost".into());
		assert!(config.pairing_host_is_loopback());

		config.public_host = None;
		config.listen_host = "10.0.0.5".into();
		assert!(!config.pairing_host_is_loopback());
	}
}
