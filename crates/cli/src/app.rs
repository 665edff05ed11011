//! Wires the collaborators together and runs the console loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use dglab::{Dispatcher, Session, WaveformCatalog};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::BotConfig;
use crate::console::ConsoleTransport;
use crate::device::RelayConnector;
use crate::qr::QrPublisher;
use crate::smms::SmmsHost;

pub fn load_catalog(config: &BotConfig) -> Result<WaveformCatalog> {
	match &config.waveforms_file {
		Some(path) => WaveformCatalog::load(path)
			.with_context(|| format!("loading waveforms from {}", path.display())),
		None => Ok(WaveformCatalog::builtin()),
	}
}

pub async fn run(config: BotConfig) -> Result<()> {
	let catalog = Arc::new(load_catalog(&config)?);
	let transport = Arc::new(ConsoleTransport::new(config.group()));
	let host = Arc::new(SmmsHost::new(&config.smms));
	let publisher = Arc::new(QrPublisher::new(host, transport.clone()));
	let connector = Arc::new(RelayConnector::new(config.server_config(), config.pairing_host()));

	if config.smms.token.is_none() {
		warn!(target = "dglab", "no sm.ms token configured, uploads will be anonymous");
	}
	if config.pairing_host_is_loopback() {
		warn!(
			target = "dglab",
			host = %config.pairing_host(),
			"pairing code points at loopback, set publicHost or --public-host so the app can reach it"
		);
	}

	let dispatcher = Dispatcher::new(
		Session::new(catalog.default_name()),
		catalog.clone(),
		transport.clone(),
		publisher,
		connector,
	);

	info!(
		target = "dglab",
		group = config.group(),
		port = config.port,
		pairing_host = %config.pairing_host(),
		waveforms = catalog.names().len(),
		"bot ready, reading commands from stdin"
	);

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			line = lines.next_line() => {
				let Some(line) = line.context("reading stdin")? else {
					info!(target = "dglab", "stdin closed");
					break;
				};
				let target = transport.next_target();
				dispatcher.handle(&target, &line).await;
			}
			_ = tokio::signal::ctrl_c() => {
				info!(target = "dglab", "interrupted");
				break;
			}
		}
	}

	dispatcher.session().request_close();
	Ok(())
}
