use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "dglab-bot")]
#[command(about = "Drive a DG-LAB device from chat commands")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug for the bot, -vv debug everywhere)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (default: <config dir>/dglab-bot/config.json)
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Address the pairing server listens on
	#[arg(long, value_name = "HOST")]
	pub listen: Option<String>,

	/// Port the pairing server listens on
	#[arg(short, long)]
	pub port: Option<u16>,

	/// Host the app should dial, as written into the pairing code
	#[arg(long, value_name = "HOST")]
	pub public_host: Option<String>,

	/// Seconds between relay heartbeats
	#[arg(long, value_name = "SECS")]
	pub heartbeat_secs: Option<u64>,

	/// Waveform catalog to use instead of the built-in presets
	#[arg(long, value_name = "FILE")]
	pub waveforms: Option<PathBuf>,

	/// Group id attached to console messages
	#[arg(short, long)]
	pub group: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_overrides() {
		let cli = Cli::parse_from([
			"dglab-bot",
			"-vv",
			"--port",
			"9000",
			"--public-host",
			"192.168.1.5",
			"--waveforms",
			"waves.json",
		]);
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.port, Some(9000));
		assert_eq!(cli.public_host.as_deref(), Some("192.168.1.5"));
		assert_eq!(cli.waveforms, Some(PathBuf::from("waves.json")));
		assert_eq!(cli.listen, None);
	}

	#[test]
	fn verify_cli() {
		use clap::CommandFactory;
		Cli::command().debug_assert();
	}
}
