use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` wins over `verbosity` when set.
pub fn init_logging(verbosity: u8) {
	// 0 = session lifecycle only
	// 1 (-v) = command traffic and relay activity
	// 2+ (-vv) = everything, including http and websocket internals
	let filter = match verbosity {
		0 => "warn,dglab=info,dglab_cli=info",
		1 => "info,dglab=debug,dglab_runtime=debug,dglab_cli=debug",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
