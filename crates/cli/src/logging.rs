//! Stderr tracing subscriber for the `rterm` binary.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the global subscriber. `RUST_LOG` overrides `verbosity`.
///
/// Stdout stays reserved for command output, so everything goes to stderr.
pub fn init_logging(verbosity: u8) -> anyhow::Result<()> {
	let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(filter_for(verbosity)))?;
	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_ansi(std::io::stderr().is_terminal())
		.with_target(verbosity > 1)
		.compact()
		.try_init()
		.map_err(|e| anyhow::anyhow!(e))
}

/// Quiet by default: library warnings such as reconnect attempts only show
/// from `-v` on, frame traffic from `-vv`.
fn filter_for(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error,rterm=error,rterm_runtime=error",
		1 => "info,rterm=warn,rterm_runtime=warn",
		_ => "debug,rterm=debug,rterm_runtime=debug",
	}
}
