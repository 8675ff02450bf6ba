use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[cfg(test)]
mod tests;

/// Default REST base of a local terminal server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8888/";

#[derive(Parser, Debug)]
#[command(name = "rterm")]
#[command(about = "Start, attach to and shut down server-hosted terminals")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text or json
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(flatten)]
	pub server: ServerArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// Where the terminal server lives and how to authenticate.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
	/// REST base URL of the server
	#[arg(long, global = true, env = "RTERM_BASE_URL", value_name = "URL", default_value = DEFAULT_BASE_URL)]
	pub base_url: String,

	/// WebSocket base URL (derived from --base-url when omitted)
	#[arg(long, global = true, env = "RTERM_WS_URL", value_name = "URL")]
	pub ws_url: Option<String>,

	/// Access token sent with every request
	#[arg(long, global = true, env = "RTERM_TOKEN", value_name = "TOKEN", hide_env_values = true)]
	pub token: Option<String>,

	/// Do not append the token to channel URLs
	#[arg(long, global = true)]
	pub no_token_query: bool,

	/// Control request timeout in seconds
	#[arg(long, global = true, value_name = "SECS", default_value_t = 30)]
	pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List running terminals
	#[command(alias = "ls")]
	List,

	/// Start a new terminal
	New(NewArgs),

	/// Attach to a terminal: stdin lines go in, stdout frames come out
	Attach(AttachArgs),

	/// Send one line of input to a terminal
	Send(SendArgs),

	/// Shut a terminal down
	#[command(alias = "kill")]
	Shutdown(NameArgs),

	/// Shut every running terminal down
	ShutdownAll,
}

#[derive(Args, Debug)]
pub struct NewArgs {
	/// Requested terminal name (the server may pick its own)
	#[arg(long)]
	pub name: Option<String>,

	/// Working directory for the terminal's shell
	#[arg(long, value_name = "DIR")]
	pub cwd: Option<String>,
}

#[derive(Args, Debug)]
pub struct AttachArgs {
	/// Terminal name
	pub name: String,

	/// Send a resize before forwarding input
	#[arg(long, value_name = "ROWSxCOLS", value_parser = parse_size)]
	pub size: Option<(u16, u16)>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
	/// Terminal name
	pub name: String,

	/// Text to send
	pub text: String,

	/// Do not terminate the text with a carriage return
	#[arg(long)]
	pub no_enter: bool,

	/// How long to keep the channel open after sending, in milliseconds
	#[arg(long, value_name = "MS", default_value_t = 250)]
	pub linger: u64,
}

#[derive(Args, Debug)]
pub struct NameArgs {
	/// Terminal name
	pub name: String,
}

/// Parses `24x80` into `(rows, cols)`.
pub fn parse_size(value: &str) -> Result<(u16, u16), String> {
	let (rows, cols) = value
		.split_once(['x', 'X'])
		.ok_or_else(|| format!("expected ROWSxCOLS, got '{value}'"))?;
	let rows = rows.trim().parse().map_err(|e| format!("invalid rows '{rows}': {e}"))?;
	let cols = cols.trim().parse().map_err(|e| format!("invalid cols '{cols}': {e}"))?;
	Ok((rows, cols))
}
