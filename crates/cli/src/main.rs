use clap::Parser;
use rterm_cli::{
	cli::Cli,
	commands, logging,
	output::{self, CommandError, CommandResult, OutputFormat},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	if let Err(e) = logging::init_logging(cli.verbose) {
		eprintln!("warning: logging disabled: {e:#}");
	}

	let format = cli.format;
	let command = commands::command_name(&cli.command);

	if let Err(err) = commands::dispatch(cli).await {
		let error = CommandError::from_anyhow(&err);
		output::print_error_stderr(&error);
		if format == OutputFormat::Json {
			output::print_result(&CommandResult::<()>::failure(command, error));
		}
		std::process::exit(1);
	}
}
