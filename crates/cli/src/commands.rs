//! Command implementations.
//!
//! Each command builds [`ServerSettings`] from the global flags, runs one
//! directory operation and prints its result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rterm::{
	ConnectionState, HttpControlApi, Message, MessageType, ServerSettings, StartOptions, TerminalManager, Url,
	directory,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{AttachArgs, Cli, Commands, NewArgs, SendArgs, ServerArgs};
use crate::output::{self, OutputFormat};

/// Name used in the JSON envelope.
pub fn command_name(command: &Commands) -> &'static str {
	match command {
		Commands::List => "list",
		Commands::New(_) => "new",
		Commands::Attach(_) => "attach",
		Commands::Send(_) => "send",
		Commands::Shutdown(_) => "shutdown",
		Commands::ShutdownAll => "shutdown-all",
	}
}

pub fn settings_from_args(args: &ServerArgs) -> Result<ServerSettings> {
	let api = HttpControlApi::with_timeout(Duration::from_secs(args.timeout))?;
	let mut settings = ServerSettings::new(&args.base_url)
		.with_context(|| format!("invalid --base-url '{}'", args.base_url))?
		.with_control_api(Arc::new(api))
		.with_append_token(!args.no_token_query);

	if let Some(ws_url) = &args.ws_url {
		let ws_url = Url::parse(ws_url).with_context(|| format!("invalid --ws-url '{ws_url}'"))?;
		settings = settings.with_ws_url(ws_url);
	}
	if let Some(token) = args.token.as_deref().filter(|t| !t.is_empty()) {
		settings = settings.with_token(token);
	}
	Ok(settings)
}

pub async fn dispatch(cli: Cli) -> Result<()> {
	let settings = settings_from_args(&cli.server)?;
	let format = cli.format;
	debug!(?settings, command = command_name(&cli.command), "dispatching");

	match cli.command {
		Commands::List => list(settings, format).await,
		Commands::New(args) => new(settings, args, format).await,
		Commands::Attach(args) => attach(settings, args, format).await,
		Commands::Send(args) => send(settings, args, format).await,
		Commands::Shutdown(args) => shutdown(settings, &args.name, format).await,
		Commands::ShutdownAll => shutdown_all(settings, format).await,
	}
}

async fn list(settings: ServerSettings, format: OutputFormat) -> Result<()> {
	let manager = TerminalManager::new(settings);
	let models = manager.refresh_running().await.context("listing terminals")?;
	output::emit(format, "list", models, |models| output::format_models(models));
	Ok(())
}

async fn new(settings: ServerSettings, args: NewArgs, format: OutputFormat) -> Result<()> {
	let mut options = StartOptions::default();
	options.name = args.name;
	options.cwd = args.cwd;

	let session = directory::start_new(&settings, &options)
		.await
		.context("starting terminal")?;
	let model = session.model();
	// The terminal keeps running on the server; only the local channel goes.
	session.dispose();

	info!(name = %model.name, "terminal started");
	output::emit(format, "new", model, |model| model.name.clone());
	Ok(())
}

enum AttachEvent {
	Frame(Message),
	Terminated,
}

async fn attach(settings: ServerSettings, args: AttachArgs, format: OutputFormat) -> Result<()> {
	let session = directory::connect_to(&args.name, &settings)
		.await
		.with_context(|| format!("attaching to '{}'", args.name))?;
	session.ready().await?;

	let (tx, mut events) = mpsc::unbounded_channel();
	let frames = tx.clone();
	let _messages = session.on_message(move |message| {
		let _ = frames.send(AttachEvent::Frame(message.clone()));
	});
	let _terminated = session.on_terminated(move |_| {
		let _ = tx.send(AttachEvent::Terminated);
	});

	if let Some((rows, cols)) = args.size {
		session.send(&Message::set_size(rows, cols));
	}

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	let mut states = session.state_changes();
	let mut stdout = tokio::io::stdout();

	loop {
		tokio::select! {
			line = lines.next_line() => match line? {
				Some(line) => session.send(&Message::stdin(format!("{line}\r"))),
				None => break,
			},
			event = events.recv() => match event {
				Some(AttachEvent::Frame(message)) => {
					if message.kind == MessageType::Disconnect {
						break;
					}
					write_frame(&mut stdout, &message, format).await?;
				}
				Some(AttachEvent::Terminated) | None => break,
			},
			changed = states.changed() => {
				if changed.is_err() || *states.borrow() == ConnectionState::Closed {
					break;
				}
			}
			_ = tokio::signal::ctrl_c() => break,
		}
	}

	session.dispose();
	Ok(())
}

async fn write_frame(stdout: &mut tokio::io::Stdout, message: &Message, format: OutputFormat) -> Result<()> {
	match format {
		OutputFormat::Json => {
			let line = serde_json::to_string(message)?;
			stdout.write_all(line.as_bytes()).await?;
			stdout.write_all(b"\n").await?;
		}
		OutputFormat::Text if message.kind == MessageType::Stdout => {
			stdout.write_all(message.text().as_bytes()).await?;
		}
		OutputFormat::Text => {
			debug!(kind = %message.kind, "ignoring frame");
			return Ok(());
		}
	}
	stdout.flush().await?;
	Ok(())
}

async fn send(settings: ServerSettings, args: SendArgs, format: OutputFormat) -> Result<()> {
	let session = directory::connect_to(&args.name, &settings)
		.await
		.with_context(|| format!("connecting to '{}'", args.name))?;
	session.ready().await?;

	let text = if args.no_enter {
		args.text
	} else {
		format!("{}\r", args.text)
	};
	session.send(&Message::stdin(text.clone()));
	tokio::time::sleep(Duration::from_millis(args.linger)).await;
	session.dispose();

	output::emit(format, "send", json!({ "name": args.name, "sent": text }), |_| {
		format!("sent {} bytes to {}", text.len(), args.name)
	});
	Ok(())
}

async fn shutdown(settings: ServerSettings, name: &str, format: OutputFormat) -> Result<()> {
	directory::shutdown(name, &settings)
		.await
		.with_context(|| format!("shutting down '{name}'"))?;
	output::emit(format, "shutdown", json!({ "name": name }), |_| format!("shut down {name}"));
	Ok(())
}

async fn shutdown_all(settings: ServerSettings, format: OutputFormat) -> Result<()> {
	let manager = TerminalManager::new(settings);
	let running = manager.refresh_running().await.context("listing terminals")?;
	manager.shutdown_all().await.context("shutting down terminals")?;

	let names: Vec<_> = running.into_iter().map(|model| model.name).collect();
	output::emit(format, "shutdown-all", json!({ "names": names }), |_| {
		format!("shut down {} terminal(s)", names.len())
	});
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	fn server_args(extra: &[&str]) -> ServerArgs {
		let mut argv = vec!["rterm", "list"];
		argv.extend_from_slice(extra);
		Cli::try_parse_from(argv).unwrap().server
	}

	#[test]
	fn settings_follow_flags() {
		let settings = settings_from_args(&server_args(&[
			"--base-url",
			"https://example.com/api/",
			"--token",
			"abc",
		]))
		.unwrap();
		assert_eq!(settings.ws_url().as_str(), "wss://example.com/api/");
		assert_eq!(settings.token(), Some("abc"));
		assert!(settings.append_token());
		assert_eq!(
			settings.channel_url("1").unwrap().as_str(),
			"wss://example.com/api/terminals/websocket/1?token=abc"
		);
	}

	#[test]
	fn explicit_ws_url_and_no_token_query() {
		let settings = settings_from_args(&server_args(&[
			"--base-url",
			"http://localhost:8888/",
			"--ws-url",
			"ws://127.0.0.1:9999/",
			"--token",
			"abc",
			"--no-token-query",
		]))
		.unwrap();
		assert_eq!(
			settings.channel_url("2").unwrap().as_str(),
			"ws://127.0.0.1:9999/terminals/websocket/2"
		);
	}

	#[test]
	fn empty_token_is_ignored() {
		let settings = settings_from_args(&server_args(&["--base-url", "http://localhost/", "--token", ""])).unwrap();
		assert_eq!(settings.token(), None);
	}

	#[test]
	fn invalid_base_url_is_reported() {
		let err = settings_from_args(&server_args(&["--base-url", "::nope"])).unwrap_err();
		assert!(format!("{err:#}").contains("invalid --base-url"));
	}

	#[test]
	fn command_names() {
		let cli = Cli::try_parse_from(["rterm", "shutdown-all"]).unwrap();
		assert_eq!(command_name(&cli.command), "shutdown-all");
	}
}
