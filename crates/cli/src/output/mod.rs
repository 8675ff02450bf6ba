//! Result envelope and printing for CLI commands.
//!
//! With `--format json` every command writes one envelope to stdout:
//!
//! ```json
//! { "ok": true, "command": "list", "data": [{ "name": "1" }] }
//! ```
//!
//! and on failure:
//!
//! ```json
//! { "ok": false, "command": "list", "error": { "code": "SERVICE_UNAVAILABLE", "message": "..." } }
//! ```


use std::io::{self, Write};

use rterm::{Error, TerminalModel};
use serde::Serialize;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope
	Json,
}

/// The envelope returned by every command in JSON mode.
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(command: &str, data: T) -> Self {
		Self {
			ok: true,
			command: command.to_string(),
			data: Some(data),
			error: None,
		}
	}
}

impl CommandResult<()> {
	pub fn failure(command: &str, error: CommandError) -> Self {
		Self {
			ok: false,
			command: command.to_string(),
			data: None,
			error: Some(error),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// The server has terminals switched off
	ServiceUnavailable,
	/// No running terminal with that name
	NotFound,
	/// The control API answered with an unexpected status
	ResponseError,
	/// The server sent something malformed
	ProtocolViolation,
	/// The terminal channel could not be opened or was lost
	ConnectionFailed,
	/// Bad URL or argument
	InvalidInput,
	/// Anything else
	InternalError,
}

impl CommandError {
	/// Classifies `err` by the library error it wraps, if any.
	pub fn from_anyhow(err: &anyhow::Error) -> Self {
		let message = format!("{err:#}");
		let Some(inner) = err.downcast_ref::<Error>() else {
			return Self {
				code: ErrorCode::InternalError,
				message,
				status: None,
			};
		};
		let code = match inner {
			Error::ServiceUnavailable => ErrorCode::ServiceUnavailable,
			_ if inner.is_not_found() => ErrorCode::NotFound,
			Error::Response { .. } => ErrorCode::ResponseError,
			Error::ProtocolViolation(_) | Error::Json(_) => ErrorCode::ProtocolViolation,
			Error::ConnectionFailed(_) | Error::TransportError(_) | Error::Disposed(_) | Error::Timeout(_) => {
				ErrorCode::ConnectionFailed
			}
			Error::Http(_) => ErrorCode::ConnectionFailed,
			Error::InvalidUrl(_) => ErrorCode::InvalidInput,
			Error::NotFound(_) => ErrorCode::NotFound,
		};
		Self {
			code,
			message,
			status: inner.status(),
		}
	}
}

pub fn print_result<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();
	match serde_json::to_string(result) {
		Ok(json) => {
			let _ = writeln!(stdout, "{json}");
		}
		Err(e) => {
			let _ = writeln!(stdout, r#"{{"ok":false,"error":{{"code":"INTERNAL_ERROR","message":"{e}"}}}}"#);
		}
	}
}

pub fn print_error_stderr(error: &CommandError) {
	eprintln!("error: {}", error.message);
}

/// Renders a running list as one name per line.
pub fn format_models(models: &[TerminalModel]) -> String {
	if models.is_empty() {
		return "no running terminals".to_string();
	}
	models.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join("\n")
}

/// Prints `data` in the chosen format; `text` renders it for humans.
pub fn emit<T: Serialize>(format: OutputFormat, command: &str, data: T, text: impl FnOnce(&T) -> String) {
	match format {
		OutputFormat::Json => print_result(&CommandResult::success(command, data)),
		OutputFormat::Text => println!("{}", text(&data)),
	}
}
