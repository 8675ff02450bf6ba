//! Session directory - server-wide terminal operations.
//!
//! These functions mediate between the server's authoritative list of running
//! terminals and local [`TerminalSession`] objects. They never touch message
//! traffic.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use rterm_protocol::{StartOptions, TerminalModel};
use rterm_runtime::{ApiRequest, Error, Result, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::session::TerminalSession;
use crate::settings::ServerSettings;

const STATUS_OK: u16 = 200;
const STATUS_NO_CONTENT: u16 = 204;
const STATUS_NOT_FOUND: u16 = 404;

/// Whether the terminal service is enabled for this deployment.
pub fn is_available(settings: &ServerSettings) -> bool {
	settings.terminals_available()
}

fn ensure_available(settings: &ServerSettings) -> Result<()> {
	if is_available(settings) {
		Ok(())
	} else {
		Err(Error::ServiceUnavailable)
	}
}

/// Creates a terminal on the server and connects a session to it.
pub async fn start_new(settings: &ServerSettings, options: &StartOptions) -> Result<Arc<TerminalSession>> {
	ensure_available(settings)?;

	let url = settings.terminals_url()?;
	let body = serde_json::to_value(options)?;
	let response = settings
		.control_api()
		.send(settings.authorize(ApiRequest::post(url, body)))
		.await?;
	if response.status != STATUS_OK {
		return Err(response.into_error());
	}

	let model: TerminalModel = response
		.json()
		.map_err(|e| Error::ProtocolViolation(format!("invalid terminal model: {e}")))?;
	debug!(name = %model.name, "terminal created");

	TerminalSession::connect(model.name, settings.clone())
}

/// Connects to a terminal that is already running.
///
/// A live local session for `name` is never handed out directly; the caller
/// gets a clone with its own lifecycle. Otherwise the server's running list
/// decides whether `name` exists.
pub async fn connect_to(name: &str, settings: &ServerSettings) -> Result<Arc<TerminalSession>> {
	ensure_available(settings)?;

	let endpoint = settings.terminal_url(name)?;
	if let Some(existing) = settings.registry().lookup(endpoint.as_str()) {
		if !existing.is_disposed() {
			debug!(name, "cloning live terminal session");
			return existing.clone_session();
		}
	}

	let running = list_running(settings).await?;
	if running.iter().any(|model| model.name == name) {
		TerminalSession::connect(name, settings.clone())
	} else {
		Err(Error::NotFound(format!("No running terminal session: {name}")))
	}
}

/// Lists the server's running terminals and reconciles the registry.
///
/// Every registered session under this server's base whose terminal is no
/// longer reported is disposed.
pub async fn list_running(settings: &ServerSettings) -> Result<Vec<TerminalModel>> {
	ensure_available(settings)?;

	let url = settings.terminals_url()?;
	let response = settings
		.control_api()
		.send(settings.authorize(ApiRequest::get(url.clone())))
		.await?;
	if response.status != STATUS_OK {
		return Err(response.into_error());
	}

	let Value::Array(items) = response.json::<Value>()? else {
		return Err(Error::ProtocolViolation(format!("expected an array of terminals from {url}")));
	};
	let models = items
		.into_iter()
		.map(serde_json::from_value::<TerminalModel>)
		.collect::<std::result::Result<Vec<_>, _>>()
		.map_err(|e| Error::ProtocolViolation(format!("invalid terminal model: {e}")))?;

	reconcile(settings, &url, &models)?;
	Ok(models)
}

fn reconcile(settings: &ServerSettings, terminals_url: &Url, models: &[TerminalModel]) -> Result<()> {
	let live = models
		.iter()
		.map(|model| settings.terminal_url(&model.name).map(String::from))
		.collect::<Result<HashSet<_>>>()?;
	let prefix = format!("{}/", terminals_url.as_str().trim_end_matches('/'));

	let orphans: Vec<_> = settings
		.registry()
		.sessions()
		.into_iter()
		.filter(|session| session.endpoint().starts_with(&prefix) && !live.contains(session.endpoint()))
		.collect();

	for session in orphans {
		debug!(name = %session.name(), "terminal no longer running, disposing local session");
		session.dispose();
	}
	Ok(())
}

/// Asks the server to shut `name` down.
///
/// A terminal the server does not know is treated as already gone. The local
/// session, if any, is left alone.
pub async fn shutdown(name: &str, settings: &ServerSettings) -> Result<()> {
	ensure_available(settings)?;

	let url = settings.terminal_url(name)?;
	let response = settings
		.control_api()
		.send(settings.authorize(ApiRequest::delete(url)))
		.await?;
	match response.status {
		STATUS_NO_CONTENT => {
			debug!(name, "terminal shut down");
			Ok(())
		}
		STATUS_NOT_FOUND => {
			warn!(name, status = response.status, "terminal not found during shutdown");
			Ok(())
		}
		_ => Err(response.into_error()),
	}
}

/// Shuts every running terminal down concurrently.
///
/// All shutdowns run to completion. Each failure is logged and the first one,
/// in list order, is returned.
pub async fn shutdown_all(settings: &ServerSettings) -> Result<()> {
	let running = list_running(settings).await?;
	let results = join_all(running.iter().map(|model| shutdown(&model.name, settings))).await;

	let mut first = None;
	for (model, result) in running.iter().zip(results) {
		if let Err(e) = result {
			warn!(name = %model.name, "failed to shut down terminal: {}", e);
			first.get_or_insert(e);
		}
	}
	first.map_or(Ok(()), Err)
}
