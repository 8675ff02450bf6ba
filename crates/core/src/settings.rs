//! Per-server connection settings.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rterm_runtime::{
	ApiRequest, Connector, ControlApi, HttpControlApi, Result, Url, WebSocketConnector, join_segments,
	to_ws_base, with_token,
};

use crate::registry::Registry;

const TERMINALS_PATH: &str = "terminals";
const WEBSOCKET_PATH: &str = "websocket";

/// How a session retries after losing its channel.
///
/// The delay before retry `n` (0-based) is `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 7,
			base_delay: Duration::from_secs(1),
		}
	}
}

impl ReconnectPolicy {
	/// A policy that never retries.
	pub fn disabled() -> Self {
		Self {
			max_attempts: 0,
			base_delay: Duration::ZERO,
		}
	}

	pub fn delay(&self, attempt: u32) -> Duration {
		self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
	}
}

/// Everything a session or directory call needs to reach one server.
///
/// Cloning is cheap; the capabilities are shared.
#[derive(Clone)]
pub struct ServerSettings {
	base_url: Url,
	ws_url: Url,
	token: Option<String>,
	append_token: bool,
	terminals_available: bool,
	reconnect: ReconnectPolicy,
	api: Arc<dyn ControlApi>,
	connector: Arc<dyn Connector>,
	registry: Arc<Registry>,
}

impl ServerSettings {
	/// Parses `base_url` and derives the WebSocket base from it.
	pub fn new(base_url: &str) -> Result<Self> {
		Self::from_url(Url::parse(base_url)?)
	}

	pub fn from_url(base_url: Url) -> Result<Self> {
		let ws_url = to_ws_base(&base_url)?;
		Ok(Self {
			base_url,
			ws_url,
			token: None,
			append_token: true,
			terminals_available: true,
			reconnect: ReconnectPolicy::default(),
			api: Arc::new(HttpControlApi::new()),
			connector: Arc::new(WebSocketConnector::new()),
			registry: Registry::shared(),
		})
	}

	pub fn with_ws_url(mut self, ws_url: Url) -> Self {
		self.ws_url = ws_url;
		self
	}

	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// Whether channel URLs carry the token as a query parameter.
	pub fn with_append_token(mut self, append_token: bool) -> Self {
		self.append_token = append_token;
		self
	}

	pub fn with_terminals_available(mut self, available: bool) -> Self {
		self.terminals_available = available;
		self
	}

	pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
		self.reconnect = policy;
		self
	}

	pub fn with_control_api(mut self, api: Arc<dyn ControlApi>) -> Self {
		self.api = api;
		self
	}

	pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
		self.connector = connector;
		self
	}

	pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
		self.registry = registry;
		self
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	pub fn ws_url(&self) -> &Url {
		&self.ws_url
	}

	pub fn token(&self) -> Option<&str> {
		self.token.as_deref()
	}

	pub fn append_token(&self) -> bool {
		self.append_token
	}

	pub fn terminals_available(&self) -> bool {
		self.terminals_available
	}

	pub fn reconnect_policy(&self) -> &ReconnectPolicy {
		&self.reconnect
	}

	pub fn control_api(&self) -> &Arc<dyn ControlApi> {
		&self.api
	}

	pub fn connector(&self) -> &Arc<dyn Connector> {
		&self.connector
	}

	pub fn registry(&self) -> &Arc<Registry> {
		&self.registry
	}

	/// `<base>/terminals`
	pub fn terminals_url(&self) -> Result<Url> {
		join_segments(&self.base_url, &[TERMINALS_PATH])
	}

	/// `<base>/terminals/<name>`, also the registry key for `name`.
	pub fn terminal_url(&self, name: &str) -> Result<Url> {
		join_segments(&self.base_url, &[TERMINALS_PATH, name])
	}

	/// `<ws>/terminals/websocket/<name>[?token=...]`
	pub fn channel_url(&self, name: &str) -> Result<Url> {
		let url = join_segments(&self.ws_url, &[TERMINALS_PATH, WEBSOCKET_PATH, name])?;
		Ok(match (&self.token, self.append_token) {
			(Some(token), true) => with_token(url, token),
			_ => url,
		})
	}

	/// Attaches the configured token to a control request.
	pub(crate) fn authorize(&self, request: ApiRequest) -> ApiRequest {
		request.with_token(self.token.clone())
	}
}

impl fmt::Debug for ServerSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServerSettings")
			.field("base_url", &self.base_url.as_str())
			.field("ws_url", &self.ws_url.as_str())
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.field("append_token", &self.append_token)
			.field("terminals_available", &self.terminals_available)
			.field("reconnect", &self.reconnect)
			.finish_non_exhaustive()
	}
}
