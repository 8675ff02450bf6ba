//! In-process server doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rterm_protocol::{StartOptions, TerminalModel};
use rterm_runtime::{ApiRequest, ApiResponse, BoxFuture, ControlApi, HttpMethod, MemoryConnector, Result};

use crate::registry::Registry;
use crate::settings::{ReconnectPolicy, ServerSettings};

#[derive(Default)]
struct State {
	names: Vec<String>,
	next_id: u32,
	forced: Option<(u16, String)>,
	delete_failures: HashMap<String, u16>,
	requests: Vec<ApiRequest>,
}

/// Scripted control API keeping its running terminals in memory.
#[derive(Default)]
pub(crate) struct FakeServer {
	state: Mutex<State>,
}

impl FakeServer {
	pub(crate) fn add(&self, name: &str) {
		self.state.lock().names.push(name.to_string());
	}

	pub(crate) fn remove(&self, name: &str) {
		self.state.lock().names.retain(|n| n != name);
	}

	pub(crate) fn names(&self) -> Vec<String> {
		self.state.lock().names.clone()
	}

	pub(crate) fn requests(&self) -> Vec<ApiRequest> {
		self.state.lock().requests.clone()
	}

	/// Answers every following request with `status` and `body`.
	pub(crate) fn force_status(&self, status: u16, body: &str) {
		self.state.lock().forced = Some((status, body.to_string()));
	}

	pub(crate) fn fail_delete(&self, name: &str, status: u16) {
		self.state.lock().delete_failures.insert(name.to_string(), status);
	}

	fn respond(&self, request: ApiRequest) -> ApiResponse {
		let url = request.url.to_string();
		let mut state = self.state.lock();
		state.requests.push(request.clone());

		let (status, body) = match state.forced.clone() {
			Some(forced) => forced,
			None => match request.method {
				HttpMethod::Post => {
					let options: StartOptions = request
						.body
						.and_then(|body| serde_json::from_value(body).ok())
						.unwrap_or_default();
					let name = options.name.unwrap_or_else(|| {
						state.next_id += 1;
						state.next_id.to_string()
					});
					state.names.push(name.clone());
					(200, serde_json::to_string(&TerminalModel::new(name)).unwrap())
				}
				HttpMethod::Get => {
					let models: Vec<_> = state.names.iter().map(TerminalModel::new).collect();
					(200, serde_json::to_string(&models).unwrap())
				}
				HttpMethod::Delete => {
					let name = request
						.url
						.path_segments()
						.and_then(|mut segments| segments.next_back())
						.unwrap_or_default()
						.to_string();
					if let Some(status) = state.delete_failures.get(&name) {
						(*status, String::new())
					} else if state.names.contains(&name) {
						state.names.retain(|n| *n != name);
						(204, String::new())
					} else {
						(404, String::new())
					}
				}
			},
		};

		ApiResponse { status, url, body }
	}
}

impl ControlApi for FakeServer {
	fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse>> {
		Box::pin(async move { Ok(self.respond(request)) })
	}
}

/// Settings wired to a fresh registry, a [`FakeServer`] and a
/// [`MemoryConnector`], with a fast reconnect policy.
pub(crate) fn fake_settings() -> (ServerSettings, Arc<FakeServer>, Arc<MemoryConnector>) {
	let server = Arc::new(FakeServer::default());
	let connector = Arc::new(MemoryConnector::new());
	let settings = ServerSettings::new("http://localhost:8888/api/")
		.unwrap()
		.with_token("secret")
		.with_registry(Arc::new(Registry::new()))
		.with_control_api(server.clone())
		.with_connector(connector.clone())
		.with_reconnect_policy(ReconnectPolicy {
			max_attempts: 3,
			base_delay: Duration::from_millis(10),
		});
	(settings, server, connector)
}
