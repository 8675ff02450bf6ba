//! Registry of live terminal sessions keyed by endpoint.
//!
//! Uses [`DashMap`] for lock-free concurrent access. One slot per endpoint;
//! the most recent registration owns it.

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::session::{InstanceId, TerminalSession};

static SHARED: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

/// Endpoint → live session map.
#[derive(Default)]
pub struct Registry {
	sessions: DashMap<String, Arc<TerminalSession>>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// The process-wide registry used by default settings.
	pub fn shared() -> Arc<Registry> {
		Arc::clone(&SHARED)
	}

	/// Stores `session` under `endpoint`, returning whichever session it replaced.
	pub fn register(&self, endpoint: &str, session: Arc<TerminalSession>) -> Option<Arc<TerminalSession>> {
		self.sessions.insert(endpoint.to_string(), session)
	}

	/// Removes the slot for `endpoint` regardless of who owns it.
	pub fn unregister(&self, endpoint: &str) -> Option<Arc<TerminalSession>> {
		self.sessions.remove(endpoint).map(|(_, session)| session)
	}

	/// Removes the slot for `endpoint` only if `instance` still owns it.
	pub(crate) fn release(&self, endpoint: &str, instance: InstanceId) -> bool {
		self.sessions
			.remove_if(endpoint, |_, session| session.instance_id() == instance)
			.is_some()
	}

	/// Synchronous lookup.
	pub fn lookup(&self, endpoint: &str) -> Option<Arc<TerminalSession>> {
		self.sessions.get(endpoint).map(|r| Arc::clone(r.value()))
	}

	pub fn endpoints(&self) -> Vec<String> {
		self.sessions.iter().map(|r| r.key().clone()).collect()
	}

	/// Snapshot of all registered sessions.
	pub fn sessions(&self) -> Vec<Arc<TerminalSession>> {
		self.sessions.iter().map(|r| Arc::clone(r.value())).collect()
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Registry")
			.field("endpoints", &self.endpoints())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::fake_settings;

	#[tokio::test]
	async fn test_last_writer_wins() {
		let (settings, _server, _) = fake_settings();
		let registry = Arc::clone(settings.registry());

		let first = TerminalSession::connect("1", settings.clone()).unwrap();
		let second = TerminalSession::connect("1", settings.clone()).unwrap();
		assert_eq!(registry.len(), 1);

		let owner = registry.lookup(first.endpoint()).unwrap();
		assert_eq!(owner.instance_id(), second.instance_id());

		assert!(!registry.release(first.endpoint(), first.instance_id()));
		assert_eq!(registry.len(), 1);
		assert!(registry.release(second.endpoint(), second.instance_id()));
		assert!(registry.is_empty());
	}

	#[tokio::test]
	async fn test_register_and_unregister() {
		let (settings, _server, _) = fake_settings();
		let registry = Registry::new();
		let session = TerminalSession::connect("1", settings).unwrap();

		assert!(registry.register("http://h/terminals/1", Arc::clone(&session)).is_none());
		assert!(registry.lookup("http://h/terminals/1").is_some());
		assert!(registry.lookup("http://h/terminals/2").is_none());
		assert_eq!(registry.endpoints(), vec!["http://h/terminals/1".to_string()]);

		let removed = registry.unregister("http://h/terminals/1").unwrap();
		assert_eq!(removed.instance_id(), session.instance_id());
		assert!(registry.unregister("http://h/terminals/1").is_none());
		assert!(registry.is_empty());
	}
}
