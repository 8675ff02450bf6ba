//! Per-server terminal manager.
//!
//! Wraps the directory functions for one [`ServerSettings`] and caches the
//! last known list of running terminals, so UIs can render it without a
//! round trip and react when it changes.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rterm_protocol::{StartOptions, TerminalModel};
use rterm_runtime::{Error, Result};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::directory;
use crate::handlers::{Signal, Subscription};
use crate::session::TerminalSession;
use crate::settings::ServerSettings;

/// Cached view of one server's running terminals.
pub struct TerminalManager {
	settings: ServerSettings,
	running: Mutex<Vec<TerminalModel>>,
	running_changed: Signal<Vec<TerminalModel>>,
}

impl TerminalManager {
	pub fn new(settings: ServerSettings) -> Self {
		Self {
			settings,
			running: Mutex::new(Vec::new()),
			running_changed: Signal::new(),
		}
	}

	pub fn settings(&self) -> &ServerSettings {
		&self.settings
	}

	pub fn is_available(&self) -> bool {
		directory::is_available(&self.settings)
	}

	/// Last known running terminals. Empty until the first refresh.
	pub fn running(&self) -> Vec<TerminalModel> {
		self.running.lock().clone()
	}

	/// Registers a listener called with the new list whenever the set of
	/// running names changes.
	pub fn on_running_changed<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&Vec<TerminalModel>) + Send + Sync + 'static,
	{
		self.running_changed.connect(handler)
	}

	/// Re-reads the running list from the server.
	///
	/// Also reconciles the registry, see [`directory::list_running`].
	pub async fn refresh_running(&self) -> Result<Vec<TerminalModel>> {
		let models = directory::list_running(&self.settings).await?;
		self.update(models.clone());
		Ok(models)
	}

	pub async fn start_new(&self, options: &StartOptions) -> Result<Arc<TerminalSession>> {
		let session = directory::start_new(&self.settings, options).await?;
		let mut models = self.running();
		if !models.iter().any(|model| model.name == session.name()) {
			models.push(session.model());
			self.update(models);
		}
		Ok(session)
	}

	pub async fn connect_to(&self, name: &str) -> Result<Arc<TerminalSession>> {
		directory::connect_to(name, &self.settings).await
	}

	/// Shuts `name` down, then refreshes, which disposes its local session.
	pub async fn shutdown(&self, name: &str) -> Result<()> {
		directory::shutdown(name, &self.settings).await?;
		self.refresh_running().await?;
		Ok(())
	}

	/// Shuts everything down and refreshes, even if some shutdowns failed.
	pub async fn shutdown_all(&self) -> Result<()> {
		let result = directory::shutdown_all(&self.settings).await;
		if let Err(e) = self.refresh_running().await {
			warn!("refresh after shutdown_all failed: {}", e);
		}
		result
	}

	/// Refreshes every `interval` in the background until the handle is
	/// dropped, the manager is gone, or the service turns out unavailable.
	pub fn poll(self: &Arc<Self>, interval: Duration) -> PollHandle {
		let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
		let manager: Weak<Self> = Arc::downgrade(self);

		let task = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			loop {
				tokio::select! {
					_ = &mut stop_rx => break,
					_ = ticker.tick() => {}
				}
				let Some(manager) = manager.upgrade() else { break };
				match manager.refresh_running().await {
					Ok(_) => {}
					Err(Error::ServiceUnavailable) => {
						debug!("terminals unavailable, polling stopped");
						break;
					}
					Err(e) => warn!("failed to refresh running terminals: {}", e),
				}
			}
		});

		PollHandle {
			stop: Some(stop_tx),
			task: Some(task),
		}
	}

	fn update(&self, models: Vec<TerminalModel>) {
		let changed = {
			let mut running = self.running.lock();
			let changed = names(&running) != names(&models);
			*running = models.clone();
			changed
		};
		if changed {
			debug!(count = models.len(), "running terminals changed");
			self.running_changed.emit(&models);
		}
	}
}

fn names(models: &[TerminalModel]) -> BTreeSet<&str> {
	models.iter().map(|model| model.name.as_str()).collect()
}

impl std::fmt::Debug for TerminalManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TerminalManager")
			.field("settings", &self.settings)
			.field("running", &*self.running.lock())
			.finish()
	}
}

/// Background refresh started by [`TerminalManager::poll`]. Stops on drop.
#[derive(Debug)]
pub struct PollHandle {
	stop: Option<oneshot::Sender<()>>,
	task: Option<JoinHandle<()>>,
}

impl PollHandle {
	pub fn is_finished(&self) -> bool {
		self.task.as_ref().is_none_or(JoinHandle::is_finished)
	}

	/// Stops polling and waits for the loop to exit.
	pub async fn stop(mut self) {
		if let Some(stop) = self.stop.take() {
			let _ = stop.send(());
		}
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}

impl Drop for PollHandle {
	fn drop(&mut self) {
		if let Some(stop) = self.stop.take() {
			let _ = stop.send(());
		}
	}
}
