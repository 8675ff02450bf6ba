//! Terminal session - one client-side handle on a server-hosted terminal.
//!
//! A session owns its duplex channel and drives it through
//! [`ConnectionState`]. Inbound frames pass the [`ReconnectGuard`] before they
//! reach `on_message` listeners; `on_terminated` listeners fire once, at the
//! start of [`TerminalSession::dispose`].
//!
//! # Channel tasks
//!
//! Each channel is served by one spawned pump task tagged with a generation
//! number. Opening a new channel bumps the generation, so events from a
//! superseded pump are ignored even if it has not been aborted yet.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rterm_protocol::{Message, TerminalModel};
use rterm_runtime::{Error, Result, Url};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::directory;
use crate::handlers::{Signal, Subscription};
use crate::settings::ServerSettings;

mod state;

pub use state::{Admission, ConnectionState, ReconnectGuard};

/// Distinguishes session objects that share a name.
pub type InstanceId = u64;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Client-side handle on one remote terminal.
pub struct TerminalSession {
	id: InstanceId,
	name: String,
	endpoint: String,
	channel_url: Url,
	settings: ServerSettings,
	state_tx: watch::Sender<ConnectionState>,
	guard: Mutex<ReconnectGuard>,
	outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
	pump: Mutex<Option<JoinHandle<()>>>,
	generation: AtomicU64,
	disposing: AtomicBool,
	disposed: AtomicBool,
	message_received: Signal<Message>,
	terminated: Signal<()>,
	weak_self: Weak<TerminalSession>,
}

impl TerminalSession {
	/// Creates a session for `name`, claims its registry slot and starts
	/// opening its channel.
	///
	/// Must be called from within a tokio runtime. Await [`ready`](Self::ready)
	/// to wait for the channel.
	pub fn connect(name: impl Into<String>, settings: ServerSettings) -> Result<Arc<Self>> {
		let name = name.into();
		let endpoint = settings.terminal_url(&name)?.to_string();
		let channel_url = settings.channel_url(&name)?;
		let (state_tx, _) = watch::channel(ConnectionState::Connecting);

		let session = Arc::new_cyclic(|weak_self| Self {
			id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::SeqCst),
			name,
			endpoint,
			channel_url,
			settings,
			state_tx,
			guard: Mutex::new(ReconnectGuard::new()),
			outbound: Mutex::new(None),
			pump: Mutex::new(None),
			generation: AtomicU64::new(0),
			disposing: AtomicBool::new(false),
			disposed: AtomicBool::new(false),
			message_received: Signal::new(),
			terminated: Signal::new(),
			weak_self: weak_self.clone(),
		});

		debug!(name = %session.name, endpoint = %session.endpoint, instance = session.id, "terminal session created");

		if let Some(previous) = session
			.settings
			.registry()
			.register(&session.endpoint, Arc::clone(&session))
		{
			debug!(name = %session.name, superseded = previous.id, "registry slot taken over");
		}
		session.open_channel(Duration::ZERO);

		Ok(session)
	}

	/// Server-assigned name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Registry key: `<base>/terminals/<name>`.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	pub fn model(&self) -> TerminalModel {
		TerminalModel::new(self.name.clone())
	}

	pub fn settings(&self) -> &ServerSettings {
		&self.settings
	}

	pub fn instance_id(&self) -> InstanceId {
		self.id
	}

	pub fn connection_state(&self) -> ConnectionState {
		*self.state_tx.borrow()
	}

	/// Receiver that observes every state transition.
	pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
		self.state_tx.subscribe()
	}

	/// Automatic reconnect attempts since the last setup handshake.
	pub fn reconnect_attempt(&self) -> u32 {
		self.guard.lock().attempt()
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::SeqCst)
	}

	/// Registers a listener for delivered inbound frames.
	pub fn on_message<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&Message) + Send + Sync + 'static,
	{
		self.message_received.connect(handler)
	}

	/// Registers a listener for disposal.
	pub fn on_terminated<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&()) + Send + Sync + 'static,
	{
		self.terminated.connect(handler)
	}

	/// Resolves once the current channel is open.
	///
	/// # Errors
	///
	/// [`Error::Disposed`] if the session is disposed first,
	/// [`Error::ConnectionFailed`] if reconnect attempts are exhausted.
	pub async fn ready(&self) -> Result<()> {
		let mut rx = self.state_tx.subscribe();
		loop {
			let state = *rx.borrow_and_update();
			match state {
				ConnectionState::Open => return Ok(()),
				ConnectionState::Disposed => return Err(Error::Disposed(self.name.clone())),
				ConnectionState::Closed => {
					return Err(Error::ConnectionFailed(format!("terminal '{}' channel closed", self.name)));
				}
				ConnectionState::Connecting | ConnectionState::Reconnecting => {}
			}
			if rx.changed().await.is_err() {
				return Err(Error::Disposed(self.name.clone()));
			}
		}
	}

	/// Writes `message` to the channel without waiting for any acknowledgement.
	///
	/// Does nothing once disposed, for a message without content, or while no
	/// channel is open.
	pub fn send(&self, message: &Message) {
		if self.is_disposed() || message.is_empty() {
			return;
		}
		let text = match serde_json::to_string(message) {
			Ok(text) => text,
			Err(e) => {
				warn!(name = %self.name, "failed to encode frame: {}", e);
				return;
			}
		};
		match self.outbound.lock().as_ref() {
			Some(tx) if tx.send(text).is_ok() => {}
			_ => debug!(name = %self.name, kind = %message.kind, "no open channel, frame dropped"),
		}
	}

	/// Drops the current channel and opens a fresh one to the same endpoint.
	///
	/// Resets the reconnect-attempt counter, so nothing is suppressed on the
	/// new channel.
	pub async fn reconnect(&self) -> Result<()> {
		if self.is_disposed() {
			return Err(Error::Disposed(self.name.clone()));
		}
		self.guard.lock().reset();
		if let Some(previous) = self.pump.lock().take() {
			previous.abort();
		}
		*self.outbound.lock() = None;
		self.set_state(ConnectionState::Connecting);
		self.open_channel(Duration::ZERO);
		self.ready().await
	}

	/// Asks the server to shut this terminal down.
	///
	/// The local session stays alive; dispose it, or let the next
	/// [`directory::list_running`] reconcile it away.
	pub async fn shutdown(&self) -> Result<()> {
		directory::shutdown(&self.name, &self.settings).await
	}

	/// A fresh session for the same terminal with its own channel and
	/// listeners. It takes over the registry slot.
	pub fn clone_session(&self) -> Result<Arc<TerminalSession>> {
		TerminalSession::connect(self.name.clone(), self.settings.clone())
	}

	/// Tears the session down. Idempotent.
	///
	/// `on_terminated` listeners run first, while the channel is still up.
	/// Then the channel is dropped, the registry slot released if this
	/// instance still owns it, and every listener cleared.
	pub fn dispose(&self) {
		if self.disposing.swap(true, Ordering::SeqCst) {
			return;
		}
		debug!(name = %self.name, instance = self.id, "disposing terminal session");

		self.terminated.emit(&());

		self.disposed.store(true, Ordering::SeqCst);
		self.state_tx.send_replace(ConnectionState::Disposed);
		*self.outbound.lock() = None;
		if let Some(pump) = self.pump.lock().take() {
			pump.abort();
		}

		if !self.settings.registry().release(&self.endpoint, self.id) {
			debug!(name = %self.name, instance = self.id, "registry slot owned by a newer session");
		}

		self.message_received.clear();
		self.terminated.clear();
	}

	fn set_state(&self, state: ConnectionState) {
		self.state_tx.send_if_modified(|current| {
			if *current == ConnectionState::Disposed || *current == state {
				return false;
			}
			*current = state;
			true
		});
	}

	fn is_stale(&self, generation: u64) -> bool {
		self.is_disposed() || self.generation.load(Ordering::SeqCst) != generation
	}

	fn open_channel(&self, delay: Duration) {
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let weak = self.weak_self.clone();
		let connector = Arc::clone(self.settings.connector());
		let url = self.channel_url.clone();

		let handle = tokio::spawn(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
			let result = connector.connect(url).await;

			let mut receiver = {
				let Some(session) = weak.upgrade() else { return };
				match result {
					Ok(parts) => {
						if !session.on_open(generation, parts.sender) {
							return;
						}
						parts.receiver
					}
					Err(e) => {
						warn!(name = %session.name, "failed to open terminal channel: {}", e);
						session.on_channel_lost(generation);
						return;
					}
				}
			};

			while let Some(text) = receiver.recv().await {
				let Some(session) = weak.upgrade() else { return };
				session.on_frame(generation, &text);
			}

			if let Some(session) = weak.upgrade() {
				session.on_channel_lost(generation);
			}
		});

		*self.pump.lock() = Some(handle);
	}

	fn on_open(&self, generation: u64, sender: mpsc::UnboundedSender<String>) -> bool {
		{
			let mut outbound = self.outbound.lock();
			if self.is_stale(generation) {
				return false;
			}
			*outbound = Some(sender);
		}
		debug!(name = %self.name, generation, "terminal channel open");
		self.set_state(ConnectionState::Open);
		true
	}

	fn on_frame(&self, generation: u64, text: &str) {
		if self.is_stale(generation) {
			return;
		}
		let message: Message = match serde_json::from_str(text) {
			Ok(message) => message,
			Err(e) => {
				warn!(name = %self.name, "dropping malformed frame: {}", e);
				return;
			}
		};

		let admission = self.guard.lock().admit(&message.kind);
		match admission {
			Admission::Deliver => self.message_received.emit(&message),
			Admission::Suppress => {
				debug!(name = %self.name, kind = %message.kind, "frame suppressed until setup");
			}
			Admission::Resume => debug!(name = %self.name, "setup received, delivery resumed"),
		}
	}

	fn on_channel_lost(&self, generation: u64) {
		let retry = {
			let mut outbound = self.outbound.lock();
			if self.is_stale(generation) {
				return;
			}
			*outbound = None;
			let mut guard = self.guard.lock();
			guard
				.on_channel_lost(self.settings.reconnect_policy())
				.map(|delay| (delay, guard.attempt()))
		};

		match retry {
			Some((delay, attempt)) => {
				warn!(name = %self.name, attempt, ?delay, "terminal channel lost, reconnecting");
				self.set_state(ConnectionState::Reconnecting);
				self.open_channel(delay);
			}
			None => {
				warn!(name = %self.name, "terminal channel lost, giving up");
				self.set_state(ConnectionState::Closed);
			}
		}
	}
}

impl std::fmt::Debug for TerminalSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TerminalSession")
			.field("name", &self.name)
			.field("instance", &self.id)
			.field("state", &self.connection_state())
			.finish()
	}
}
