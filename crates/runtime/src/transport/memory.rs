//! In-process transport.
//!
//! Every successful [`MemoryConnector::connect`] hands the far end of the new
//! channel to whoever is waiting in [`MemoryConnector::accept`], which plays
//! the server.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use url::Url;

use super::{Connector, TransportParts};
use crate::BoxFuture;
use crate::error::{Error, Result};

/// Server side of an in-memory channel.
#[derive(Debug)]
pub struct MemoryPeer {
	url: Url,
	to_client: mpsc::UnboundedSender<String>,
	from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
	/// Address the client connected to.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Sends a raw text frame to the client. Returns false if the client is gone.
	pub fn send_text(&self, text: impl Into<String>) -> bool {
		self.to_client.send(text.into()).is_ok()
	}

	/// Serializes `value` and sends it as one frame.
	pub fn send<T: Serialize>(&self, value: &T) -> Result<()> {
		let text = serde_json::to_string(value)?;
		if self.send_text(text) {
			Ok(())
		} else {
			Err(Error::TransportError("client side of memory channel closed".to_string()))
		}
	}

	/// Next frame written by the client; `None` once the client closed its side.
	pub async fn recv(&mut self) -> Option<String> {
		self.from_client.recv().await
	}

	/// Non-blocking variant of [`recv`](Self::recv).
	pub fn try_recv(&mut self) -> Option<String> {
		self.from_client.try_recv().ok()
	}

	/// Closes the channel from the server side.
	pub fn close(self) {}
}

/// [`Connector`] producing in-memory channel pairs.
#[derive(Debug)]
pub struct MemoryConnector {
	accepted_tx: mpsc::UnboundedSender<MemoryPeer>,
	accepted_rx: Mutex<mpsc::UnboundedReceiver<MemoryPeer>>,
	refuse: AtomicBool,
	connects: AtomicUsize,
}

impl Default for MemoryConnector {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryConnector {
	pub fn new() -> Self {
		let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
		Self {
			accepted_tx,
			accepted_rx: Mutex::new(accepted_rx),
			refuse: AtomicBool::new(false),
			connects: AtomicUsize::new(0),
		}
	}

	/// Waits for the next client connection.
	pub async fn accept(&self) -> Option<MemoryPeer> {
		self.accepted_rx.lock().await.recv().await
	}

	/// Makes subsequent connects fail with [`Error::ConnectionFailed`].
	pub fn set_refuse(&self, refuse: bool) {
		self.refuse.store(refuse, Ordering::SeqCst);
	}

	/// Number of connect attempts seen so far, refused ones included.
	pub fn connect_count(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}
}

impl Connector for MemoryConnector {
	fn connect(&self, url: Url) -> BoxFuture<'_, Result<TransportParts>> {
		Box::pin(async move {
			self.connects.fetch_add(1, Ordering::SeqCst);
			if self.refuse.load(Ordering::SeqCst) {
				return Err(Error::ConnectionFailed(format!("{url}: refused")));
			}

			let (to_client, receiver) = mpsc::unbounded_channel();
			let (sender, from_client) = mpsc::unbounded_channel();
			let peer = MemoryPeer {
				url,
				to_client,
				from_client,
			};
			self.accepted_tx
				.send(peer)
				.map_err(|_| Error::ConnectionFailed("memory connector closed".to_string()))?;

			Ok(TransportParts { sender, receiver })
		})
	}
}
