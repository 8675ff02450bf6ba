//! Duplex channel transports.
//!
//! A transport is split into [`TransportParts`] the moment it opens: an
//! outbound sender and an inbound receiver, both carrying whole text frames.
//!
//! - Inbound frames are delivered in the order the peer sent them.
//! - The receiver ends when the channel closes, for whatever reason.
//! - Dropping the sender closes the channel from this side.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, warn};
use url::Url;

use crate::BoxFuture;
use crate::error::{Error, Result};

mod memory;

pub use memory::{MemoryConnector, MemoryPeer};

/// Halves of an open channel.
pub struct TransportParts {
	/// Outbound text frames.
	pub sender: mpsc::UnboundedSender<String>,
	/// Inbound text frames; yields `None` once the channel is closed.
	pub receiver: mpsc::UnboundedReceiver<String>,
}

/// Capability to open duplex channels.
pub trait Connector: Send + Sync {
	/// Opens a channel to `url`, resolving once the channel is usable.
	fn connect(&self, url: Url) -> BoxFuture<'_, Result<TransportParts>>;
}

/// [`Connector`] that speaks WebSocket text frames via tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
	pub fn new() -> Self {
		Self
	}
}

impl Connector for WebSocketConnector {
	fn connect(&self, url: Url) -> BoxFuture<'_, Result<TransportParts>> {
		Box::pin(async move {
			let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
				.await
				.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;

			debug!(url = %url, "websocket open");

			let (mut sink, mut source) = stream.split();
			let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
			let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

			tokio::spawn(async move {
				while let Some(text) = outbound_rx.recv().await {
					if let Err(e) = sink.send(WsMessage::Text(text)).await {
						error!("Transport write error: {}", e);
						break;
					}
				}
				let _ = sink.close().await;
			});

			tokio::spawn(async move {
				while let Some(frame) = source.next().await {
					let text = match frame {
						Ok(WsMessage::Text(text)) => text,
						Ok(WsMessage::Binary(data)) => match String::from_utf8(data) {
							Ok(text) => text,
							Err(e) => {
								warn!("Dropping non UTF-8 binary frame: {}", e);
								continue;
							}
						},
						Ok(WsMessage::Close(frame)) => {
							debug!(?frame, "websocket closed by peer");
							break;
						}
						Ok(_) => continue,
						Err(e) => {
							error!("Transport read error: {}", e);
							break;
						}
					};
					if inbound_tx.send(text).is_err() {
						break;
					}
				}
			});

			Ok(TransportParts {
				sender: outbound_tx,
				receiver: inbound_rx,
			})
		})
	}
}
