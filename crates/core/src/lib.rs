//! rterm: client sessions for server-hosted interactive terminals
//!
//! A server runs shells; this crate gives each one a local
//! [`TerminalSession`] that talks to it over a persistent duplex channel,
//! and offers the server-wide operations (start, connect, list, shut down)
//! as [`directory`] functions.
//!
//! # Example
//!
//! ```ignore
//! use rterm::{Message, ServerSettings, StartOptions, directory};
//!
//! #[tokio::main]
//! async fn main() -> rterm::Result<()> {
//!     let settings = ServerSettings::new("http://localhost:8888/api/")?.with_token("abc");
//!     let session = directory::start_new(&settings, &StartOptions::default()).await?;
//!     session.ready().await?;
//!
//!     let _sub = session.on_message(|message| print!("{}", message.text()));
//!     session.send(&Message::stdin("ls\r"));
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! - [`Registry`]: endpoint → live session, one slot per endpoint
//! - [`TerminalSession`]: channel lifecycle, reconnect guard, disposal
//! - [`directory`]: control API calls plus registry reconciliation
//! - [`TerminalManager`]: cached running list and background polling

pub mod directory;
pub mod handlers;
pub mod manager;
pub mod registry;
pub mod session;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use handlers::{HandlerId, Signal, Subscription};
pub use manager::{PollHandle, TerminalManager};
pub use registry::Registry;
pub use rterm_protocol::{Message, MessageType, StartOptions, TerminalModel};
pub use rterm_runtime::{
	ApiRequest, ApiResponse, Connector, ControlApi, Error, HttpControlApi, HttpMethod, MemoryConnector,
	MemoryPeer, Result, TransportParts, Url, WebSocketConnector,
};
pub use session::{ConnectionState, InstanceId, TerminalSession};
pub use settings::{ReconnectPolicy, ServerSettings};
