//! Terminal runtime - control API client and channel transports
//!
//! This crate provides the request/response and duplex plumbing a terminal
//! client is built on:
//!
//! - **Control API**: create/list/delete requests against the server's REST surface
//! - **Transport**: persistent bidirectional text channels (WebSocket or in-memory)
//! - **Endpoints**: URL joining shared by both
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │    rterm    │  Sessions, registry, directory
//! └──────┬──────┘
//!        │ uses ControlApi + Connector
//! ┌──────▼──────┐
//! │rterm-runtime│  This crate
//! │  ┌────────┐ │
//! │  │Control │ │  HTTP request/response
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Trans  │ │  WebSocket/memory channels
//! │  └────────┘ │
//! └─────────────┘
//! ```
//!
//! # Decoupling via capability traits
//!
//! Sessions only see [`ControlApi`] and [`Connector`], so tests and embedders
//! can swap in scripted or in-process implementations without a server.

pub mod control;
pub mod endpoint;
pub mod error;
pub mod transport;

use std::future::Future;
use std::pin::Pin;

// Re-export key types at crate root
pub use control::{ApiRequest, ApiResponse, ControlApi, HttpControlApi, HttpMethod};
pub use endpoint::{join_segments, to_ws_base, with_token};
pub use error::{Error, Result};
pub use transport::{Connector, MemoryConnector, MemoryPeer, TransportParts, WebSocketConnector};
pub use url::Url;

/// Boxed future returned by the capability traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
