//! Wire types for the remote terminal protocol.
//!
//! This crate contains the serde-serializable shapes exchanged with a terminal
//! server: the REST models returned by the control API and the typed frames
//! carried over the terminal's duplex channel.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **1:1 with the wire**: A [`Message`] serializes to exactly the array the server sends
//! - **Stable**: Changes only when the wire protocol changes
//!
//! Session lifecycle and reconnection live in `rterm`.

pub mod message;
pub mod types;

pub use message::*;
pub use types::*;
