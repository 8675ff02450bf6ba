//! Error types for the terminal runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by terminal control and channel operations.
#[derive(Debug, Error)]
pub enum Error {
	/// The deployment has the terminal service switched off.
	#[error("Terminals are unavailable")]
	ServiceUnavailable,

	/// The control API answered with an unexpected status.
	#[error("Unexpected response {status} from {url}{}", body_suffix(.body))]
	Response {
		/// HTTP status code.
		status: u16,
		/// Request URL.
		url: String,
		/// Raw response body, kept for inspection.
		body: String,
	},

	/// The requested terminal is not among the server's running terminals.
	#[error("{0}")]
	NotFound(String),

	/// The server sent something that does not match the protocol.
	#[error("Protocol violation: {0}")]
	ProtocolViolation(String),

	/// Opening a terminal channel failed.
	#[error("Failed to connect to terminal: {0}")]
	ConnectionFailed(String),

	/// Transport-level failure on an open channel.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Operation on a session that has already been disposed.
	#[error("Terminal session is disposed: {0}")]
	Disposed(String),

	/// Timeout waiting for an operation.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// A base URL or a joined endpoint failed to parse.
	#[error("Invalid URL: {0}")]
	InvalidUrl(#[from] url::ParseError),

	/// HTTP client failure (DNS, TLS, connection refused, ...).
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

fn body_suffix(body: &str) -> String {
	if body.is_empty() {
		String::new()
	} else {
		format!(": {body}")
	}
}

impl Error {
	/// Returns the HTTP status if this is a response error.
	pub fn status(&self) -> Option<u16> {
		match self {
			Error::Response { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Returns true if the terminal is unknown to the server.
	pub fn is_not_found(&self) -> bool {
		match self {
			Error::NotFound(_) => true,
			Error::Response { status, .. } => *status == 404,
			_ => false,
		}
	}

	/// Returns true if the terminal service is switched off.
	pub fn is_service_unavailable(&self) -> bool {
		matches!(self, Error::ServiceUnavailable)
	}
}
