//! REST models exchanged with the terminal control API.

use serde::{Deserialize, Serialize};

/// Server-visible representation of a running terminal.
///
/// The name is assigned by the server when the terminal is created and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalModel {
	/// Unique name of the terminal on its server.
	pub name: String,
}

impl TerminalModel {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}
}

/// Body of a create request.
///
/// Both fields are optional; servers that do not understand them ignore them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOptions {
	/// Requested terminal name. The server may pick its own.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Working directory for the terminal's shell.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cwd: Option<String>,
}

impl StartOptions {
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
		self.cwd = Some(cwd.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_model_deserializes_extra_fields() {
		let model: TerminalModel =
			serde_json::from_str(r#"{"name": "1", "last_activity": "2024-01-01T00:00:00Z"}"#).unwrap();
		assert_eq!(model, TerminalModel::new("1"));
	}

	#[test]
	fn test_start_options_skip_empty_fields() {
		let json = serde_json::to_value(StartOptions::default()).unwrap();
		assert_eq!(json, serde_json::json!({}));

		let json = serde_json::to_value(StartOptions::default().with_cwd("/tmp")).unwrap();
		assert_eq!(json, serde_json::json!({"cwd": "/tmp"}));
	}
}
