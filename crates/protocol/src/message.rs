//! Typed terminal frames.
//!
//! On the wire a frame is a JSON array whose first element is a string type
//! tag and whose remaining elements are the payload:
//!
//! ```text
//! ["stdin", "ls -la\r"]
//! ["set_size", 24, 80]
//! ["setup"]
//! ```
//!
//! The payload is spliced into the array rather than nested, so
//! [`Message`] implements `Serialize`/`Deserialize` by hand.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a terminal frame, taken from the first array element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
	/// Keystrokes sent to the terminal.
	Stdin,
	/// Output produced by the terminal.
	Stdout,
	/// The server closed the terminal process.
	Disconnect,
	/// Resize request: `[rows, cols]`.
	SetSize,
	/// Handshake marker sent by the server once a channel is usable.
	Setup,
	/// Any tag this crate does not know about (forward-compatible catch-all).
	Unknown(String),
}

impl MessageType {
	pub fn as_str(&self) -> &str {
		match self {
			MessageType::Stdin => "stdin",
			MessageType::Stdout => "stdout",
			MessageType::Disconnect => "disconnect",
			MessageType::SetSize => "set_size",
			MessageType::Setup => "setup",
			MessageType::Unknown(tag) => tag,
		}
	}
}

impl From<&str> for MessageType {
	fn from(tag: &str) -> Self {
		match tag {
			"stdin" => MessageType::Stdin,
			"stdout" => MessageType::Stdout,
			"disconnect" => MessageType::Disconnect,
			"set_size" => MessageType::SetSize,
			"setup" => MessageType::Setup,
			other => MessageType::Unknown(other.to_string()),
		}
	}
}

impl From<String> for MessageType {
	fn from(tag: String) -> Self {
		match MessageType::from(tag.as_str()) {
			MessageType::Unknown(_) => MessageType::Unknown(tag),
			known => known,
		}
	}
}

impl fmt::Display for MessageType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One frame exchanged over a terminal channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
	pub kind: MessageType,
	pub content: Vec<Value>,
}

impl Message {
	pub fn new(kind: MessageType, content: Vec<Value>) -> Self {
		Self { kind, content }
	}

	/// Keystrokes for the remote shell.
	pub fn stdin(data: impl Into<String>) -> Self {
		Self::new(MessageType::Stdin, vec![Value::String(data.into())])
	}

	/// Resize request for the remote pty.
	pub fn set_size(rows: u16, cols: u16) -> Self {
		Self::new(MessageType::SetSize, vec![Value::from(rows), Value::from(cols)])
	}

	/// Returns true when the frame carries no payload.
	pub fn is_empty(&self) -> bool {
		self.content.is_empty()
	}

	/// Concatenates the string elements of the payload.
	///
	/// Convenient for `stdout` frames, whose payload is a single string.
	pub fn text(&self) -> String {
		self.content.iter().filter_map(Value::as_str).collect()
	}
}

impl Serialize for Message {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut seq = serializer.serialize_seq(Some(self.content.len() + 1))?;
		seq.serialize_element(self.kind.as_str())?;
		for value in &self.content {
			seq.serialize_element(value)?;
		}
		seq.end()
	}
}

impl<'de> Deserialize<'de> for Message {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let frame = Vec::<Value>::deserialize(deserializer)?;
		let mut values = frame.into_iter();
		let kind = match values.next() {
			Some(Value::String(tag)) => MessageType::from(tag),
			Some(_) => return Err(de::Error::custom("frame type tag must be a string")),
			None => {
				return Err(de::Error::invalid_length(0, &"a type tag followed by content"));
			}
		};
		Ok(Message {
			kind,
			content: values.collect(),
		})
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_content_is_spliced_after_tag() {
		let encoded = serde_json::to_value(Message::set_size(24, 80)).unwrap();
		assert_eq!(encoded, json!(["set_size", 24, 80]));
	}

	#[test]
	fn test_decode_stdout_frame() {
		let message: Message = serde_json::from_str(r#"["stdout", "hello", " world"]"#).unwrap();
		assert_eq!(message.kind, MessageType::Stdout);
		assert_eq!(message.content.len(), 2);
		assert_eq!(message.text(), "hello world");
	}

	#[test]
	fn test_decode_tag_only_frame() {
		let message: Message = serde_json::from_str(r#"["setup"]"#).unwrap();
		assert_eq!(message.kind, MessageType::Setup);
		assert!(message.is_empty());
	}

	#[test]
	fn test_unknown_tag_is_preserved() {
		let message: Message = serde_json::from_str(r#"["flow_control", 1]"#).unwrap();
		assert_eq!(message.kind, MessageType::Unknown("flow_control".to_string()));
		assert_eq!(serde_json::to_value(&message).unwrap(), json!(["flow_control", 1]));
	}

	#[test]
	fn test_rejects_malformed_frames() {
		assert!(serde_json::from_str::<Message>("[]").is_err());
		assert!(serde_json::from_str::<Message>("[1, 2]").is_err());
		assert!(serde_json::from_str::<Message>(r#"{"type": "stdin"}"#).is_err());
	}

	#[test]
	fn test_known_tags_parse_from_owned_strings() {
		assert_eq!(MessageType::from("disconnect".to_string()), MessageType::Disconnect);
		assert_eq!(MessageType::SetSize.to_string(), "set_size");
	}
}
