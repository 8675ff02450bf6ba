//! Connection state and the reconnect guard.
//!
//! Both are plain values so the transitions can be exercised without a
//! transport.

use std::time::Duration;

use rterm_protocol::MessageType;

use crate::settings::ReconnectPolicy;

/// Lifecycle of a session's channel.
///
/// ```text
/// Connecting ──► Open ──► Reconnecting ──► Open
///                  │            │
///                  └──► Closed ◄┘
/// any ──► Disposed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	/// First channel is being opened.
	Connecting,
	/// A channel is open and frames flow.
	Open,
	/// The channel was lost; a retry is scheduled or in flight.
	Reconnecting,
	/// Retries are exhausted. Only an explicit reconnect leaves this state.
	Closed,
	/// Terminal state.
	Disposed,
}

impl ConnectionState {
	pub fn is_open(self) -> bool {
		self == ConnectionState::Open
	}
}

/// What to do with one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
	/// Hand the frame to listeners.
	Deliver,
	/// Drop it: the channel was re-established and the server has not yet
	/// completed its setup handshake.
	Suppress,
	/// The setup handshake arrived. The frame itself is consumed and later
	/// frames are delivered again.
	Resume,
}

/// Tracks automatic reconnect attempts and filters frames while one is pending.
#[derive(Debug, Default, Clone)]
pub struct ReconnectGuard {
	attempt: u32,
}

impl ReconnectGuard {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn attempt(&self) -> u32 {
		self.attempt
	}

	pub fn reset(&mut self) {
		self.attempt = 0;
	}

	pub fn admit(&mut self, kind: &MessageType) -> Admission {
		if self.attempt == 0 {
			return Admission::Deliver;
		}
		if *kind == MessageType::Setup {
			self.attempt = 0;
			Admission::Resume
		} else {
			Admission::Suppress
		}
	}

	/// Records a lost channel and returns the delay before the next attempt,
	/// or `None` once `policy` is exhausted.
	pub fn on_channel_lost(&mut self, policy: &ReconnectPolicy) -> Option<Duration> {
		if self.attempt >= policy.max_attempts {
			return None;
		}
		let delay = policy.delay(self.attempt);
		self.attempt += 1;
		Some(delay)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_idle_guard_delivers_everything() {
		let mut guard = ReconnectGuard::new();
		assert_eq!(guard.admit(&MessageType::Stdout), Admission::Deliver);
		assert_eq!(guard.admit(&MessageType::Setup), Admission::Deliver);
		assert_eq!(guard.attempt(), 0);
	}

	#[test]
	fn test_suppresses_until_setup() {
		let policy = ReconnectPolicy::default();
		let mut guard = ReconnectGuard::new();
		assert_eq!(guard.on_channel_lost(&policy), Some(Duration::from_secs(1)));
		assert_eq!(guard.attempt(), 1);

		assert_eq!(guard.admit(&MessageType::Stdout), Admission::Suppress);
		assert_eq!(guard.admit(&MessageType::Disconnect), Admission::Suppress);
		assert_eq!(guard.admit(&MessageType::Unknown("x".into())), Admission::Suppress);
		assert_eq!(guard.admit(&MessageType::Setup), Admission::Resume);

		assert_eq!(guard.attempt(), 0);
		assert_eq!(guard.admit(&MessageType::Stdout), Admission::Deliver);
	}

	#[test]
	fn test_backoff_until_exhausted() {
		let policy = ReconnectPolicy {
			max_attempts: 3,
			base_delay: Duration::from_millis(10),
		};
		let mut guard = ReconnectGuard::new();
		assert_eq!(guard.on_channel_lost(&policy), Some(Duration::from_millis(10)));
		assert_eq!(guard.on_channel_lost(&policy), Some(Duration::from_millis(20)));
		assert_eq!(guard.on_channel_lost(&policy), Some(Duration::from_millis(40)));
		assert_eq!(guard.on_channel_lost(&policy), None);
		assert_eq!(guard.attempt(), 3);

		guard.reset();
		assert_eq!(guard.admit(&MessageType::Stdout), Admission::Deliver);
	}

	#[test]
	fn test_disabled_policy_never_retries() {
		let mut guard = ReconnectGuard::new();
		assert_eq!(guard.on_channel_lost(&ReconnectPolicy::disabled()), None);
		assert_eq!(guard.attempt(), 0);
	}
}
