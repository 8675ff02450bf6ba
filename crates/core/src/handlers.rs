//! Observer infrastructure for session signals.
//!
//! A [`Signal<E>`] keeps its listeners in an [`IndexMap`] for O(1) removal and
//! stable insertion order. Registering returns a [`Subscription`] that removes
//! the listener when dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Unique identifier for event handlers.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new globally-unique handler ID.
pub fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Handler function invoked with a borrowed event.
pub type HandlerFn<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handler storage shared between a [`Signal`] and its subscriptions.
pub type HandlerMap<E> = Arc<Mutex<IndexMap<HandlerId, HandlerFn<E>>>>;

/// Listener list for one kind of event.
pub struct Signal<E> {
	handlers: HandlerMap<E>,
}

impl<E> Default for Signal<E> {
	fn default() -> Self {
		Self {
			handlers: Arc::new(Mutex::new(IndexMap::new())),
		}
	}
}

impl<E: Send + Sync + 'static> Signal<E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler`; it stays registered while the returned
	/// [`Subscription`] is alive (or forever after [`Subscription::detach`]).
	pub fn connect<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&E) + Send + Sync + 'static,
	{
		let id = next_handler_id();
		self.handlers.lock().insert(id, Arc::new(handler));
		Subscription::from_handler_map(id, &self.handlers)
	}

	/// Calls every listener in registration order.
	///
	/// The listener list is snapshotted first, so handlers may subscribe,
	/// unsubscribe or clear the signal while it is being emitted.
	pub fn emit(&self, event: &E) {
		let handlers: Vec<_> = self.handlers.lock().values().cloned().collect();
		for handler in handlers {
			handler(event);
		}
	}

	/// Drops every listener.
	pub fn clear(&self) {
		self.handlers.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.handlers.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// RAII handle that unregisters an event handler on drop.
///
/// Holds a weak reference to the handler map, so dropping after the owning
/// session is gone is safe (becomes a no-op).
pub struct Subscription {
	id: HandlerId,
	dropper: Option<Arc<dyn Fn(HandlerId) + Send + Sync>>,
}

impl Subscription {
	/// Creates a subscription with a custom dropper function.
	pub fn new(id: HandlerId, dropper: Arc<dyn Fn(HandlerId) + Send + Sync>) -> Self {
		Self {
			id,
			dropper: Some(dropper),
		}
	}

	/// Creates a subscription from a handler map using a weak reference.
	pub fn from_handler_map<E>(id: HandlerId, handlers: &HandlerMap<E>) -> Self
	where
		E: Send + Sync + 'static,
	{
		let weak: Weak<Mutex<IndexMap<HandlerId, HandlerFn<E>>>> = Arc::downgrade(handlers);
		let dropper = Arc::new(move |id: HandlerId| {
			if let Some(map) = weak.upgrade() {
				map.lock().shift_remove(&id);
			}
		});
		Self::new(id, dropper)
	}

	/// Returns this subscription's handler ID.
	pub fn id(&self) -> HandlerId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}

	/// Keeps the handler registered for as long as its signal lives.
	pub fn detach(mut self) {
		self.dropper = None;
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.dropper.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, AtomicUsize};

	use super::*;

	#[test]
	fn test_handler_id_increments() {
		let id1 = next_handler_id();
		let id2 = next_handler_id();
		assert!(id2 > id1);
	}

	#[test]
	fn test_emit_in_registration_order() {
		let signal: Signal<u32> = Signal::new();
		let seen = Arc::new(Mutex::new(Vec::new()));

		let a = Arc::clone(&seen);
		let _first = signal.connect(move |v| a.lock().push(("first", *v)));
		let b = Arc::clone(&seen);
		let _second = signal.connect(move |v| b.lock().push(("second", *v)));

		signal.emit(&7);
		assert_eq!(*seen.lock(), vec![("first", 7), ("second", 7)]);
	}

	#[test]
	fn test_subscription_drop_unregisters() {
		let signal: Signal<()> = Signal::new();
		let count = Arc::new(AtomicUsize::new(0));

		{
			let c = Arc::clone(&count);
			let _sub = signal.connect(move |_| {
				c.fetch_add(1, Ordering::SeqCst);
			});
			signal.emit(&());
		}
		signal.emit(&());

		assert_eq!(count.load(Ordering::SeqCst), 1);
		assert!(signal.is_empty());
	}

	#[test]
	fn test_detach_keeps_handler() {
		let signal: Signal<()> = Signal::new();
		let called = Arc::new(AtomicBool::new(false));

		let c = Arc::clone(&called);
		signal.connect(move |_| c.store(true, Ordering::SeqCst)).detach();
		signal.emit(&());

		assert!(called.load(Ordering::SeqCst));
		assert_eq!(signal.len(), 1);
	}

	#[test]
	fn test_clear_during_emit() {
		let signal: Arc<Signal<()>> = Arc::new(Signal::new());
		let count = Arc::new(AtomicUsize::new(0));

		let s = Arc::clone(&signal);
		signal.connect(move |_| s.clear()).detach();
		let c = Arc::clone(&count);
		signal
			.connect(move |_| {
				c.fetch_add(1, Ordering::SeqCst);
			})
			.detach();

		// Snapshot semantics: the second handler still runs this time.
		signal.emit(&());
		signal.emit(&());
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_subscription_outlives_signal() {
		let signal: Signal<()> = Signal::new();
		let sub = signal.connect(|_| {});
		drop(signal);
		sub.unsubscribe();
	}
}
