//! Single-slot blocking channel.
//!
//! A [`SingleEntrySyncChannel`] holds at most one item. A writer blocks
//! while the slot is full; a reader blocks while it is empty. No item is
//! ever overwritten.
//!
//! The type does not enforce a single producer or a single consumer; the
//! caller is expected to impose that discipline. Every wait still re-checks
//! its predicate in a loop, so spurious wakeups and a third party slipping
//! in between signal and wake are harmless.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use selenese_bridge::SingleEntrySyncChannel;
//!
//! let channel = Arc::new(SingleEntrySyncChannel::new());
//! let reader = {
//!     let channel = Arc::clone(&channel);
//!     thread::spawn(move || channel.get())
//! };
//!
//! channel.put("hello").unwrap();
//! assert_eq!(reader.join().unwrap().unwrap(), "hello");
//! assert!(channel.is_empty());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::trace;

use crate::error::{Error, Result};

use super::Deadline;

// ============================================================================
// Types
// ============================================================================

/// State guarded by the channel mutex.
struct Slot<T> {
    item: Option<T>,
    closed: bool,
}

// ============================================================================
// SingleEntrySyncChannel
// ============================================================================

/// Blocking depth-1 handoff cell.
///
/// # Closing
///
/// [`close`](Self::close) wakes every waiter. Afterwards `put` fails with
/// [`Error::ChannelClosed`]; `get` still drains an item that was put before
/// the close, then fails the same way.
pub struct SingleEntrySyncChannel<T> {
    /// Name used in logs and timeout errors.
    name: &'static str,
    /// Slot and closed flag.
    state: Mutex<Slot<T>>,
    /// Signalled when the slot empties (or on close).
    not_full: Condvar,
    /// Signalled when the slot fills (or on close).
    not_empty: Condvar,
}

// ============================================================================
// SingleEntrySyncChannel - Constructors
// ============================================================================

impl<T> SingleEntrySyncChannel<T> {
    /// Creates an empty, open channel.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::named("channel")
    }

    /// Creates an empty channel with a name used in logs and errors.
    #[inline]
    #[must_use]
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(Slot {
                item: None,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }
}

impl<T> Default for SingleEntrySyncChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SingleEntrySyncChannel - Public API
// ============================================================================

impl<T> SingleEntrySyncChannel<T> {
    /// Stores `item`, blocking while the slot is occupied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the channel is or becomes closed.
    #[inline]
    pub fn put(&self, item: T) -> Result<()> {
        self.put_until(item, Deadline::never())
    }

    /// Stores `item`, waiting at most `timeout` for the slot to empty.
    ///
    /// On timeout the item is dropped and the slot is left as it was.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the slot stayed occupied
    /// - [`Error::ChannelClosed`] if the channel is or becomes closed
    #[inline]
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<()> {
        self.put_until(item, Deadline::after(timeout))
    }

    /// Stores `item`, waiting until `deadline` for the slot to empty.
    ///
    /// # Errors
    ///
    /// Same as [`put_timeout`](Self::put_timeout), plus
    /// [`Error::Cancelled`] once the deadline's token is set.
    pub fn put_until(&self, item: T, deadline: Deadline) -> Result<()> {
        let mut state = self.state.lock();
        let mut timed_out = false;

        loop {
            if state.closed {
                return Err(Error::ChannelClosed);
            }
            if deadline.is_cancelled() {
                let vacant = state.item.is_none();
                drop(state);
                // A notify meant for a live writer may have woken us instead.
                if vacant {
                    self.not_full.notify_one();
                }
                return Err(Error::cancelled(format!("{} put", self.name)));
            }
            if state.item.is_none() {
                break;
            }
            if timed_out {
                return Err(deadline.timeout_error(format!("{} put", self.name)));
            }
            timed_out = Self::wait(&self.not_full, &mut state, &deadline);
        }

        state.item = Some(item);
        drop(state);
        self.not_empty.notify_one();

        trace!(channel = self.name, "Item stored");
        Ok(())
    }

    /// Removes and returns the item, blocking while the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the channel is closed and empty.
    #[inline]
    pub fn get(&self) -> Result<T> {
        self.get_until(Deadline::never())
    }

    /// Removes and returns the item, waiting at most `timeout` for one.
    ///
    /// A timed-out call consumes nothing; an item put afterwards stays in
    /// the slot for the next reader.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no item arrived in time
    /// - [`Error::ChannelClosed`] if the channel is closed and empty
    #[inline]
    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        self.get_until(Deadline::after(timeout))
    }

    /// Removes and returns the item, waiting until `deadline` for one.
    ///
    /// A cancelled call takes nothing, even if an item is present.
    ///
    /// # Errors
    ///
    /// Same as [`get_timeout`](Self::get_timeout), plus
    /// [`Error::Cancelled`] once the deadline's token is set.
    pub fn get_until(&self, deadline: Deadline) -> Result<T> {
        let mut state = self.state.lock();
        let mut timed_out = false;

        let item = loop {
            if deadline.is_cancelled() {
                let occupied = state.item.is_some();
                drop(state);
                // A notify meant for a live reader may have woken us instead.
                if occupied {
                    self.not_empty.notify_one();
                }
                return Err(Error::cancelled(format!("{} get", self.name)));
            }
            if let Some(item) = state.item.take() {
                break item;
            }
            if state.closed {
                return Err(Error::ChannelClosed);
            }
            if timed_out {
                return Err(deadline.timeout_error(format!("{} get", self.name)));
            }
            timed_out = Self::wait(&self.not_empty, &mut state, &deadline);
        };

        drop(state);
        self.not_full.notify_one();

        trace!(channel = self.name, "Item taken");
        Ok(item)
    }

    /// Removes the item if one is present, without blocking.
    pub fn try_get(&self) -> Option<T> {
        self.take_if(|_| true)
    }

    /// Removes the item if one is present and `predicate` accepts it.
    pub fn take_if(&self, predicate: impl FnOnce(&T) -> bool) -> Option<T> {
        let item = {
            let mut state = self.state.lock();
            if state.item.as_ref().is_some_and(predicate) {
                state.item.take()
            } else {
                None
            }
        };

        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Returns `true` if the slot is currently empty.
    ///
    /// Advisory only: the answer may be stale by the time it is read.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().item.is_none()
    }

    /// Closes the channel and wakes every waiter.
    ///
    /// Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }

        self.not_full.notify_all();
        self.not_empty.notify_all();

        trace!(channel = self.name, "Channel closed");
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Wakes every waiter so it re-checks its [`CancelToken`](super::CancelToken).
    ///
    /// Waiters whose token is unset go back to sleep.
    pub fn interrupt(&self) {
        // Taking the lock orders this wakeup after any in-flight check.
        drop(self.state.lock());
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Returns the channel name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// ============================================================================
// SingleEntrySyncChannel - Internal
// ============================================================================

impl<T> SingleEntrySyncChannel<T> {
    /// Waits once on `condvar`. Returns `true` if the deadline passed.
    fn wait(condvar: &Condvar, state: &mut MutexGuard<'_, Slot<T>>, deadline: &Deadline) -> bool {
        match deadline.at() {
            None => {
                condvar.wait(state);
                false
            }
            Some(at) => condvar.wait_until(state, at).timed_out(),
        }
    }
}

impl<T> fmt::Debug for SingleEntrySyncChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SingleEntrySyncChannel")
            .field("name", &self.name)
            .field("empty", &state.item.is_none())
            .field("closed", &state.closed)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use crate::sync::CancelToken;

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn test_new_is_empty() {
        let channel: SingleEntrySyncChannel<u32> = SingleEntrySyncChannel::new();
        assert!(channel.is_empty());
        assert!(!channel.is_closed());
    }

    #[test]
    fn test_put_then_get() {
        let channel = SingleEntrySyncChannel::new();
        channel.put(7).expect("put");
        assert!(!channel.is_empty());

        assert_eq!(channel.get().expect("get"), 7);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_blocked_get_receives_put() {
        let channel = Arc::new(SingleEntrySyncChannel::new());

        let reader = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.get())
        };

        thread::sleep(SHORT);
        assert!(!reader.is_finished());

        channel.put("value".to_string()).expect("put");
        let value = reader.join().expect("join").expect("get");

        assert_eq!(value, "value");
        assert!(channel.is_empty());
    }

    #[test]
    fn test_put_blocks_while_full() {
        let channel = Arc::new(SingleEntrySyncChannel::new());
        channel.put(1).expect("first put");

        let writer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.put(2))
        };

        thread::sleep(SHORT);
        assert!(!writer.is_finished());

        assert_eq!(channel.get().expect("get"), 1);
        writer.join().expect("join").expect("second put");
        assert_eq!(channel.get().expect("get"), 2);
    }

    #[test]
    fn test_get_timeout_on_empty() {
        let channel: SingleEntrySyncChannel<u32> = SingleEntrySyncChannel::named("request");
        let started = Instant::now();

        let err = channel.get_timeout(SHORT).expect_err("should time out");

        assert!(err.is_timeout());
        assert!(started.elapsed() >= SHORT);
        assert!(err.to_string().contains("request get"));
    }

    #[test]
    fn test_put_timeout_leaves_slot_untouched() {
        let channel = SingleEntrySyncChannel::new();
        channel.put(1).expect("put");

        let err = channel.put_timeout(2, SHORT).expect_err("should time out");
        assert!(err.is_timeout());

        assert_eq!(channel.get().expect("get"), 1);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_timed_out_get_does_not_steal_later_value() {
        let channel = Arc::new(SingleEntrySyncChannel::new());

        let early = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.get_timeout(SHORT))
        };
        assert!(early.join().expect("join").is_err());

        channel.put(42).expect("put");
        assert_eq!(channel.try_get(), Some(42));
    }

    #[test]
    fn test_close_wakes_blocked_get() {
        let channel: Arc<SingleEntrySyncChannel<u32>> = Arc::new(SingleEntrySyncChannel::new());

        let reader = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.get())
        };

        thread::sleep(SHORT);
        channel.close();

        let err = reader.join().expect("join").expect_err("closed");
        assert!(err.is_closed());
    }

    #[test]
    fn test_close_wakes_blocked_put() {
        let channel = Arc::new(SingleEntrySyncChannel::new());
        channel.put(1).expect("put");

        let writer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.put(2))
        };

        thread::sleep(SHORT);
        channel.close();

        let err = writer.join().expect("join").expect_err("closed");
        assert!(err.is_closed());
    }

    #[test]
    fn test_closed_channel_drains_pending_item() {
        let channel = SingleEntrySyncChannel::new();
        channel.put("last").expect("put");
        channel.close();

        assert!(channel.put("more").expect_err("closed").is_closed());
        assert_eq!(channel.get().expect("drain"), "last");
        assert!(channel.get().expect_err("empty and closed").is_closed());
    }

    #[test]
    fn test_many_handoffs_preserve_order() {
        let channel = Arc::new(SingleEntrySyncChannel::new());
        let count = 1_000u32;

        let reader = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                (0..count)
                    .map(|_| channel.get().expect("get"))
                    .collect::<Vec<_>>()
            })
        };

        for i in 0..count {
            channel.put(i).expect("put");
        }

        let received = reader.join().expect("join");
        assert_eq!(received, (0..count).collect::<Vec<_>>());
    }

    #[test]
    fn test_interrupt_ends_cancelled_get() {
        let channel: Arc<SingleEntrySyncChannel<u32>> = Arc::new(SingleEntrySyncChannel::new());
        let token = CancelToken::new();

        let reader = {
            let channel = Arc::clone(&channel);
            let deadline = Deadline::never().with_cancel(token.clone());
            thread::spawn(move || channel.get_until(deadline))
        };

        thread::sleep(SHORT);
        assert!(!reader.is_finished());

        token.cancel();
        channel.interrupt();

        let err = reader.join().expect("join").expect_err("cancelled");
        assert!(err.is_cancelled());

        channel.put(9).expect("put");
        assert_eq!(channel.try_get(), Some(9));
    }

    #[test]
    fn test_interrupt_leaves_live_waiters_waiting() {
        let channel = Arc::new(SingleEntrySyncChannel::new());

        let reader = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.get_timeout(Duration::from_secs(5)))
        };

        thread::sleep(SHORT);
        channel.interrupt();
        thread::sleep(SHORT);
        assert!(!reader.is_finished());

        channel.put(3).expect("put");
        assert_eq!(reader.join().expect("join").expect("get"), 3);
    }

    #[test]
    fn test_cancelled_reader_hands_item_to_live_reader() {
        let channel = Arc::new(SingleEntrySyncChannel::new());
        let token = CancelToken::new();

        let abandoned = {
            let channel = Arc::clone(&channel);
            let deadline = Deadline::never().with_cancel(token.clone());
            thread::spawn(move || channel.get_until(deadline))
        };
        let live = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.get_timeout(Duration::from_secs(5)))
        };

        thread::sleep(SHORT);

        // No interrupt: the single notify from `put` may reach either reader.
        token.cancel();
        channel.put("cmd").expect("put");

        assert_eq!(live.join().expect("join").expect("get"), "cmd");

        channel.interrupt();
        assert!(abandoned.join().expect("join").expect_err("cancelled").is_cancelled());
    }

    #[test]
    fn test_cancelled_put_stores_nothing() {
        let channel = SingleEntrySyncChannel::new();
        let token = CancelToken::new();
        token.cancel();

        let err = channel
            .put_until(1, Deadline::never().with_cancel(token))
            .expect_err("cancelled");
        assert!(err.is_cancelled());
        assert!(channel.is_empty());
    }

    #[test]
    fn test_take_if() {
        let channel = SingleEntrySyncChannel::new();
        channel.put(5).expect("put");

        assert_eq!(channel.take_if(|v| *v == 4), None);
        assert!(!channel.is_empty());
        assert_eq!(channel.take_if(|v| *v == 5), Some(5));
        assert!(channel.is_empty());
    }

    #[test]
    fn test_debug_output() {
        let channel: SingleEntrySyncChannel<u8> = SingleEntrySyncChannel::named("response");
        let debug = format!("{channel:?}");
        assert!(debug.contains("response"));
        assert!(debug.contains("empty: true"));
    }
}
