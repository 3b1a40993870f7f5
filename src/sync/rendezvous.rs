//! Driver/runner command rendezvous.
//!
//! Two single-slot channels keep an out-of-process driver and an in-page
//! runner in lock-step even though each side talks through its own,
//! independent HTTP request/response cycle:
//!
//! - **Driver** ([`CommandRendezvous::submit`]): put the command, then wait
//!   for its result (skipped for `testComplete`).
//! - **Runner** ([`CommandRendezvous::poll`]): publish the previous result
//!   (if any), then wait for the next command.
//!
//! Because each slot holds at most one item and the runner only fetches
//! after publishing, neither side can run more than one step ahead.
//!
//! Results travel tagged with the sequence number of the command they
//! answer. A driver that gave up waiting withdraws its command if the runner
//! never fetched it; if the runner did, the late result is discarded by the
//! next driver instead of being returned as its own.
//!
//! A runner that restarts while it owes a result answers the stranded
//! driver with [`Error::Protocol`] rather than leaving it blocked.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{Command, RunnerPoll};

use super::{Deadline, SingleEntrySyncChannel};

// ============================================================================
// Constants
// ============================================================================

/// How often a driver queued behind another re-checks its cancel token.
const DRIVER_LOCK_SLICE: Duration = Duration::from_millis(50);

// ============================================================================
// Types
// ============================================================================

/// A value tagged with the sequence number of the command it belongs to.
#[derive(Debug)]
struct Tagged<T> {
    seq: u64,
    value: T,
}

/// What the runner sends back for a command.
#[derive(Debug)]
enum Reply {
    /// The command's result text.
    Result(String),
    /// The runner restarted before answering.
    RunnerRestarted,
}

/// Point-in-time counters for one rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendezvousStats {
    /// Commands handed to the runner so far.
    pub commands_delivered: u64,
    /// Results published by the runner so far.
    pub results_published: u64,
    /// The runner holds a command whose result has not been published.
    pub awaiting_result: bool,
    /// A command sits in the request slot.
    pub command_pending: bool,
    /// A result sits in the response slot.
    pub result_pending: bool,
    /// The rendezvous has been closed.
    pub closed: bool,
}

// ============================================================================
// CommandRendezvous
// ============================================================================

/// Strictly alternating command/result exchange for one browser session.
///
/// # Thread Safety
///
/// Designed for one driver thread and one runner thread at a time.
/// Concurrent `submit` calls are serialised internally, so several driver
/// threads cannot interleave their commands or swap results.
pub struct CommandRendezvous {
    /// Commands flowing driver → runner.
    requests: SingleEntrySyncChannel<Tagged<Command>>,
    /// Results flowing runner → driver.
    responses: SingleEntrySyncChannel<Tagged<Reply>>,
    /// Held by a driver for the whole put/get exchange.
    driver: Mutex<()>,
    /// Sequence number of the command the runner owes a result for.
    outstanding: Mutex<Option<u64>>,
    /// Next command sequence number.
    next_seq: AtomicU64,
    /// Commands handed to the runner.
    delivered: AtomicU64,
    /// Results accepted from the runner.
    published: AtomicU64,
}

// ============================================================================
// CommandRendezvous - Constructor
// ============================================================================

impl CommandRendezvous {
    /// Creates an idle rendezvous.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: SingleEntrySyncChannel::named("request"),
            responses: SingleEntrySyncChannel::named("response"),
            driver: Mutex::new(()),
            outstanding: Mutex::new(None),
            next_seq: AtomicU64::new(1),
            delivered: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }
}

impl Default for CommandRendezvous {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CommandRendezvous - Driver Role
// ============================================================================

impl CommandRendezvous {
    /// Sends `command` to the runner and waits for its result.
    ///
    /// `testComplete` returns `""` as soon as the command is queued.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the runner restarted before answering
    /// - [`Error::ChannelClosed`] if the rendezvous is closed
    #[inline]
    pub fn submit(&self, command: Command) -> Result<String> {
        self.submit_until(command, Deadline::never())
    }

    /// Like [`submit`](Self::submit), bounded by `timeout` overall.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if any step (waiting for a previous driver,
    ///   queueing, waiting for the result) runs out of time
    /// - [`Error::ChannelClosed`] if the rendezvous is closed
    #[inline]
    pub fn submit_timeout(&self, command: Command, timeout: Duration) -> Result<String> {
        self.submit_until(command, Deadline::after(timeout))
    }

    /// Like [`submit`](Self::submit), bounded by `deadline`.
    ///
    /// On timeout or cancellation the command is withdrawn if the runner
    /// has not fetched it yet.
    ///
    /// # Errors
    ///
    /// Same as [`submit_timeout`](Self::submit_timeout), plus
    /// [`Error::Cancelled`] once the deadline's token is set.
    pub fn submit_until(&self, command: Command, deadline: Deadline) -> Result<String> {
        let _driver = self.lock_driver(&deadline)?;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let terminal = command.is_test_complete();

        debug!(seq, verb = command.verb(), "Submitting command");

        self.requests.put_until(
            Tagged {
                seq,
                value: command,
            },
            deadline.clone(),
        )?;

        if terminal {
            debug!(seq, "testComplete queued, not waiting for result");
            return Ok(String::new());
        }

        match self.await_reply(seq, &deadline) {
            Err(e) if e.is_timeout() || e.is_cancelled() => {
                if self.requests.take_if(|pending| pending.seq == seq).is_some() {
                    debug!(seq, "Withdrew command the runner never fetched");
                }
                Err(e)
            }
            outcome => outcome,
        }
    }

    /// Waits for the driver lock, giving up on expiry or cancellation.
    fn lock_driver(&self, deadline: &Deadline) -> Result<MutexGuard<'_, ()>> {
        const OPERATION: &str = "submit waiting for previous command";

        loop {
            if deadline.is_cancelled() {
                return Err(Error::cancelled(OPERATION));
            }

            let slice = Instant::now() + DRIVER_LOCK_SLICE;
            let until = deadline.at().map_or(slice, |at| at.min(slice));
            if let Some(guard) = self.driver.try_lock_until(until) {
                return Ok(guard);
            }

            if deadline.is_expired() {
                return Err(deadline.timeout_error(OPERATION));
            }
        }
    }

    /// Waits for the reply to command `seq`, skipping stale replies.
    fn await_reply(&self, seq: u64, deadline: &Deadline) -> Result<String> {
        loop {
            let Tagged { seq: got, value } = self.responses.get_until(deadline.clone())?;

            match value {
                Reply::Result(result) if got == seq => {
                    trace!(seq, "Result received");
                    return Ok(result);
                }
                Reply::RunnerRestarted if got == seq => {
                    return Err(Error::protocol(format!(
                        "runner restarted before answering command {seq}"
                    )));
                }
                _ => debug!(seq, stale = got, "Discarding reply to abandoned command"),
            }
        }
    }
}

// ============================================================================
// CommandRendezvous - Runner Role
// ============================================================================

impl CommandRendezvous {
    /// Publishes `prior` (if any) and waits for the next command.
    ///
    /// `None` means the runner has nothing to publish and is starting
    /// fresh; see [`RunnerPoll::Start`].
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if `prior` answers no outstanding command
    /// - [`Error::ChannelClosed`] if the rendezvous is closed
    #[inline]
    pub fn poll(&self, prior: Option<String>) -> Result<Command> {
        self.poll_until(RunnerPoll::from(prior), Deadline::never())
    }

    /// Explicit-kind poll bounded by `timeout` overall.
    ///
    /// # Errors
    ///
    /// Same as [`poll_until`](Self::poll_until).
    #[inline]
    pub fn poll_timeout(&self, poll: RunnerPoll, timeout: Duration) -> Result<Command> {
        self.poll_until(poll, Deadline::after(timeout))
    }

    /// Explicit-kind poll bounded by `deadline`.
    ///
    /// - [`RunnerPoll::Start`] drops any outstanding command: the runner that
    ///   fetched it is gone, and its driver fails with [`Error::Protocol`].
    /// - [`RunnerPoll::Result`] requires an outstanding command.
    /// - [`RunnerPoll::Retry`] requires that no result is owed.
    ///
    /// A result that was published stays published even if fetching the
    /// next command then times out; the runner should follow up with
    /// [`RunnerPoll::Retry`].
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] on an alternation violation
    /// - [`Error::Timeout`] if no command arrived in time
    /// - [`Error::Cancelled`] once the deadline's token is set; no command
    ///   is taken
    /// - [`Error::ChannelClosed`] if the rendezvous is closed
    pub fn poll_until(&self, poll: RunnerPoll, deadline: Deadline) -> Result<Command> {
        match poll {
            RunnerPoll::Start => {
                let abandoned = self.outstanding.lock().take();
                if let Some(seq) = abandoned {
                    warn!(seq, "Runner restarted with a result still owed");
                    self.fail_abandoned(seq, &deadline)?;
                }
            }
            RunnerPoll::Result(result) => self.publish(result, &deadline)?,
            RunnerPoll::Retry => {
                if let Some(seq) = *self.outstanding.lock() {
                    return Err(Error::protocol(format!(
                        "retry poll while the result of command {seq} is still owed"
                    )));
                }
            }
        }

        let Tagged { seq, value: command } = self.requests.get_until(deadline)?;

        if !command.is_test_complete() {
            *self.outstanding.lock() = Some(seq);
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);

        debug!(seq, verb = command.verb(), "Command delivered to runner");
        Ok(command)
    }

    /// Publishes the result of the outstanding command.
    fn publish(&self, result: String, deadline: &Deadline) -> Result<()> {
        let seq = (*self.outstanding.lock())
            .ok_or_else(|| Error::protocol("result posted but no command is awaiting one"))?;

        self.responses.put_until(
            Tagged {
                seq,
                value: Reply::Result(result),
            },
            deadline.clone(),
        )?;

        *self.outstanding.lock() = None;
        self.published.fetch_add(1, Ordering::Relaxed);

        trace!(seq, "Result published");
        Ok(())
    }

    /// Tells the driver of command `seq` that no result is coming.
    fn fail_abandoned(&self, seq: u64, deadline: &Deadline) -> Result<()> {
        // While `seq` was outstanding nothing newer was delivered, so any
        // reply still in the slot is stale.
        if let Some(stale) = self.responses.try_get() {
            debug!(seq = stale.seq, "Dropping unclaimed reply");
        }

        self.responses.put_until(
            Tagged {
                seq,
                value: Reply::RunnerRestarted,
            },
            deadline.clone(),
        )
    }
}

// ============================================================================
// CommandRendezvous - Lifecycle
// ============================================================================

impl CommandRendezvous {
    /// Closes both channels, waking every blocked driver and runner.
    pub fn close(&self) {
        self.requests.close();
        self.responses.close();
        debug!("Rendezvous closed");
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    /// Wakes every blocked driver and runner so that those whose
    /// [`CancelToken`](super::CancelToken) is set return.
    pub fn interrupt(&self) {
        self.requests.interrupt();
        self.responses.interrupt();
    }

    /// Returns a snapshot of the rendezvous counters.
    ///
    /// Advisory only; values may change immediately.
    #[must_use]
    pub fn stats(&self) -> RendezvousStats {
        RendezvousStats {
            commands_delivered: self.delivered.load(Ordering::Relaxed),
            results_published: self.published.load(Ordering::Relaxed),
            awaiting_result: self.outstanding.lock().is_some(),
            command_pending: !self.requests.is_empty(),
            result_pending: !self.responses.is_empty(),
            closed: self.is_closed(),
        }
    }
}

impl fmt::Debug for CommandRendezvous {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRendezvous")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
