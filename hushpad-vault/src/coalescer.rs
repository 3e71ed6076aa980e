//! Debounced save coalescing.
//!
//! Saving re-derives a key and rewrites the whole envelope, so the vault
//! must not save on every keystroke. Edits restart a debounce timer; when
//! it fires, a save is requested. Requests arriving while a save is running
//! collapse into a single pending flag (deliberately not a queue): whatever
//! the buffer holds when the follow-up save starts is what gets persisted.
//!
//! Invariant: at most one save is in flight at any time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::VaultResult;

/// Executes one encrypt-and-persist cycle on behalf of the coalescer.
///
/// Implementations read the buffer fresh at call time and report their own
/// outcome on the status surface; the coalescer only logs failures.
#[async_trait]
pub trait SaveOp: Send + Sync {
    async fn save(&self) -> VaultResult<()>;
}

#[derive(Debug, Default)]
struct SaveFlags {
    in_flight: bool,
    pending: bool,
}

struct CoalescerInner {
    debounce: Duration,
    op: Arc<dyn SaveOp>,
    flags: Mutex<SaveFlags>,
    timer: Mutex<Option<JoinHandle<()>>>,
    idle: Notify,
}

/// Debounce timer plus the two-flag save protocol.
///
/// Cheap to clone; clones share the same timer and flags.
#[derive(Clone)]
pub struct SaveCoalescer {
    inner: Arc<CoalescerInner>,
}

impl SaveCoalescer {
    pub fn new(debounce: Duration, op: Arc<dyn SaveOp>) -> Self {
        Self {
            inner: Arc::new(CoalescerInner {
                debounce,
                op,
                flags: Mutex::new(SaveFlags::default()),
                timer: Mutex::new(None),
                idle: Notify::new(),
            }),
        }
    }

    /// Restarts the debounce timer. Call on every edit.
    ///
    /// Must run inside a Tokio runtime.
    pub fn note_edit(&self) {
        let inner = Arc::clone(&self.inner);
        let mut timer = self.inner.timer.lock().unwrap();
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            CoalescerInner::request_save(&inner);
        }));
    }

    /// Requests a save immediately, bypassing the debounce window.
    ///
    /// If a save is already running, the request collapses into the pending
    /// flag and a single follow-up save runs afterwards.
    pub fn request_save(&self) {
        CoalescerInner::request_save(&self.inner);
    }

    /// True while an encrypt-and-persist cycle is running.
    pub fn is_saving(&self) -> bool {
        self.inner.flags.lock().unwrap().in_flight
    }

    /// True if a follow-up save is queued behind the running one.
    pub fn has_pending(&self) -> bool {
        self.inner.flags.lock().unwrap().pending
    }

    /// Cancels the debounce timer and drives all outstanding work to
    /// completion. On return, no save is in flight and none is pending.
    pub async fn flush(&self) {
        let fire_now = {
            let mut timer = self.inner.timer.lock().unwrap();
            match timer.take() {
                // An armed timer means an edit is still unsaved. A timer
                // that already fired may race us here; the pending flag
                // absorbs the duplicate request.
                Some(handle) if !handle.is_finished() => {
                    handle.abort();
                    true
                }
                _ => false,
            }
        };
        if fire_now {
            CoalescerInner::request_save(&self.inner);
        }

        loop {
            let idle = self.inner.idle.notified();
            tokio::pin!(idle);
            // register as a waiter before checking; the idle signal stores
            // no permit, so an unregistered waiter could miss it
            idle.as_mut().enable();
            if !self.is_busy() {
                return;
            }
            idle.await;
        }
    }

    fn is_busy(&self) -> bool {
        let flags = self.inner.flags.lock().unwrap();
        flags.in_flight || flags.pending
    }
}

impl CoalescerInner {
    fn request_save(inner: &Arc<CoalescerInner>) {
        {
            let mut flags = inner.flags.lock().unwrap();
            if flags.in_flight {
                debug!("Save already in flight, marking pending");
                flags.pending = true;
                return;
            }
            flags.in_flight = true;
            flags.pending = false;
        }
        tokio::spawn(Arc::clone(inner).run_saves());
    }

    /// Runs the save, then exactly one follow-up per pending request batch.
    /// `in_flight` stays set across the follow-up so a new request can only
    /// ever mark `pending`.
    async fn run_saves(self: Arc<Self>) {
        loop {
            if let Err(err) = self.op.save().await {
                warn!(error = %err, "Save failed");
            }
            let mut flags = self.flags.lock().unwrap();
            if flags.pending {
                flags.pending = false;
                drop(flags);
                continue;
            }
            flags.in_flight = false;
            drop(flags);
            self.idle.notify_waiters();
            return;
        }
    }
}
