use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hushpad_vault::{SaveCoalescer, SaveOp, VaultError, VaultResult};
use tokio::time::sleep;

const DEBOUNCE: Duration = Duration::from_millis(1500);

#[derive(Default)]
struct CountingOp {
    calls: AtomicUsize,
}

#[async_trait]
impl SaveOp for CountingOp {
    async fn save(&self) -> VaultResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts at save start, then holds the save open for a while.
struct SlowOp {
    calls: AtomicUsize,
    duration: Duration,
}

impl SlowOp {
    fn new(duration: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            duration,
        }
    }
}

#[async_trait]
impl SaveOp for SlowOp {
    async fn save(&self) -> VaultResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.duration).await;
        Ok(())
    }
}

/// Snapshots a shared value at save start, like the vault snapshots its
/// buffer, and records what each save would have persisted.
#[derive(Default)]
struct SnapshotOp {
    current: Mutex<String>,
    saved: Mutex<Vec<String>>,
}

#[async_trait]
impl SaveOp for SnapshotOp {
    async fn save(&self) -> VaultResult<()> {
        let value = self.current.lock().unwrap().clone();
        sleep(Duration::from_millis(500)).await;
        self.saved.lock().unwrap().push(value);
        Ok(())
    }
}

#[derive(Default)]
struct FailingOp {
    attempts: AtomicUsize,
}

#[async_trait]
impl SaveOp for FailingOp {
    async fn save(&self) -> VaultResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(VaultError::Crypto("simulated failure".to_string()))
    }
}

// ── Debounce ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn burst_of_edits_coalesces_into_one_save() {
    let op = Arc::new(CountingOp::default());
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    for _ in 0..5 {
        coalescer.note_edit();
        sleep(Duration::from_millis(100)).await;
    }
    sleep(Duration::from_millis(2000)).await;

    assert_eq!(op.calls.load(Ordering::SeqCst), 1);
    assert!(!coalescer.is_saving());
}

#[tokio::test(start_paused = true)]
async fn edit_restarts_the_debounce_window() {
    let op = Arc::new(CountingOp::default());
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    coalescer.note_edit();
    sleep(Duration::from_millis(1000)).await;
    coalescer.note_edit();
    sleep(Duration::from_millis(1000)).await;

    // 2000ms since the first edit, but only 1000ms since the last
    assert_eq!(op.calls.load(Ordering::SeqCst), 0);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(op.calls.load(Ordering::SeqCst), 1);
}

// ── Overlapping saves ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn requests_during_a_save_collapse_into_one_followup() {
    let op = Arc::new(SlowOp::new(Duration::from_millis(500)));
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    coalescer.request_save();
    sleep(Duration::from_millis(100)).await;
    assert!(coalescer.is_saving());

    coalescer.request_save();
    coalescer.request_save();
    coalescer.request_save();
    assert!(coalescer.has_pending());

    sleep(Duration::from_millis(2000)).await;
    assert_eq!(op.calls.load(Ordering::SeqCst), 2);
    assert!(!coalescer.is_saving());
    assert!(!coalescer.has_pending());
}

#[tokio::test(start_paused = true)]
async fn followup_save_reads_the_freshest_state() {
    let op = Arc::new(SnapshotOp::default());
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    *op.current.lock().unwrap() = "v1".to_string();
    coalescer.request_save();
    sleep(Duration::from_millis(100)).await;

    // both arrive while v1 is still being saved
    *op.current.lock().unwrap() = "v2".to_string();
    coalescer.request_save();
    sleep(Duration::from_millis(100)).await;
    *op.current.lock().unwrap() = "v3".to_string();
    coalescer.request_save();

    sleep(Duration::from_millis(2000)).await;
    assert_eq!(*op.saved.lock().unwrap(), vec!["v1", "v3"]);
}

// ── Flush ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn flush_fires_an_armed_timer_immediately() {
    let op = Arc::new(CountingOp::default());
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    coalescer.note_edit();
    coalescer.flush().await;
    assert_eq!(op.calls.load(Ordering::SeqCst), 1);

    // the timer was cancelled, not rescheduled
    sleep(Duration::from_millis(3000)).await;
    assert_eq!(op.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn flush_waits_for_inflight_and_pending_saves() {
    let op = Arc::new(SlowOp::new(Duration::from_millis(500)));
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    coalescer.request_save();
    sleep(Duration::from_millis(100)).await;
    coalescer.request_save();
    assert!(coalescer.has_pending());

    coalescer.flush().await;
    assert_eq!(op.calls.load(Ordering::SeqCst), 2);
    assert!(!coalescer.is_saving());
    assert!(!coalescer.has_pending());
}

#[tokio::test(start_paused = true)]
async fn flush_on_idle_coalescer_returns_immediately() {
    let op = Arc::new(CountingOp::default());
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    coalescer.flush().await;
    assert_eq!(op.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn coalescer_stays_usable_after_flush() {
    let op = Arc::new(CountingOp::default());
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    coalescer.note_edit();
    coalescer.flush().await;
    assert_eq!(op.calls.load(Ordering::SeqCst), 1);

    coalescer.note_edit();
    sleep(Duration::from_millis(2000)).await;
    assert_eq!(op.calls.load(Ordering::SeqCst), 2);
}

// ── Failures ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failed_save_clears_the_flags() {
    let op = Arc::new(FailingOp::default());
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    coalescer.request_save();
    coalescer.flush().await;
    assert_eq!(op.attempts.load(Ordering::SeqCst), 1);
    assert!(!coalescer.is_saving());
    assert!(!coalescer.has_pending());

    // the coalescer accepts new work after a failure
    coalescer.request_save();
    coalescer.flush().await;
    assert_eq!(op.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_save_still_runs_the_followup() {
    let op = Arc::new(FailingOp::default());
    let coalescer = SaveCoalescer::new(DEBOUNCE, op.clone());

    coalescer.request_save();
    coalescer.request_save();
    coalescer.flush().await;

    // the first attempt failed; the pending request ran anyway
    assert_eq!(op.attempts.load(Ordering::SeqCst), 2);
}
