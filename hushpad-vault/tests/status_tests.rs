use std::sync::Arc;

use hushpad_vault::{NullStatusSink, SaveStatus, StatusSink};
use pretty_assertions::{assert_eq, assert_ne};

// ── Display labels ───────────────────────────────────────────────

#[test]
fn status_labels_match_the_ui_strings() {
    assert_eq!(SaveStatus::Encrypting.to_string(), "Encrypting...");
    assert_eq!(SaveStatus::Saved.to_string(), "Encrypted & Saved");
    assert_eq!(SaveStatus::Failed.to_string(), "Save failed");
    assert_eq!(SaveStatus::NoPassword.to_string(), "Error: No password");
}

#[test]
fn status_is_copy_and_comparable() {
    let status = SaveStatus::Saved;
    let copy = status;
    assert_eq!(status, copy);
    assert_ne!(SaveStatus::Encrypting, SaveStatus::Failed);
}

#[test]
fn status_debug_is_nonempty() {
    let all = [
        SaveStatus::Encrypting,
        SaveStatus::Saved,
        SaveStatus::Failed,
        SaveStatus::NoPassword,
    ];
    for status in all {
        assert!(!format!("{status:?}").is_empty());
    }
}

// ── Null sink ────────────────────────────────────────────────────

#[test]
fn null_sink_accepts_everything() {
    let sink: Arc<dyn StatusSink> = Arc::new(NullStatusSink);
    sink.save_status(SaveStatus::Encrypting);
    sink.save_status(SaveStatus::Saved);
    sink.notice("nothing listens");
}
