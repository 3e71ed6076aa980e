//! Status surface seam.
//!
//! The embedding UI shows a small label next to the notes editor and a
//! transient notification area. The session pushes updates through
//! [`StatusSink`]; the label strings are fixed UI copy.

use std::fmt;

/// State of the save pipeline as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// An edit is waiting to be saved, or a save is running.
    Encrypting,
    /// The last save completed.
    Saved,
    /// The last save could not be persisted.
    Failed,
    /// A save was attempted without a session password.
    NoPassword,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaveStatus::Encrypting => "Encrypting...",
            SaveStatus::Saved => "Encrypted & Saved",
            SaveStatus::Failed => "Save failed",
            SaveStatus::NoPassword => "Error: No password",
        };
        f.write_str(label)
    }
}

/// Receives status updates from the vault session.
pub trait StatusSink: Send + Sync {
    /// The save status label should change to `status`.
    fn save_status(&self, status: SaveStatus);

    /// A short notice for the transient notification surface.
    fn notice(&self, message: &str);
}

/// Discards all status updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn save_status(&self, _status: SaveStatus) {}
    fn notice(&self, _message: &str) {}
}
