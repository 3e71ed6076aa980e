//! The vault session state machine.
//!
//! A [`VaultSession`] owns everything about one user's encrypted notes:
//! the session password, the plaintext buffer, the lock state, the
//! debounced save pipeline and the auto-lock timer. It talks to the
//! outside world through two seams: a [`KeyValueStore`] for persistence
//! and a [`StatusSink`] for UI feedback.
//!
//! States: `Locked` (rest), `Unlocking` (transient, guards re-entrancy),
//! `Unlocked` (buffer and password live in memory) and `Locking` (the
//! lock-time flush is running; edits are rejected). "No envelope in
//! the store yet" is resolved inside [`VaultSession::unlock`] as
//! first-time setup; "saving" is a sub-state of `Unlocked` tracked by the
//! coalescer and visible through [`VaultSession::is_saving`].

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use hushpad_crypto::{decrypt, encrypt, Envelope, KdfParams};

use crate::coalescer::{SaveCoalescer, SaveOp};
use crate::error::{VaultError, VaultResult};
use crate::status::{SaveStatus, StatusSink};
use crate::store::KeyValueStore;

/// Store key the encrypted notes envelope lives under.
///
/// Matches the key used by earlier releases, so this vault reads and
/// writes the same store slot.
pub const VAULT_STORAGE_KEY: &str = "secretNotes";

/// Debounce window between the last edit and the save persisting it.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Idle time after which an unlocked vault locks itself.
pub const AUTO_LOCK_AFTER: Duration = Duration::from_secs(5 * 60);

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Notice shown when the auto-lock timer fires while the panel is visible.
pub const AUTO_LOCK_NOTICE: &str = "Vault locked for safety";

/// Tunables for a vault session.
#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Store key the envelope is persisted under.
    pub storage_key: String,
    /// Argon2id cost parameters used for every key derivation.
    pub kdf: KdfParams,
    /// Debounce window between the last edit and its save.
    pub debounce: Duration,
    /// Idle time before the vault locks itself.
    pub auto_lock_after: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            storage_key: VAULT_STORAGE_KEY.to_string(),
            kdf: KdfParams::default(),
            debounce: SAVE_DEBOUNCE,
            auto_lock_after: AUTO_LOCK_AFTER,
        }
    }
}

/// Lock state of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultState {
    /// Rest state: no password or plaintext in memory.
    Locked,
    /// An unlock attempt is running.
    Unlocking,
    /// Buffer and session password are live.
    Unlocked,
    /// A lock is flushing outstanding saves before it clears the
    /// password; new edits are rejected.
    Locking,
}

/// The session password, kept in memory while unlocked because every save
/// derives a fresh key from it. Zeroized on lock and on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct SessionPassword(String);

impl std::fmt::Debug for SessionPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionPassword").field(&"[REDACTED]").finish()
    }
}

struct SessionState {
    phase: VaultState,
    password: Option<SessionPassword>,
    buffer: String,
    panel_visible: bool,
}

struct SessionShared {
    store: Arc<dyn KeyValueStore>,
    status: Arc<dyn StatusSink>,
    config: VaultConfig,
    state: RwLock<SessionState>,
    auto_lock_timer: Mutex<Option<JoinHandle<()>>>,
}

/// Runs the encrypt-and-persist cycle for the coalescer.
struct EnvelopeSaver {
    shared: Arc<SessionShared>,
}

#[async_trait]
impl SaveOp for EnvelopeSaver {
    async fn save(&self) -> VaultResult<()> {
        self.shared.persist_buffer().await
    }
}

/// A handle to one vault session. Cheap to clone; clones share all state,
/// so the timers and the UI can hold their own copies.
#[derive(Clone)]
pub struct VaultSession {
    shared: Arc<SessionShared>,
    coalescer: SaveCoalescer,
}

impl VaultSession {
    /// Creates a locked session over the given store and status surface.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        status: Arc<dyn StatusSink>,
        config: VaultConfig,
    ) -> Self {
        let debounce = config.debounce;
        let shared = Arc::new(SessionShared {
            store,
            status,
            config,
            state: RwLock::new(SessionState {
                phase: VaultState::Locked,
                password: None,
                buffer: String::new(),
                panel_visible: false,
            }),
            auto_lock_timer: Mutex::new(None),
        });
        let saver = Arc::new(EnvelopeSaver {
            shared: Arc::clone(&shared),
        });
        Self {
            shared,
            coalescer: SaveCoalescer::new(debounce, saver),
        }
    }

    /// Current lock state.
    pub fn state(&self) -> VaultState {
        self.shared.state.read().unwrap().phase
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == VaultState::Unlocked
    }

    /// True while an encrypt-and-persist cycle is running.
    pub fn is_saving(&self) -> bool {
        self.coalescer.is_saving()
    }

    /// Current notes buffer.
    pub fn notes(&self) -> VaultResult<String> {
        let state = self.shared.state.read().unwrap();
        if state.phase != VaultState::Unlocked {
            return Err(VaultError::Locked);
        }
        Ok(state.buffer.clone())
    }

    /// Tells the session whether the notes panel is the visible view.
    /// Gates the auto-lock notice.
    pub fn set_panel_visible(&self, visible: bool) {
        self.shared.state.write().unwrap().panel_visible = visible;
    }

    /// Pushes the auto-lock deadline out. Call on user activity that is
    /// not an edit (clicks, focus).
    pub fn touch(&self) {
        if self.is_unlocked() {
            self.arm_auto_lock();
        }
    }

    /// Unlocks the vault with `password`.
    ///
    /// With no envelope in the store this is first-time setup: the vault
    /// comes up with an empty buffer and immediately persists an initial
    /// envelope so the password is anchored to stored data. With an
    /// existing envelope the stored form is decoded (corruption fails
    /// here, before any cryptography) and decrypted (a bad tag fails as
    /// [`VaultError::IncorrectPassword`]).
    ///
    /// Every failure leaves the vault locked and the stored blob
    /// untouched.
    pub async fn unlock(&self, password: &str) -> VaultResult<()> {
        {
            let mut state = self.shared.state.write().unwrap();
            match state.phase {
                VaultState::Unlocked | VaultState::Locking => {
                    return Err(VaultError::AlreadyUnlocked);
                }
                VaultState::Unlocking => return Err(VaultError::UnlockInProgress),
                VaultState::Locked => {}
            }
            // validation happens before any store or crypto work
            if password.is_empty() {
                return Err(VaultError::PasswordRequired);
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(VaultError::PasswordTooShort);
            }
            state.phase = VaultState::Unlocking;
        }

        let result = self.try_unlock(password).await;
        if result.is_err() {
            let mut state = self.shared.state.write().unwrap();
            state.phase = VaultState::Locked;
            state.password = None;
        }
        result
    }

    /// Locks the vault.
    ///
    /// Outstanding work is flushed first: an armed debounce timer fires
    /// immediately and in-flight saves run to completion, so no edit is
    /// lost. Edits arriving during the flush are rejected as locked.
    /// Then the session password and buffer are zeroized. No-op when not
    /// unlocked.
    pub async fn lock(&self) {
        self.lock_internal().await;
    }

    /// Changes the vault password.
    ///
    /// `current` must match the session password and, when an envelope is
    /// stored, must also decrypt it: a stale session cannot clobber an
    /// envelope re-keyed elsewhere. On success the stored envelope is
    /// re-encrypted under `new_password` before this returns. A vault
    /// that locks while the stored envelope is being verified refuses
    /// the change with [`VaultError::Locked`].
    pub async fn change_password(
        &self,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> VaultResult<()> {
        {
            let state = self.shared.state.read().unwrap();
            if state.phase != VaultState::Unlocked {
                return Err(VaultError::Locked);
            }
            let session_password = state.password.as_ref().ok_or(VaultError::NoPassword)?;
            if current != session_password.0 {
                return Err(VaultError::IncorrectCurrentPassword);
            }
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(VaultError::PasswordTooShort);
        }
        if new_password != confirm {
            return Err(VaultError::PasswordMismatch);
        }

        self.verify_against_stored(current).await?;

        {
            let mut state = self.shared.state.write().unwrap();
            // the vault may have locked while the stored envelope was
            // being verified; a locked session must not regain a password
            if state.phase != VaultState::Unlocked {
                return Err(VaultError::Locked);
            }
            state.password = Some(SessionPassword(new_password.to_string()));
            // request inside the critical section: a lock arriving after
            // the commit has to flush this save before it clears anything
            self.coalescer.request_save();
        }
        // re-encrypt under the new password before reporting success
        self.coalescer.flush().await;
        info!("Vault password changed");
        Ok(())
    }

    /// Replaces the notes buffer with `text` and schedules a save.
    ///
    /// Shows "Encrypting..." right away, re-arms the auto-lock deadline
    /// and restarts the debounce timer. The save itself runs after the
    /// debounce window and reads the buffer fresh at that point.
    pub fn edit(&self, text: &str) -> VaultResult<()> {
        {
            let mut state = self.shared.state.write().unwrap();
            if state.phase != VaultState::Unlocked {
                return Err(VaultError::Locked);
            }
            state.buffer.clear();
            state.buffer.push_str(text);
            // restart the debounce inside the critical section; a lock
            // that takes the state lock next will flush this edit
            self.coalescer.note_edit();
        }
        self.shared.status.save_status(SaveStatus::Encrypting);
        self.arm_auto_lock();
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn try_unlock(&self, password: &str) -> VaultResult<()> {
        match self.shared.store.get(&self.shared.config.storage_key).await? {
            None => self.initialize_vault(password).await,
            Some(raw) => self.unlock_existing(password, &raw).await,
        }
    }

    async fn initialize_vault(&self, password: &str) -> VaultResult<()> {
        info!("No stored envelope, creating a new vault");
        {
            let mut state = self.shared.state.write().unwrap();
            state.password = Some(SessionPassword(password.to_string()));
            state.buffer = String::new();
            state.phase = VaultState::Unlocked;
        }
        self.arm_auto_lock();
        // anchor the password to stored data right away; a failed write
        // shows up on the status surface and the next save retries
        self.save_now().await;
        Ok(())
    }

    async fn unlock_existing(&self, password: &str, raw: &str) -> VaultResult<()> {
        let envelope = Envelope::decode(raw)?;
        let kdf = self.shared.config.kdf.clone();
        let password_owned = password.to_string();
        let plaintext =
            tokio::task::spawn_blocking(move || decrypt(&envelope, &password_owned, &kdf))
                .await
                .map_err(blocking_failed)??;
        {
            let mut state = self.shared.state.write().unwrap();
            state.password = Some(SessionPassword(password.to_string()));
            state.buffer = plaintext;
            state.phase = VaultState::Unlocked;
        }
        self.arm_auto_lock();
        info!("Vault unlocked");
        Ok(())
    }

    /// Checks `current` against the persisted envelope, if one exists.
    async fn verify_against_stored(&self, current: &str) -> VaultResult<()> {
        let Some(raw) = self.shared.store.get(&self.shared.config.storage_key).await? else {
            return Ok(());
        };
        let envelope = Envelope::decode(&raw)?;
        let kdf = self.shared.config.kdf.clone();
        let current_owned = current.to_string();
        let verified = tokio::task::spawn_blocking(move || decrypt(&envelope, &current_owned, &kdf))
            .await
            .map_err(blocking_failed)?;
        match verified {
            Ok(_plaintext) => Ok(()),
            Err(err) => Err(match VaultError::from(err) {
                VaultError::IncorrectPassword => VaultError::IncorrectCurrentPassword,
                other => other,
            }),
        }
    }

    /// Forces a save through the coalescer and waits for it to finish.
    /// Persistence failures surface on the status label, not here.
    async fn save_now(&self) {
        self.coalescer.request_save();
        self.coalescer.flush().await;
    }

    /// Returns true if this call performed the lock.
    async fn lock_internal(&self) -> bool {
        {
            let mut state = self.shared.state.write().unwrap();
            if state.phase != VaultState::Unlocked {
                return false;
            }
            // edits are rejected from here on; nothing can slip in
            // behind the flush
            state.phase = VaultState::Locking;
        }
        // unsaved edits must reach the store before the password goes away
        self.coalescer.flush().await;
        {
            let mut state = self.shared.state.write().unwrap();
            state.password = None;
            state.buffer.zeroize();
            state.phase = VaultState::Locked;
        }
        info!("Vault locked");
        true
    }

    /// Restarts the auto-lock timer. The previous timer task is aborted;
    /// a task that already fired bails on the lock-state guard instead.
    fn arm_auto_lock(&self) {
        let session = self.clone();
        let after = self.shared.config.auto_lock_after;
        let mut timer = self.shared.auto_lock_timer.lock().unwrap();
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            session.auto_lock().await;
        }));
    }

    async fn auto_lock(&self) {
        if !self.is_unlocked() {
            // stale timer surviving a manual lock
            return;
        }
        info!("Auto-locking idle vault");
        if self.lock_internal().await && self.shared.state.read().unwrap().panel_visible {
            self.shared.status.notice(AUTO_LOCK_NOTICE);
        }
    }
}

impl SessionShared {
    /// One encrypt-and-persist cycle. Reads the buffer fresh, so a save
    /// that was pending behind another one picks up the newest edits.
    async fn persist_buffer(&self) -> VaultResult<()> {
        let (password, plaintext) = {
            let state = self.state.read().unwrap();
            // saves driven by the lock-time flush still run while Locking
            if !matches!(state.phase, VaultState::Unlocked | VaultState::Locking) {
                debug!("Save skipped, vault is locked");
                return Ok(());
            }
            match &state.password {
                None => {
                    self.status.save_status(SaveStatus::NoPassword);
                    return Err(VaultError::NoPassword);
                }
                Some(password) => (password.clone(), state.buffer.clone()),
            }
        };

        self.status.save_status(SaveStatus::Encrypting);
        match self.encrypt_and_store(password, plaintext).await {
            Ok(()) => {
                self.status.save_status(SaveStatus::Saved);
                Ok(())
            }
            Err(err) => {
                // the buffer keeps the unsaved edits; a later save retries
                self.status.save_status(SaveStatus::Failed);
                Err(err)
            }
        }
    }

    async fn encrypt_and_store(
        &self,
        password: SessionPassword,
        plaintext: String,
    ) -> VaultResult<()> {
        let kdf = self.config.kdf.clone();
        let envelope = tokio::task::spawn_blocking(move || encrypt(&plaintext, &password.0, &kdf))
            .await
            .map_err(blocking_failed)??;
        let encoded = envelope.encode()?;
        self.store.set(&self.config.storage_key, &encoded).await?;
        debug!(bytes = encoded.len(), "Vault saved");
        Ok(())
    }
}

fn blocking_failed(err: tokio::task::JoinError) -> VaultError {
    VaultError::Crypto(format!("blocking task failed: {err}"))
}
