//! Parent/child mode state machine.
//!
//! ```text
//!            switch_to_parent_mode(pin) [not locked, pin ok]
//!   ┌───────┐ ───────────────────────────────────────────► ┌────────┐
//!   │ Child │                                              │ Parent │
//!   └───────┘ ◄─────────────────────────────────────────── └────────┘
//!      ▲       switch_to_child_mode() / inactivity timeout
//!      │
//!   (initial, every session)
//! ```

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use orbit_learn_storage::{keys, StorageManager};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::error::ModeError;
use crate::options::ModeOptions;

/// Which side of the app is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Child,
    Parent,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Child
    }
}

/// Why the mode changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    /// The stored PIN matched.
    Pin,
    /// No PIN existed yet; the entered one was stored.
    PinBootstrap,
    /// Explicit request.
    Manual,
    /// Parent mode sat idle past the inactivity timeout.
    Inactivity,
    /// The parent signed out or the session expired.
    SignedOut,
}

/// Mode session events.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeEvent {
    ModeChanged { mode: Mode, reason: SwitchReason },
    PinRejected { remaining_attempts: u32 },
    LockedOut { until: DateTime<Utc> },
    PinChanged,
}

/// Point-in-time view of the mode session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSnapshot {
    pub mode: Mode,
    pub pin_verified: bool,
    pub pin_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub has_pin: bool,
    pub auto_switch_enabled: bool,
    pub last_activity: DateTime<Utc>,
}

impl ModeSnapshot {
    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some()
    }
}

/// Returns true if `pin` is exactly four ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

fn chrono_duration(d: std::time::Duration) -> Duration {
    Duration::milliseconds(d.as_millis().min(i64::MAX as u128) as i64)
}

/// Attempt counter and lockout left behind by an earlier session.
/// Unreadable values count as absent.
fn load_lockout(
    storage: &StorageManager,
    user_id: &str,
    options: &ModeOptions,
) -> (u32, Option<DateTime<Utc>>) {
    let attempts = storage
        .get(&keys::pin_attempts(user_id))
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(0)
        .min(options.max_pin_attempts);
    let locked_until = storage
        .get(&keys::pin_locked_until(user_id))
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|until| until.with_timezone(&Utc));
    (attempts, locked_until)
}

#[derive(Debug)]
struct ModeState {
    current_mode: Mode,
    pin_verified: bool,
    pin_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    last_activity: DateTime<Utc>,
    auto_switch_enabled: bool,
}

struct ModeInner {
    user_id: String,
    storage: StorageManager,
    options: ModeOptions,
    clock: Arc<dyn Clock>,
    state: Mutex<ModeState>,
    events: broadcast::Sender<ModeEvent>,
}

impl ModeInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, ModeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stored_pin(&self) -> Option<String> {
        self.storage.get(&keys::parent_pin(&self.user_id))
    }

    fn emit(&self, event: ModeEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Write the attempt counter and lockout through to storage so that
    /// dropping the session does not reset them.
    fn persist_lockout(&self, state: &ModeState) {
        let attempts = (state.pin_attempts > 0).then(|| state.pin_attempts.to_string());
        let until = state.locked_until.map(|t| t.to_rfc3339());
        let result = self
            .storage
            .put_optional(&keys::pin_attempts(&self.user_id), attempts.as_deref())
            .and_then(|_| {
                self.storage
                    .put_optional(&keys::pin_locked_until(&self.user_id), until.as_deref())
            });
        if let Err(e) = result {
            warn!("Failed to persist PIN lockout for user {}: {}", self.user_id, e);
        }
    }

    /// Drop an elapsed lockout. Called on every state-reading transition.
    fn expire_lockout(&self, state: &mut ModeState, now: DateTime<Utc>) {
        if let Some(until) = state.locked_until {
            if now >= until {
                debug!("PIN lockout for user {} expired", self.user_id);
                state.locked_until = None;
                state.pin_attempts = 0;
                self.persist_lockout(state);
            }
        }
    }

    /// Shared PIN check. Counts a failed attempt and arms the lockout.
    /// Returns `None` when locked, so the caller can tell "locked" apart
    /// from "wrong".
    fn check_pin(&self, state: &mut ModeState, pin: &str, now: DateTime<Utc>) -> Option<bool> {
        self.expire_lockout(state, now);
        if state.locked_until.is_some() {
            return None;
        }

        let matches = self.stored_pin().map_or(false, |stored| stored == pin);
        if matches {
            if state.pin_attempts > 0 {
                state.pin_attempts = 0;
                self.persist_lockout(state);
            }
            return Some(true);
        }

        state.pin_attempts = (state.pin_attempts + 1).min(self.options.max_pin_attempts);
        if state.pin_attempts >= self.options.max_pin_attempts {
            let until = now + chrono_duration(self.options.lockout_duration);
            state.locked_until = Some(until);
            warn!(
                "Too many wrong PINs for user {}, locked until {}",
                self.user_id, until
            );
            self.persist_lockout(state);
            self.emit(ModeEvent::LockedOut { until });
        } else {
            self.persist_lockout(state);
            self.emit(ModeEvent::PinRejected {
                remaining_attempts: self.options.max_pin_attempts - state.pin_attempts,
            });
        }
        Some(false)
    }

    fn enter_child(&self, state: &mut ModeState, reason: SwitchReason) {
        let was_parent = state.current_mode == Mode::Parent;
        state.current_mode = Mode::Child;
        state.pin_verified = false;
        state.last_activity = self.clock.now();
        if was_parent {
            info!("Switched to child mode ({:?})", reason);
            self.emit(ModeEvent::ModeChanged {
                mode: Mode::Child,
                reason,
            });
        }
    }

    fn check_inactivity(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.lock_state();
        if state.current_mode != Mode::Parent || !state.auto_switch_enabled {
            return false;
        }
        let idle = now - state.last_activity;
        if idle >= chrono_duration(self.options.inactivity_timeout) {
            debug!("Parent mode idle for {}s", idle.num_seconds());
            self.enter_child(&mut state, SwitchReason::Inactivity);
            return true;
        }
        false
    }
}

/// Parent/child mode session for one signed-in user.
///
/// A fresh session always starts in [`Mode::Child`]; the mode itself is
/// never persisted, so a parent has to enter the PIN again after every
/// reload. The stored PIN, the auto-switch preference and the wrong-PIN
/// counter with its lockout are persisted per user in the shared
/// [`StorageManager`], so a new session picks up an active lockout.
pub struct ModeSession {
    inner: Arc<ModeInner>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ModeSession {
    /// Create a mode session for `user_id` using the wall clock.
    pub fn new(user_id: &str, storage: StorageManager, options: ModeOptions) -> Self {
        Self::with_clock(user_id, storage, options, Arc::new(SystemClock))
    }

    /// Create a mode session with a custom clock.
    pub fn with_clock(
        user_id: &str,
        storage: StorageManager,
        options: ModeOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let auto_switch_enabled = match storage.get(&keys::auto_switch(user_id)) {
            Some(raw) => raw == "true",
            None => options.auto_switch_default,
        };
        let (pin_attempts, locked_until) = load_lockout(&storage, user_id, &options);
        if let Some(until) = locked_until {
            debug!("Restored PIN lockout for user {} until {}", user_id, until);
        }
        let now = clock.now();
        let (events, _) = broadcast::channel(16);

        Self {
            inner: Arc::new(ModeInner {
                user_id: user_id.to_string(),
                storage,
                options,
                clock,
                state: Mutex::new(ModeState {
                    current_mode: Mode::Child,
                    pin_verified: false,
                    pin_attempts,
                    locked_until,
                    last_activity: now,
                    auto_switch_enabled,
                }),
                events,
            }),
            watcher: Mutex::new(None),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn options(&self) -> &ModeOptions {
        &self.inner.options
    }

    /// Subscribe to mode events.
    pub fn subscribe(&self) -> broadcast::Receiver<ModeEvent> {
        self.inner.events.subscribe()
    }

    /// Current mode. Also clears an elapsed lockout.
    pub fn current_mode(&self) -> Mode {
        self.snapshot().mode
    }

    pub fn is_parent_mode(&self) -> bool {
        self.current_mode() == Mode::Parent
    }

    /// Full state read. Clears an elapsed lockout before reporting.
    pub fn snapshot(&self) -> ModeSnapshot {
        let now = self.inner.clock.now();
        let mut state = self.inner.lock_state();
        self.inner.expire_lockout(&mut state, now);
        ModeSnapshot {
            mode: state.current_mode,
            pin_verified: state.pin_verified,
            pin_attempts: state.pin_attempts,
            locked_until: state.locked_until,
            has_pin: self.inner.stored_pin().is_some(),
            auto_switch_enabled: state.auto_switch_enabled,
            last_activity: state.last_activity,
        }
    }

    /// Try to enter parent mode.
    ///
    /// Returns `false` without counting an attempt while locked. When no PIN
    /// has been stored for this user yet, `pin` becomes the stored PIN and
    /// the switch succeeds. The caller is expected to have validated the
    /// PIN format and confirmation before calling this.
    pub fn switch_to_parent_mode(&self, pin: &str) -> bool {
        let inner = &self.inner;
        let now = inner.clock.now();
        let mut state = inner.lock_state();

        inner.expire_lockout(&mut state, now);
        if state.locked_until.is_some() {
            debug!("Rejected parent mode switch while locked");
            return false;
        }

        let reason = if inner.stored_pin().is_none() {
            if let Err(e) = inner.storage.set(&keys::parent_pin(&inner.user_id), pin) {
                warn!("Failed to store initial parent PIN: {}", e);
                return false;
            }
            info!("Stored initial parent PIN for user {}", inner.user_id);
            SwitchReason::PinBootstrap
        } else {
            match inner.check_pin(&mut state, pin, now) {
                Some(true) => SwitchReason::Pin,
                _ => return false,
            }
        };

        state.current_mode = Mode::Parent;
        state.pin_verified = true;
        if state.pin_attempts > 0 {
            state.pin_attempts = 0;
            inner.persist_lockout(&state);
        }
        state.last_activity = now;
        info!("Switched to parent mode ({:?})", reason);
        inner.emit(ModeEvent::ModeChanged {
            mode: Mode::Parent,
            reason,
        });
        true
    }

    /// Leave parent mode. Always succeeds.
    pub fn switch_to_child_mode(&self) {
        let mut state = self.inner.lock_state();
        self.inner.enter_child(&mut state, SwitchReason::Manual);
    }

    /// Stop the watcher and drop back to child mode because the parent's
    /// auth session ended. The session should not be reused afterwards.
    pub fn end(&self) {
        self.stop_inactivity_watcher();
        let mut state = self.inner.lock_state();
        self.inner.enter_child(&mut state, SwitchReason::SignedOut);
    }

    /// Note user input (pointer, key, touch, scroll).
    pub fn record_activity(&self) {
        let now = self.inner.clock.now();
        let mut state = self.inner.lock_state();
        state.last_activity = now;
    }

    /// Run one inactivity check. Returns true if it forced child mode.
    pub fn check_inactivity(&self) -> bool {
        self.inner.check_inactivity()
    }

    pub fn has_parent_pin(&self) -> bool {
        self.inner.stored_pin().is_some()
    }

    /// Attempts left before lockout. Pure: an elapsed lockout reads as a
    /// full allowance without touching state.
    pub fn remaining_attempts(&self) -> u32 {
        let now = self.inner.clock.now();
        let state = self.inner.lock_state();
        match state.locked_until {
            Some(until) if now >= until => self.inner.options.max_pin_attempts,
            Some(_) => 0,
            None => self
                .inner
                .options
                .max_pin_attempts
                .saturating_sub(state.pin_attempts),
        }
    }

    /// Time left on the lockout, or `None` when not locked.
    pub fn time_until_unlock(&self) -> Option<Duration> {
        let now = self.inner.clock.now();
        let state = self.inner.lock_state();
        state
            .locked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    pub fn is_locked(&self) -> bool {
        self.time_until_unlock().is_some()
    }

    pub fn auto_switch_enabled(&self) -> bool {
        self.inner.lock_state().auto_switch_enabled
    }

    /// Enable or disable the inactivity auto-switch and persist the choice.
    pub fn set_auto_switch(&self, enabled: bool) -> Result<(), ModeError> {
        let key = keys::auto_switch(&self.inner.user_id);
        self.inner
            .storage
            .set(&key, if enabled { "true" } else { "false" })?;
        self.inner.lock_state().auto_switch_enabled = enabled;
        Ok(())
    }

    /// Store a new PIN, replacing any previous one.
    pub fn set_parent_pin(&self, pin: &str) -> Result<(), ModeError> {
        if !is_valid_pin(pin) {
            return Err(ModeError::InvalidPin);
        }
        self.inner
            .storage
            .set(&keys::parent_pin(&self.inner.user_id), pin)?;
        self.inner.emit(ModeEvent::PinChanged);
        Ok(())
    }

    /// Replace the PIN after checking the current one. A wrong current PIN
    /// counts toward the lockout.
    pub fn change_pin(&self, current: &str, new_pin: &str) -> Result<(), ModeError> {
        if !is_valid_pin(new_pin) {
            return Err(ModeError::InvalidPin);
        }
        let now = self.inner.clock.now();
        {
            let mut state = self.inner.lock_state();
            match self.inner.check_pin(&mut state, current, now) {
                None => {
                    let secs = state
                        .locked_until
                        .map(|until| (until - now).num_seconds())
                        .unwrap_or_default();
                    return Err(ModeError::Locked(secs));
                }
                Some(false) => return Err(ModeError::PinMismatch),
                Some(true) => {}
            }
        }
        self.set_parent_pin(new_pin)
    }

    /// Forget the stored PIN and any lockout. The next parent switch will
    /// store a new PIN.
    pub fn reset_pin(&self) -> Result<(), ModeError> {
        self.inner
            .storage
            .remove(&keys::parent_pin(&self.inner.user_id))?;
        let mut state = self.inner.lock_state();
        state.pin_attempts = 0;
        state.locked_until = None;
        self.inner.persist_lockout(&state);
        info!("Parent PIN reset for user {}", self.inner.user_id);
        Ok(())
    }

    /// Spawn the periodic inactivity check on the current tokio runtime.
    ///
    /// Calling this again while a watcher is running does nothing. The
    /// task is aborted when the session is dropped.
    pub fn start_inactivity_watcher(&self) {
        let mut watcher = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        if watcher.as_ref().map_or(false, |h| !h.is_finished()) {
            return;
        }

        let inner = self.inner.clone();
        let period = inner.options.check_interval;
        *watcher = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                inner.check_inactivity();
            }
        }));
        debug!("Inactivity watcher started ({:?})", period);
    }

    pub fn stop_inactivity_watcher(&self) {
        let mut watcher = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = watcher.take() {
            handle.abort();
            debug!("Inactivity watcher stopped");
        }
    }

    pub fn is_watching(&self) -> bool {
        let watcher = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        watcher.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for ModeSession {
    fn drop(&mut self) {
        self.stop_inactivity_watcher();
    }
}

impl std::fmt::Debug for ModeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeSession")
            .field("user_id", &self.inner.user_id)
            .field("state", &*self.inner.lock_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn session() -> (ModeSession, Arc<ManualClock>, StorageManager) {
        let clock = Arc::new(ManualClock::default());
        let storage = StorageManager::in_memory();
        let session =
            ModeSession::with_clock("u1", storage.clone(), ModeOptions::default(), clock.clone());
        (session, clock, storage)
    }

    #[test]
    fn first_pin_is_stored_and_later_mismatch_counts() {
        let (session, _, storage) = session();
        assert!(!session.has_parent_pin());

        assert!(session.switch_to_parent_mode("0000"));
        assert_eq!(session.current_mode(), Mode::Parent);
        assert_eq!(storage.get("parent_pin_u1"), Some("0000".to_string()));

        session.switch_to_child_mode();
        assert!(!session.switch_to_parent_mode("1234"));
        assert_eq!(session.snapshot().pin_attempts, 1);
        assert_eq!(session.remaining_attempts(), 4);
        assert_eq!(session.current_mode(), Mode::Child);
    }

    #[test]
    fn lockout_rejects_then_expires() {
        let (session, clock, storage) = session();
        storage.set("parent_pin_u1", "4321").unwrap();

        for _ in 0..5 {
            assert!(!session.switch_to_parent_mode("0000"));
        }
        assert!(session.is_locked());
        assert_eq!(session.remaining_attempts(), 0);
        let until = session.snapshot().locked_until;

        // Correct PIN while locked is still rejected and nothing moves.
        assert!(!session.switch_to_parent_mode("4321"));
        let snap = session.snapshot();
        assert_eq!(snap.pin_attempts, 5);
        assert_eq!(snap.locked_until, until);

        clock.advance(Duration::minutes(15));
        assert!(session.switch_to_parent_mode("4321"));
        let snap = session.snapshot();
        assert_eq!(snap.pin_attempts, 0);
        assert_eq!(snap.locked_until, None);
    }

    #[test]
    fn lockout_is_written_through_to_storage() {
        let (session, clock, storage) = session();
        storage.set("parent_pin_u1", "4321").unwrap();

        assert!(!session.switch_to_parent_mode("0000"));
        assert_eq!(storage.get("pin_attempts_u1"), Some("1".to_string()));
        assert_eq!(storage.get("pin_locked_until_u1"), None);

        for _ in 0..4 {
            session.switch_to_parent_mode("0000");
        }
        let until = session.snapshot().locked_until.unwrap();
        assert_eq!(storage.get("pin_attempts_u1"), Some("5".to_string()));
        assert_eq!(storage.get("pin_locked_until_u1"), Some(until.to_rfc3339()));

        clock.advance(Duration::minutes(15));
        assert!(!session.is_locked());
        session.snapshot();
        assert_eq!(storage.get("pin_attempts_u1"), None);
        assert_eq!(storage.get("pin_locked_until_u1"), None);
    }

    #[test]
    fn corrupt_lockout_values_read_as_absent() {
        let clock = Arc::new(ManualClock::default());
        let storage = StorageManager::in_memory();
        storage.set("pin_attempts_u1", "lots").unwrap();
        storage.set("pin_locked_until_u1", "tomorrow").unwrap();
        let session =
            ModeSession::with_clock("u1", storage, ModeOptions::default(), clock);
        assert!(!session.is_locked());
        assert_eq!(session.remaining_attempts(), 5);
    }

    #[test]
    fn queries_do_not_clear_an_elapsed_lockout() {
        let (session, clock, storage) = session();
        storage.set("parent_pin_u1", "4321").unwrap();
        for _ in 0..5 {
            session.switch_to_parent_mode("0000");
        }
        clock.advance(Duration::minutes(16));

        assert!(!session.is_locked());
        assert_eq!(session.remaining_attempts(), 5);
        assert_eq!(session.time_until_unlock(), None);

        // The next state read clears it.
        let snap = session.snapshot();
        assert_eq!(snap.locked_until, None);
        assert_eq!(snap.pin_attempts, 0);
    }

    #[test]
    fn time_until_unlock_counts_down() {
        let (session, clock, storage) = session();
        storage.set("parent_pin_u1", "4321").unwrap();
        for _ in 0..5 {
            session.switch_to_parent_mode("0000");
        }
        clock.advance(Duration::minutes(10));
        assert_eq!(session.time_until_unlock(), Some(Duration::minutes(5)));
    }

    #[test]
    fn success_resets_attempts() {
        let (session, _, storage) = session();
        storage.set("parent_pin_u1", "4321").unwrap();
        session.switch_to_parent_mode("1111");
        session.switch_to_parent_mode("2222");
        assert_eq!(session.snapshot().pin_attempts, 2);

        assert!(session.switch_to_parent_mode("4321"));
        assert_eq!(session.snapshot().pin_attempts, 0);
        assert!(session.snapshot().pin_verified);
    }

    #[test]
    fn child_switch_clears_pin_verified() {
        let (session, _, _) = session();
        session.switch_to_parent_mode("0000");
        session.switch_to_child_mode();
        let snap = session.snapshot();
        assert_eq!(snap.mode, Mode::Child);
        assert!(!snap.pin_verified);
    }

    #[test]
    fn inactivity_forces_child_mode() {
        let (session, clock, _) = session();
        session.switch_to_parent_mode("0000");

        clock.advance(Duration::minutes(10));
        assert!(!session.check_inactivity());
        session.record_activity();

        clock.advance(Duration::minutes(14));
        assert!(!session.check_inactivity());
        clock.advance(Duration::minutes(1));
        assert!(session.check_inactivity());
        assert_eq!(session.current_mode(), Mode::Child);
    }

    #[test]
    fn disabled_auto_switch_keeps_parent_mode() {
        let (session, clock, storage) = session();
        session.set_auto_switch(false).unwrap();
        assert_eq!(storage.get("auto_switch_u1"), Some("false".to_string()));

        session.switch_to_parent_mode("0000");
        clock.advance(Duration::hours(2));
        assert!(!session.check_inactivity());
        assert!(session.is_parent_mode());
    }

    #[test]
    fn change_pin_requires_current_pin() {
        let (session, _, storage) = session();
        storage.set("parent_pin_u1", "4321").unwrap();

        assert!(matches!(session.change_pin("4321", "12"), Err(ModeError::InvalidPin)));
        assert!(matches!(
            session.change_pin("0000", "5678"),
            Err(ModeError::PinMismatch)
        ));
        session.change_pin("4321", "5678").unwrap();
        assert_eq!(storage.get("parent_pin_u1"), Some("5678".to_string()));
    }

    #[test]
    fn reset_pin_allows_bootstrap_again() {
        let (session, _, _) = session();
        session.switch_to_parent_mode("0000");
        session.reset_pin().unwrap();
        assert!(!session.has_parent_pin());
        session.switch_to_child_mode();
        assert!(session.switch_to_parent_mode("9999"));
    }

    #[test]
    fn end_forces_child_mode() {
        let (session, _, _) = session();
        let mut events = session.subscribe();
        assert!(session.switch_to_parent_mode("0000"));
        events.try_recv().unwrap();

        session.end();
        assert_eq!(session.current_mode(), Mode::Child);
        assert!(!session.snapshot().pin_verified);
        assert_eq!(
            events.try_recv().unwrap(),
            ModeEvent::ModeChanged {
                mode: Mode::Child,
                reason: SwitchReason::SignedOut
            }
        );
    }

    #[test]
    fn pin_format() {
        assert!(is_valid_pin("0123"));
        assert!(!is_valid_pin("123"));
        assert!(!is_valid_pin("12345"));
        assert!(!is_valid_pin("12a4"));
        assert!(!is_valid_pin("١٢٣٤"));
    }
}
