//! Authentication and parent/child profile session for Orbit Learn

mod refresh;
mod tokens;
mod types;

pub use refresh::*;
pub use tokens::*;
pub use types::*;

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use log::{debug, info, warn};
use orbit_learn_mode::ModeSession;
use orbit_learn_storage::{keys, ScopedStorage, StorageManager};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::api::ApiClient;
use crate::config::ClientOptions;
use crate::error::Error;
use crate::validation;

/// Onboarding flags derived from the session.
///
/// Always recomputed from `(user, child count, credentials)`; never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionFlags {
    pub is_authenticated: bool,
    pub has_consent: bool,
    pub needs_email_verification: bool,
    pub needs_consent: bool,
    pub needs_child_profile: bool,
}

impl SessionFlags {
    pub fn derive(user: Option<&ParentUser>, child_count: usize, has_credentials: bool) -> Self {
        match user {
            Some(user) => Self::from_parts(
                user.email_verified,
                user.consent_status,
                child_count,
                has_credentials,
            ),
            None => Self::default(),
        }
    }

    /// Flags for a known parent, from the raw onboarding facts.
    pub fn from_parts(
        email_verified: bool,
        consent_status: ConsentStatus,
        child_count: usize,
        is_authenticated: bool,
    ) -> Self {
        let has_consent = consent_status == ConsentStatus::Verified;
        Self {
            is_authenticated,
            has_consent,
            needs_email_verification: !email_verified,
            needs_consent: email_verified && !has_consent,
            needs_child_profile: has_consent && child_count == 0,
        }
    }

    /// Signed in with nothing left to do in onboarding.
    pub fn is_fully_onboarded(&self) -> bool {
        self.is_authenticated
            && !self.needs_email_verification
            && !self.needs_consent
            && !self.needs_child_profile
    }
}

/// Auth session events
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut,
    SessionExpired,
    UserUpdated,
    ChildrenChanged,
    ProfileSwitched { child_id: Option<String> },
}

/// Point-in-time copy of the session for views.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<ParentUser>,
    pub children: Vec<ChildProfile>,
    pub current_profile: Option<ChildProfile>,
    pub pending_email: Option<String>,
    pub flags: SessionFlags,
    pub is_loading: bool,
    pub is_initialized: bool,
}

impl AuthSnapshot {
    pub fn is_ready(&self) -> bool {
        !self.is_loading && self.is_initialized
    }
}

/// Result of a successful email verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyEmailOutcome {
    pub user: Option<ParentUser>,
    /// The verification response carried tokens and signed the parent in.
    pub signed_in: bool,
}

#[derive(Debug, Clone, Default)]
struct AuthState {
    user: Option<ParentUser>,
    children: Vec<ChildProfile>,
    current_profile_id: Option<String>,
    pending_email: Option<String>,
    is_loading: bool,
    is_initialized: bool,
}

impl AuthState {
    fn current_profile(&self) -> Option<&ChildProfile> {
        let id = self.current_profile_id.as_deref()?;
        self.children.iter().find(|c| c.id == id)
    }

    /// Keep `current_profile_id` pointing into `children`: the preferred id
    /// if it is present, else the first child, else nothing.
    fn reselect(&mut self, preferred: Option<&str>) {
        let next = preferred
            .filter(|id| self.children.iter().any(|c| c.id == *id))
            .map(str::to_string)
            .or_else(|| self.children.first().map(|c| c.id.clone()));
        self.current_profile_id = next;
    }
}

/// Parent identity, child profiles and the selected profile.
///
/// All state transitions happen inside the methods that cause them, and the
/// derived [`SessionFlags`] are recomputed on every read.
///
/// The session also owns the parent's [`ModeSession`] once one is attached,
/// and forces it back to child mode when the parent signs out or the
/// session expires.
pub struct AuthSession {
    api: ApiClient,
    tokens: Arc<TokenStore>,
    storage: StorageManager,
    options: ClientOptions,
    state: RwLock<AuthState>,
    mode: Mutex<Option<Arc<ModeSession>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthSession {
    pub fn new(api: ApiClient, storage: StorageManager, options: ClientOptions) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            tokens: api.tokens().clone(),
            api,
            storage,
            options,
            state: RwLock::new(AuthState::default()),
            mode: Mutex::new(None),
            events,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    fn set_loading(&self, loading: bool) {
        self.write().is_loading = loading;
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn lock_mode(&self) -> std::sync::MutexGuard<'_, Option<Arc<ModeSession>>> {
        self.mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The attached mode session, if it belongs to the signed-in parent.
    pub fn mode_session(&self) -> Option<Arc<ModeSession>> {
        let user_id = self.read().user.as_ref().map(|u| u.id.clone())?;
        self.lock_mode()
            .as_ref()
            .filter(|m| m.user_id() == user_id)
            .cloned()
    }

    /// Hand a mode session to this auth session. It is forced into child
    /// mode and released on sign-out.
    pub fn attach_mode_session(&self, mode: Arc<ModeSession>) {
        let previous = self.lock_mode().replace(mode.clone());
        if let Some(previous) = previous.filter(|p| !Arc::ptr_eq(p, &mode)) {
            release_mode(&previous);
        }
    }

    fn detach_mode_session(&self) {
        let mode = self.lock_mode().take();
        if let Some(mode) = mode {
            release_mode(&mode);
        }
    }

    /// Namespace of the signed-in parent.
    pub fn user_storage(&self) -> Option<ScopedStorage> {
        let state = self.read();
        let user = state.user.as_ref().filter(|u| !u.id.is_empty())?;
        Some(self.storage.for_user(&user.id))
    }

    /// Namespace of the selected child profile. Follows profile switches,
    /// child removal and sign-out.
    pub fn child_storage(&self) -> Option<ScopedStorage> {
        let id = self.read().current_profile_id.clone()?;
        Some(self.storage.for_child(&id))
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // ---- derived state -------------------------------------------------

    pub fn flags(&self) -> SessionFlags {
        let state = self.read();
        SessionFlags::derive(
            state.user.as_ref(),
            state.children.len(),
            self.tokens.has_session(),
        )
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        let state = self.read();
        AuthSnapshot {
            user: state.user.clone(),
            children: state.children.clone(),
            current_profile: state.current_profile().cloned(),
            pending_email: state.pending_email.clone(),
            flags: SessionFlags::derive(
                state.user.as_ref(),
                state.children.len(),
                self.tokens.has_session(),
            ),
            is_loading: state.is_loading,
            is_initialized: state.is_initialized,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.flags().is_authenticated
    }

    pub fn needs_email_verification(&self) -> bool {
        self.flags().needs_email_verification
    }

    pub fn needs_consent(&self) -> bool {
        self.flags().needs_consent
    }

    pub fn needs_child_profile(&self) -> bool {
        self.flags().needs_child_profile
    }

    pub fn has_consent(&self) -> bool {
        self.flags().has_consent
    }

    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    pub fn is_initialized(&self) -> bool {
        self.read().is_initialized
    }

    pub fn is_ready(&self) -> bool {
        let state = self.read();
        !state.is_loading && state.is_initialized
    }

    pub fn user(&self) -> Option<ParentUser> {
        self.read().user.clone()
    }

    pub fn children(&self) -> Vec<ChildProfile> {
        self.read().children.clone()
    }

    pub fn current_profile(&self) -> Option<ChildProfile> {
        self.read().current_profile().cloned()
    }

    pub fn pending_verification_email(&self) -> Option<String> {
        self.read().pending_email.clone()
    }

    /// Child profiles allowed by the parent's plan.
    pub fn child_limit(&self) -> usize {
        self.read()
            .user
            .as_ref()
            .map(|u| u.subscription_tier)
            .unwrap_or_default()
            .child_limit()
    }

    pub fn can_add_child(&self) -> bool {
        let limit = self.child_limit();
        self.read().children.len() < limit
    }

    // ---- account flows -------------------------------------------------

    /// Register a parent account.
    ///
    /// No session is established; the parent has to verify the email
    /// address first. Until then the session reports
    /// `needs_email_verification` without being authenticated.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<SignUpOutcome, Error> {
        let email = validation::validate_email(email)?;
        validation::validate_password(password)?;
        let first_name = validation::validate_name("first_name", first_name)?;
        let last_name = validation::validate_name("last_name", last_name)?;

        self.set_loading(true);
        let request = SignUpRequest {
            email: &email,
            password,
            first_name: &first_name,
            last_name: &last_name,
            country: &self.options.country,
        };
        let result = self
            .api
            .post_public::<_, ApiResponse<SignUpPayload>>("/auth/signup", &request)
            .await
            .and_then(ApiResponse::into_optional);

        let mut state = self.write();
        state.is_loading = false;
        let payload = result?.unwrap_or_default();

        state.user = Some(ParentUser::pending(
            payload.user_id,
            &email,
            &first_name,
            &last_name,
        ));
        state.children.clear();
        state.current_profile_id = None;
        state.pending_email = Some(email.clone());
        drop(state);

        info!("Signed up {}, awaiting email verification", email);
        Ok(SignUpOutcome {
            email,
            requires_email_verification: payload.requires_email_verification.unwrap_or(true),
        })
    }

    /// Sign in with email and password.
    ///
    /// Rejected credentials come back as [`Error::Auth`] with the server's
    /// message verbatim.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, Error> {
        let email = validation::validate_email(email)?;
        if password.is_empty() {
            return Err(Error::validation("password", "is required"));
        }

        self.set_loading(true);
        let result = self
            .api
            .post_public::<_, ApiResponse<SessionPayload>>(
                "/auth/signin",
                &json!({ "email": email, "password": password }),
            )
            .await
            .and_then(ApiResponse::into_data)
            .map_err(|e| match e {
                Error::Rejected(msg) => Error::Auth(msg),
                other => other,
            });
        self.set_loading(false);

        let outcome = self.establish_session(result?);
        info!("Signed in as {}", outcome.user.email);
        Ok(outcome)
    }

    /// Sign out.
    ///
    /// The backend is told first, best-effort; local state is cleared
    /// regardless of the outcome so a network failure never leaves the
    /// client signed in.
    pub async fn sign_out(&self) {
        if let Some(refresh_token) = self.tokens.refresh_token() {
            if let Err(e) = self
                .api
                .post_once("/auth/signout", &json!({ "refreshToken": refresh_token }))
                .await
            {
                warn!("Backend sign-out failed, clearing locally anyway: {}", e);
            }
        }
        self.clear_local_session();
        info!("Signed out");
        self.emit(AuthEvent::SignedOut);
    }

    /// Confirm the email address with the emailed code.
    ///
    /// When the response carries a session it is applied directly, so no
    /// follow-up sign-in is needed.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<VerifyEmailOutcome, Error> {
        let email = validation::validate_email(email)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::validation("code", "is required"));
        }

        self.set_loading(true);
        let result = self
            .api
            .post_public::<_, ApiResponse<serde_json::Value>>(
                "/auth/verify-email",
                &json!({ "email": email, "code": code }),
            )
            .await
            .and_then(ApiResponse::into_optional);
        self.set_loading(false);

        let session = result?
            .filter(|data| data.get("user").is_some() || data.get("parent").is_some())
            .map(serde_json::from_value::<SessionPayload>)
            .transpose()?;

        let outcome = match session {
            Some(payload) => {
                let outcome = self.establish_session(payload);
                VerifyEmailOutcome {
                    user: Some(outcome.user),
                    signed_in: self.tokens.has_session(),
                }
            }
            None => {
                let mut state = self.write();
                if let Some(user) = state.user.as_mut() {
                    user.email_verified = true;
                }
                state.pending_email = None;
                let user = state.user.clone();
                drop(state);
                self.emit(AuthEvent::UserUpdated);
                VerifyEmailOutcome {
                    user,
                    signed_in: false,
                }
            }
        };

        info!("Email {} verified", email);
        Ok(outcome)
    }

    /// Send the verification code again.
    pub async fn resend_verification(&self, email: &str) -> Result<(), Error> {
        let email = validation::validate_email(email)?;
        self.api
            .post_public::<_, ApiResponse<serde_json::Value>>(
                "/auth/resend-verification",
                &json!({ "email": email }),
            )
            .await?
            .into_unit()
    }

    /// Restore a persisted session on startup.
    ///
    /// With a stored refresh token the user and children are loaded from
    /// `/auth/me`, refreshing on the way. A rejected session is cleared.
    /// Connectivity failures keep the tokens so the caller can retry.
    /// `is_initialized` is set in every case.
    pub async fn initialize(&self) -> Result<(), Error> {
        if self.is_initialized() {
            return Ok(());
        }
        self.set_loading(true);

        let result = if self.tokens.has_session() {
            match self.fetch_me().await {
                Ok(payload) => {
                    self.apply_me(payload);
                    Ok(())
                }
                Err(e @ (Error::SessionExpired | Error::Auth(_))) => {
                    info!("Stored session rejected, starting signed out: {}", e);
                    self.clear_local_session();
                    Ok(())
                }
                Err(e) => {
                    warn!("Could not restore session: {}", e);
                    Err(e)
                }
            }
        } else {
            debug!("No stored session");
            Ok(())
        };

        let mut state = self.write();
        state.is_loading = false;
        state.is_initialized = true;
        result
    }

    /// Reload the parent and children from `/auth/me`.
    pub async fn refresh_user(&self) -> Result<ParentUser, Error> {
        let payload = self.guard(self.fetch_me().await)?;
        let user = payload.user.clone();
        self.apply_me(payload);
        Ok(user)
    }

    async fn fetch_me(&self) -> Result<SessionPayload, Error> {
        self.api
            .get::<ApiResponse<SessionPayload>>("/auth/me")
            .await?
            .into_data()
    }

    /// Pass `result` through, turning a dead session into a forced sign-out.
    pub(crate) fn guard<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(Error::SessionExpired) = &result {
            warn!("Session expired, signing out locally");
            self.clear_local_session();
            self.emit(AuthEvent::SessionExpired);
        }
        result
    }

    fn establish_session(&self, payload: SessionPayload) -> SignInOutcome {
        // A child token from an earlier session must not leak into this one.
        self.tokens.clear_child_token();
        if payload.token.is_some() || payload.refresh_token.is_some() {
            self.tokens.set_tokens(TokenUpdate {
                access_token: payload.token,
                refresh_token: payload.refresh_token,
                child_token: None,
            });
        }

        let persisted = self.storage.get(keys::CURRENT_PROFILE_ID);
        let user = payload.user;
        let stale_mode = self
            .lock_mode()
            .as_ref()
            .map_or(false, |m| m.user_id() != user.id);
        if stale_mode {
            self.detach_mode_session();
        }
        let mut state = self.write();
        state.user = Some(user.clone());
        state.children = payload.children;
        state.pending_email = None;
        state.is_initialized = true;
        state.reselect(persisted.as_deref());
        let current = state.current_profile_id.clone();
        let children = state.children.clone();
        drop(state);

        self.persist_current_profile(current.as_deref());
        if let Err(e) = self
            .storage
            .for_user(&user.id)
            .set("last_sign_in", &Utc::now().to_rfc3339())
        {
            warn!("Failed to initialize storage for user {}: {}", user.id, e);
        }

        self.emit(AuthEvent::SignedIn {
            user_id: user.id.clone(),
        });
        SignInOutcome { user, children }
    }

    fn apply_me(&self, payload: SessionPayload) {
        let persisted = self.storage.get(keys::CURRENT_PROFILE_ID);
        let mut state = self.write();
        let keep = state.current_profile_id.clone().or(persisted);
        state.user = Some(payload.user);
        state.children = payload.children;
        state.reselect(keep.as_deref());
        let current = state.current_profile_id.clone();
        drop(state);

        self.persist_current_profile(current.as_deref());
        self.emit(AuthEvent::UserUpdated);
    }

    /// Drop tokens, per-user storage, the mode session and in-memory state.
    fn clear_local_session(&self) {
        self.tokens.clear_all();
        self.detach_mode_session();

        let mut state = self.write();
        let user_id = state.user.as_ref().map(|u| u.id.clone());
        let child_ids: Vec<String> = state.children.iter().map(|c| c.id.clone()).collect();
        let initialized = state.is_initialized;
        *state = AuthState {
            is_initialized: initialized,
            ..AuthState::default()
        };
        drop(state);

        if let Some(user_id) = user_id.filter(|id| !id.is_empty()) {
            if let Err(e) = self.storage.clear_user(&user_id) {
                warn!("Failed to clear storage for user {}: {}", user_id, e);
            }
        }
        for child_id in child_ids {
            if let Err(e) = self.storage.clear_child(&child_id) {
                warn!("Failed to clear storage for child {}: {}", child_id, e);
            }
        }
        if let Err(e) = self.storage.remove(keys::CURRENT_PROFILE_ID) {
            warn!("Failed to clear selected profile: {}", e);
        }
    }

    fn persist_current_profile(&self, child_id: Option<&str>) {
        if let Err(e) = self.storage.put_optional(keys::CURRENT_PROFILE_ID, child_id) {
            warn!("Failed to persist selected profile: {}", e);
        }
    }

    // ---- child profiles ------------------------------------------------

    /// Select a child profile. Unknown ids are ignored and return `false`.
    pub fn switch_profile(&self, child_id: &str) -> bool {
        let mut state = self.write();
        if !state.children.iter().any(|c| c.id == child_id) {
            debug!("Ignoring switch to unknown profile {}", child_id);
            return false;
        }
        if state.current_profile_id.as_deref() == Some(child_id) {
            return true;
        }
        state.current_profile_id = Some(child_id.to_string());
        drop(state);

        self.persist_current_profile(Some(child_id));
        if let Some(scoped) = self.child_storage() {
            debug!("Child storage now scoped to {}", scoped.prefix());
        }
        self.emit(AuthEvent::ProfileSwitched {
            child_id: Some(child_id.to_string()),
        });
        true
    }

    /// Mirror a child profile the server already created, replacing a
    /// profile with the same id in place. The first child becomes the
    /// current profile.
    pub fn add_child_profile(&self, profile: ChildProfile) -> ChildProfile {
        let mut state = self.write();
        match state.children.iter_mut().find(|c| c.id == profile.id) {
            Some(existing) => *existing = profile.clone(),
            None => state.children.push(profile.clone()),
        }
        let became_current = state.current_profile_id.is_none();
        if became_current {
            state.current_profile_id = Some(profile.id.clone());
        }
        drop(state);

        self.emit(AuthEvent::ChildrenChanged);
        if became_current {
            self.persist_current_profile(Some(&profile.id));
            self.emit(AuthEvent::ProfileSwitched {
                child_id: Some(profile.id.clone()),
            });
        }
        profile
    }

    /// Merge `patch` into a mirrored child profile.
    pub fn update_child_profile(&self, id: &str, patch: &ChildProfilePatch) -> Option<ChildProfile> {
        let mut state = self.write();
        let child = state.children.iter_mut().find(|c| c.id == id)?;
        patch.apply(child);
        let updated = child.clone();
        drop(state);

        self.emit(AuthEvent::ChildrenChanged);
        Some(updated)
    }

    /// Remove a mirrored child profile, wipe its storage namespace and
    /// fall back to the first remaining profile if it was current.
    pub fn remove_child_profile(&self, id: &str) -> bool {
        let mut state = self.write();
        let before = state.children.len();
        state.children.retain(|c| c.id != id);
        if state.children.len() == before {
            return false;
        }
        let was_current = state.current_profile_id.as_deref() == Some(id);
        if was_current {
            state.reselect(None);
        }
        let current = state.current_profile_id.clone();
        drop(state);

        if let Err(e) = self.storage.clear_child(id) {
            warn!("Failed to clear storage for child {}: {}", id, e);
        }
        self.emit(AuthEvent::ChildrenChanged);
        if was_current {
            // The child token was scoped to the removed profile.
            self.tokens.clear_child_token();
            self.persist_current_profile(current.as_deref());
            self.emit(AuthEvent::ProfileSwitched { child_id: current });
        }
        true
    }

    /// Replace the mirrored children with a fresh listing.
    pub fn replace_children(&self, children: Vec<ChildProfile>) {
        let mut state = self.write();
        let keep = state.current_profile_id.clone();
        let removed: Vec<String> = state
            .children
            .iter()
            .filter(|old| !children.iter().any(|c| c.id == old.id))
            .map(|c| c.id.clone())
            .collect();
        state.children = children;
        state.reselect(keep.as_deref());
        let current = state.current_profile_id.clone();
        drop(state);

        for id in removed {
            if let Err(e) = self.storage.clear_child(&id) {
                warn!("Failed to clear storage for child {}: {}", id, e);
            }
        }
        if current != keep {
            self.persist_current_profile(current.as_deref());
            self.emit(AuthEvent::ProfileSwitched { child_id: current });
        }
        self.emit(AuthEvent::ChildrenChanged);
    }

    // ---- consent -------------------------------------------------------

    pub fn set_consent_status(&self, status: ConsentStatus) {
        let mut state = self.write();
        let Some(user) = state.user.as_mut() else {
            return;
        };
        if user.consent_status == status {
            return;
        }
        user.consent_status = status;
        drop(state);
        self.emit(AuthEvent::UserUpdated);
    }

    pub fn mark_consent_verified(&self) {
        self.set_consent_status(ConsentStatus::Verified);
    }
}

fn release_mode(mode: &ModeSession) {
    mode.end();
    debug!("Released mode session for user {}", mode.user_id());
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("AuthSession")
            .field("user", &state.user.as_ref().map(|u| &u.id))
            .field("children", &state.children.len())
            .field("current_profile_id", &state.current_profile_id)
            .field("tokens", &self.tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email_verified: bool, consent: ConsentStatus) -> ParentUser {
        ParentUser {
            id: "p1".to_string(),
            email: "bob@x.com".to_string(),
            first_name: None,
            last_name: None,
            email_verified,
            consent_status: consent,
            subscription_tier: SubscriptionTier::Free,
        }
    }

    #[test]
    fn test_no_user_means_no_flags() {
        assert_eq!(SessionFlags::derive(None, 0, true), SessionFlags::default());
    }

    #[test]
    fn test_flags_follow_onboarding_order() {
        let unverified = user(false, ConsentStatus::Unverified);
        let flags = SessionFlags::derive(Some(&unverified), 0, false);
        assert!(flags.needs_email_verification);
        assert!(!flags.needs_consent);
        assert!(!flags.is_authenticated);

        let verified = user(true, ConsentStatus::Pending);
        let flags = SessionFlags::derive(Some(&verified), 0, true);
        assert!(!flags.needs_email_verification);
        assert!(flags.needs_consent);
        assert!(!flags.needs_child_profile);

        let consented = user(true, ConsentStatus::Verified);
        let flags = SessionFlags::derive(Some(&consented), 0, true);
        assert!(flags.has_consent);
        assert!(flags.needs_child_profile);
        assert!(!flags.is_fully_onboarded());

        let flags = SessionFlags::derive(Some(&consented), 2, true);
        assert!(flags.is_fully_onboarded());
    }

    #[test]
    fn test_flags_are_pure() {
        for verified in [false, true] {
            for consent in [
                ConsentStatus::Unverified,
                ConsentStatus::Pending,
                ConsentStatus::Verified,
            ] {
                for count in 0..3 {
                    let u = user(verified, consent);
                    let first = SessionFlags::derive(Some(&u), count, true);
                    let second = SessionFlags::derive(Some(&u), count, true);
                    assert_eq!(first, second);
                    assert_eq!(u, user(verified, consent));
                    assert_eq!(first, SessionFlags::from_parts(verified, consent, count, true));
                }
            }
        }
    }

    #[test]
    fn test_reselect_prefers_then_falls_back() {
        let child = |id: &str| ChildProfile {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            age: None,
            grade: None,
            avatar_id: None,
            learning_style: None,
            curriculum_type: None,
        };
        let mut state = AuthState {
            children: vec![child("a"), child("b")],
            ..Default::default()
        };
        state.reselect(Some("b"));
        assert_eq!(state.current_profile_id.as_deref(), Some("b"));
        state.reselect(Some("zzz"));
        assert_eq!(state.current_profile_id.as_deref(), Some("a"));
        state.children.clear();
        state.reselect(Some("a"));
        assert_eq!(state.current_profile_id, None);
    }
}
