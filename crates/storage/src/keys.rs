//! Well-known global keys.
//!
//! Everything that is not scoped to a user or child lives under one of these.

/// Id of the child profile the parent last selected.
pub const CURRENT_PROFILE_ID: &str = "current_profile_id";

/// Rotating refresh token. Replaced on every successful refresh. Lives in
/// the credential store, never in the plain store.
pub const REFRESH_TOKEN: &str = "refresh_token";

/// Child-scoped access token, kept so a reload stays in the child's scope.
/// Credential store only.
pub const CHILD_TOKEN: &str = "child_token";

/// Keys that belong in the credential store.
pub const SECRET_KEYS: [&str; 2] = [REFRESH_TOKEN, CHILD_TOKEN];

pub fn is_secret(key: &str) -> bool {
    SECRET_KEYS.contains(&key)
}

/// Stored parent PIN for a user.
pub fn parent_pin(user_id: &str) -> String {
    format!("parent_pin_{}", user_id)
}

/// Whether inactivity auto-switch is enabled for a user.
pub fn auto_switch(user_id: &str) -> String {
    format!("auto_switch_{}", user_id)
}

/// Consecutive wrong PIN entries for a user.
pub fn pin_attempts(user_id: &str) -> String {
    format!("pin_attempts_{}", user_id)
}

/// End of the current PIN lockout for a user, RFC 3339.
pub fn pin_locked_until(user_id: &str) -> String {
    format!("pin_locked_until_{}", user_id)
}
