//! Types for authentication, parent accounts and child profiles

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Parental consent state of a parent account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    Unverified,
    Pending,
    Verified,
}

impl Default for ConsentStatus {
    fn default() -> Self {
        ConsentStatus::Unverified
    }
}

/// Subscription plan of a parent account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Family,
    FamilyPlus,
    Annual,
}

impl Default for SubscriptionTier {
    fn default() -> Self {
        SubscriptionTier::Free
    }
}

impl SubscriptionTier {
    /// Number of child profiles the plan allows.
    pub fn child_limit(&self) -> usize {
        match self {
            Self::Free => 1,
            Self::Family | Self::Annual => 2,
            Self::FamilyPlus => 4,
        }
    }
}

/// The signed-in parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentUser {
    pub id: String,

    pub email: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(default)]
    pub consent_status: ConsentStatus,

    #[serde(default)]
    pub subscription_tier: SubscriptionTier,
}

impl ParentUser {
    /// Placeholder for an account that has signed up but not verified its
    /// email yet. It carries no tokens.
    pub fn pending(id: Option<String>, email: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            id: id.unwrap_or_default(),
            email: email.to_string(),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            email_verified: false,
            consent_status: ConsentStatus::Unverified,
            subscription_tier: SubscriptionTier::Free,
        }
    }

    pub fn has_consent(&self) -> bool {
        self.consent_status == ConsentStatus::Verified
    }
}

/// A child learner profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
    pub id: String,

    pub display_name: String,

    #[serde(default)]
    pub age: Option<u8>,

    #[serde(default)]
    pub grade: Option<String>,

    #[serde(default)]
    pub avatar_id: Option<String>,

    #[serde(default)]
    pub learning_style: Option<String>,

    #[serde(default)]
    pub curriculum_type: Option<String>,
}

/// Fields for creating a child profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChildProfile {
    pub display_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub curriculum_type: Option<String>,
}

/// Merge-patch for a child profile. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub curriculum_type: Option<String>,
}

impl ChildProfilePatch {
    pub fn apply(&self, profile: &mut ChildProfile) {
        if let Some(v) = &self.display_name {
            profile.display_name = v.clone();
        }
        if let Some(v) = self.age {
            profile.age = Some(v);
        }
        if let Some(v) = &self.grade {
            profile.grade = Some(v.clone());
        }
        if let Some(v) = &self.avatar_id {
            profile.avatar_id = Some(v.clone());
        }
        if let Some(v) = &self.learning_style {
            profile.learning_style = Some(v.clone());
        }
        if let Some(v) = &self.curriculum_type {
            profile.curriculum_type = Some(v.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Response envelope used by every endpoint:
/// `{"success": bool, "data": ..., "error": "..."}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: Option<bool>,

    #[serde(default = "Option::default")]
    pub data: Option<T>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// The payload, or an error carrying the server's text.
    pub fn into_data(self) -> Result<T, Error> {
        if self.success == Some(false) {
            return Err(Error::Rejected(self.failure_text()));
        }
        let text = self.failure_text();
        self.data.ok_or_else(|| Error::general(format!("Response had no data: {}", text)))
    }

    /// Check `success` only; for endpoints whose payload does not matter.
    pub fn into_unit(self) -> Result<(), Error> {
        if self.success == Some(false) {
            return Err(Error::Rejected(self.failure_text()));
        }
        Ok(())
    }

    /// Like [`Self::into_data`] but a missing payload is not an error.
    pub fn into_optional(self) -> Result<Option<T>, Error> {
        if self.success == Some(false) {
            return Err(Error::Rejected(self.failure_text()));
        }
        Ok(self.data)
    }

    fn failure_text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Request failed".to_string())
    }
}

/// Sign-up request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub country: &'a str,
}

/// Payload returned by sign-up
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpPayload {
    #[serde(default, alias = "id")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub requires_email_verification: Option<bool>,
}

/// Result of a successful sign-up
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub email: String,
    pub requires_email_verification: bool,
}

/// Payload carried by sign-in, email verification and `/auth/me`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(alias = "parent")]
    pub user: ParentUser,

    #[serde(default)]
    pub children: Vec<ChildProfile>,

    #[serde(default, alias = "accessToken")]
    pub token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Result of a successful sign-in or email verification
#[derive(Debug, Clone, PartialEq)]
pub struct SignInOutcome {
    pub user: ParentUser,
    pub children: Vec<ChildProfile>,
}

/// Access and refresh token pair returned by `/auth/refresh`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    #[serde(alias = "accessToken")]
    pub token: String,

    pub refresh_token: String,
}
