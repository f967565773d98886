//! Child profile CRUD, mirrored into the session.

use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{
    ApiResponse, AuthSession, ChildProfile, ChildProfilePatch, NewChildProfile, TokenUpdate,
};
use crate::error::Error;
use crate::validation;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectPayload {
    #[serde(alias = "childToken", alias = "accessToken")]
    token: String,

    #[serde(default, alias = "child")]
    profile: Option<ChildProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChildrenPayload {
    List(Vec<ChildProfile>),
    Wrapped { children: Vec<ChildProfile> },
}

impl ChildrenPayload {
    fn into_vec(self) -> Vec<ChildProfile> {
        match self {
            Self::List(children) | Self::Wrapped { children } => children,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChildPayload {
    Wrapped { child: ChildProfile },
    Bare(ChildProfile),
}

impl ChildPayload {
    fn into_child(self) -> ChildProfile {
        match self {
            Self::Wrapped { child } | Self::Bare(child) => child,
        }
    }
}

fn child_path(id: &str) -> String {
    format!("/profiles/children/{}", urlencoding::encode(id))
}

/// `/profiles/children` endpoints.
#[derive(Debug, Clone)]
pub struct ProfilesClient {
    session: Arc<AuthSession>,
}

impl ProfilesClient {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    /// Fetch all child profiles and replace the mirrored list.
    pub async fn list(&self) -> Result<Vec<ChildProfile>, Error> {
        let children = self
            .session
            .guard(
                self.session
                    .api()
                    .get::<ApiResponse<ChildrenPayload>>("/profiles/children")
                    .await
                    .and_then(ApiResponse::into_data),
            )?
            .into_vec();
        self.session.replace_children(children.clone());
        Ok(children)
    }

    /// Create a child profile. Refused locally when the plan is full.
    pub async fn create(&self, profile: &NewChildProfile) -> Result<ChildProfile, Error> {
        let display_name = validation::validate_name("display_name", &profile.display_name)?;
        if !self.session.can_add_child() {
            return Err(Error::validation(
                "children",
                format!(
                    "your plan allows {} child profile(s)",
                    self.session.child_limit()
                ),
            ));
        }

        let body = NewChildProfile {
            display_name,
            ..profile.clone()
        };
        let created = self
            .session
            .guard(
                self.session
                    .api()
                    .post::<_, ApiResponse<ChildPayload>>("/profiles/children", &body)
                    .await
                    .and_then(ApiResponse::into_data),
            )?
            .into_child();

        info!("Created child profile {}", created.id);
        Ok(self.session.add_child_profile(created))
    }

    /// Patch a child profile. The server's copy wins when it sends one.
    pub async fn update(&self, id: &str, patch: &ChildProfilePatch) -> Result<ChildProfile, Error> {
        if patch.is_empty() {
            return self
                .session
                .children()
                .into_iter()
                .find(|c| c.id == id)
                .ok_or_else(|| Error::validation("id", format!("unknown child profile {}", id)));
        }
        if let Some(name) = &patch.display_name {
            validation::validate_name("display_name", name)?;
        }

        let returned = self.session.guard(
            self.session
                .api()
                .patch::<_, ApiResponse<ChildPayload>>(&child_path(id), patch)
                .await
                .and_then(ApiResponse::into_optional),
        )?;

        let updated = match returned {
            Some(payload) => self.session.add_child_profile(payload.into_child()),
            None => self
                .session
                .update_child_profile(id, patch)
                .ok_or_else(|| Error::validation("id", format!("unknown child profile {}", id)))?,
        };
        Ok(updated)
    }

    /// Delete a child profile and its local data.
    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        self.session.guard(
            self.session
                .api()
                .delete::<ApiResponse<serde_json::Value>>(&child_path(id))
                .await
                .and_then(ApiResponse::into_unit),
        )?;
        self.session.remove_child_profile(id);
        info!("Deleted child profile {}", id);
        Ok(())
    }

    /// Enter a child's scope: switch the current profile and install the
    /// child-scoped token for subsequent calls.
    pub async fn select(&self, id: &str) -> Result<ChildProfile, Error> {
        if !self.session.children().iter().any(|c| c.id == id) {
            return Err(Error::validation("id", format!("unknown child profile {}", id)));
        }

        // Ask for the child token with parent credentials.
        self.session.tokens().clear_child_token();
        let payload = self.session.guard(
            self.session
                .api()
                .post::<_, ApiResponse<SelectPayload>>(
                    &format!("{}/select", child_path(id)),
                    &json!({}),
                )
                .await
                .and_then(ApiResponse::into_data),
        )?;

        self.session.tokens().set_tokens(TokenUpdate::child(payload.token));
        if let Some(profile) = payload.profile {
            self.session.add_child_profile(profile);
        }
        self.session.switch_profile(id);
        debug!("Child token installed for {}", id);

        self.session
            .current_profile()
            .ok_or_else(|| Error::general("Selected profile disappeared"))
    }

    /// Leave child scope and go back to parent credentials.
    pub fn deselect(&self) {
        self.session.tokens().clear_child_token();
    }
}
