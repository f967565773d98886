//! Route guards: pure render-or-redirect decisions over session state.

use orbit_learn_mode::Mode;
use serde::Serialize;

use crate::auth::{ConsentStatus, SessionFlags};
use crate::onboarding::OnboardingStep;

/// Everything a guard looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardContext {
    pub is_authenticated: bool,
    pub email_verified: bool,
    pub consent_status: ConsentStatus,
    pub child_count: usize,
    pub current_mode: Mode,
    pub has_active_profile: bool,
}

impl Default for GuardContext {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            email_verified: false,
            consent_status: ConsentStatus::Unverified,
            child_count: 0,
            current_mode: Mode::Child,
            has_active_profile: false,
        }
    }
}

impl GuardContext {
    fn has_consent(&self) -> bool {
        self.consent_status == ConsentStatus::Verified
    }

    /// The first onboarding step still open, in priority order.
    pub fn incomplete_step(&self) -> Option<OnboardingStep> {
        if !self.email_verified {
            Some(OnboardingStep::EmailVerification)
        } else if !self.has_consent() {
            Some(OnboardingStep::ConsentMethod)
        } else if self.child_count == 0 {
            Some(OnboardingStep::CreateProfile)
        } else {
            None
        }
    }

    pub fn is_fully_onboarded(&self) -> bool {
        self.is_authenticated && self.incomplete_step().is_none()
    }

    pub fn flags(&self) -> SessionFlags {
        SessionFlags::from_parts(
            self.email_verified,
            self.consent_status,
            self.child_count,
            self.is_authenticated,
        )
    }
}

/// Where a redirect goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "step", rename_all = "snake_case")]
pub enum RouteTarget {
    /// Onboarding, optionally at a specific step
    Onboarding(Option<OnboardingStep>),
    /// The signed-in landing page
    App,
    /// Parent PIN entry
    PinVerification,
    /// Picking which child is learning
    ProfileSelect,
}

impl RouteTarget {
    pub fn path(&self) -> String {
        match self {
            Self::Onboarding(None) => "/onboarding".to_string(),
            Self::Onboarding(Some(step)) => format!("/onboarding?step={}", step.as_str()),
            Self::App => "/dashboard".to_string(),
            Self::PinVerification => "/verify-pin".to_string(),
            Self::ProfileSelect => "/select-profile".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub to: RouteTarget,
    /// Path to come back to once the redirect target is satisfied.
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RouteDecision {
    Render,
    Redirect(Redirect),
}

impl RouteDecision {
    fn redirect(to: RouteTarget, return_to: Option<&str>) -> Self {
        Self::Redirect(Redirect {
            to,
            return_to: return_to.map(str::to_string),
        })
    }

    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }

    pub fn redirect_target(&self) -> Option<&RouteTarget> {
        match self {
            Self::Render => None,
            Self::Redirect(r) => Some(&r.to),
        }
    }
}

/// Pages that need a signed-in, fully onboarded parent.
pub fn protected_route(ctx: &GuardContext, path: &str) -> RouteDecision {
    if !ctx.is_authenticated {
        return RouteDecision::redirect(RouteTarget::Onboarding(None), Some(path));
    }
    match ctx.incomplete_step() {
        Some(step) => RouteDecision::redirect(RouteTarget::Onboarding(Some(step)), None),
        None => RouteDecision::Render,
    }
}

/// Pages for signed-out visitors only, such as landing and sign-in.
pub fn public_only_route(ctx: &GuardContext) -> RouteDecision {
    if !ctx.is_authenticated {
        return RouteDecision::Render;
    }
    match ctx.incomplete_step() {
        Some(step) => RouteDecision::redirect(RouteTarget::Onboarding(Some(step)), None),
        None => RouteDecision::redirect(RouteTarget::App, None),
    }
}

/// [`protected_route`] plus a mode requirement.
///
/// With `require_consent` off, a signed-in parent still in onboarding is let
/// through to the mode check instead of being sent back to onboarding.
pub fn mode_route(ctx: &GuardContext, mode: Mode, require_consent: bool, path: &str) -> RouteDecision {
    if !ctx.is_authenticated {
        return RouteDecision::redirect(RouteTarget::Onboarding(None), Some(path));
    }
    if require_consent {
        if let Some(step) = ctx.incomplete_step() {
            return RouteDecision::redirect(RouteTarget::Onboarding(Some(step)), None);
        }
    }
    if mode == Mode::Parent && ctx.current_mode != Mode::Parent {
        return RouteDecision::redirect(RouteTarget::PinVerification, Some(path));
    }
    RouteDecision::Render
}

/// Shell around the child learning pages: a protected route that also
/// needs a selected child profile.
pub fn protected_child_layout(ctx: &GuardContext, path: &str) -> RouteDecision {
    match protected_route(ctx, path) {
        RouteDecision::Render if !ctx.has_active_profile => {
            RouteDecision::redirect(RouteTarget::ProfileSelect, Some(path))
        }
        decision => decision,
    }
}
