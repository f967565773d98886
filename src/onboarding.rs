//! Onboarding step sequencer.
//!
//! The step is re-derived from [`SessionFlags`] in priority order each time
//! the session changes, with two exceptions: a consent sub-step the parent
//! is in the middle of stays put, and `welcome` is only reached by an
//! explicit [`OnboardingFlow::complete`] and then never left.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::auth::SessionFlags;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    #[serde(rename = "signup")]
    SignUp,
    #[serde(rename = "signin")]
    SignIn,
    EmailVerification,
    ConsentMethod,
    CreditCard,
    Kbq,
    CreateProfile,
    Welcome,
}

impl OnboardingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignUp => "signup",
            Self::SignIn => "signin",
            Self::EmailVerification => "email_verification",
            Self::ConsentMethod => "consent_method",
            Self::CreditCard => "credit_card",
            Self::Kbq => "kbq",
            Self::CreateProfile => "create_profile",
            Self::Welcome => "welcome",
        }
    }

    fn is_entry(&self) -> bool {
        matches!(self, Self::SignUp | Self::SignIn)
    }

    fn is_consent_sub_step(&self) -> bool {
        matches!(self, Self::CreditCard | Self::Kbq)
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnboardingStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let step = match s {
            "signup" => Self::SignUp,
            "signin" => Self::SignIn,
            "email_verification" => Self::EmailVerification,
            "consent_method" => Self::ConsentMethod,
            "credit_card" => Self::CreditCard,
            "kbq" => Self::Kbq,
            "create_profile" => Self::CreateProfile,
            "welcome" => Self::Welcome,
            other => return Err(Error::validation("step", format!("unknown step {}", other))),
        };
        Ok(step)
    }
}

/// Which way the last transition went. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentMethod {
    CreditCard,
    Kbq,
}

impl ConsentMethod {
    fn step(&self) -> OnboardingStep {
        match self {
            Self::CreditCard => OnboardingStep::CreditCard,
            Self::Kbq => OnboardingStep::Kbq,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    step: OnboardingStep,
    direction: Direction,
    consent_method: Option<ConsentMethod>,
    completed: bool,
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingFlow {
    pub fn new() -> Self {
        Self::starting_at(OnboardingStep::SignUp)
    }

    /// Start at a requested step, e.g. from a `?step=` redirect. The next
    /// [`Self::sync`] corrects it if the session disagrees.
    pub fn starting_at(step: OnboardingStep) -> Self {
        Self {
            step,
            direction: Direction::Forward,
            consent_method: step.is_consent_sub_step().then(|| match step {
                OnboardingStep::Kbq => ConsentMethod::Kbq,
                _ => ConsentMethod::CreditCard,
            }),
            completed: step == OnboardingStep::Welcome,
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn consent_method(&self) -> Option<ConsentMethod> {
        self.consent_method
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    fn go(&mut self, next: OnboardingStep) {
        if next == self.step {
            return;
        }
        self.direction = if next > self.step {
            Direction::Forward
        } else {
            Direction::Backward
        };
        debug!("Onboarding {} -> {} ({:?})", self.step, next, self.direction);
        self.step = next;
    }

    /// The step the session calls for, ignoring local overrides.
    pub fn derive_step(flags: &SessionFlags, has_pending_email: bool) -> Option<OnboardingStep> {
        if flags.needs_email_verification || (has_pending_email && !flags.is_authenticated) {
            Some(OnboardingStep::EmailVerification)
        } else if !flags.is_authenticated {
            None
        } else if flags.needs_consent {
            Some(OnboardingStep::ConsentMethod)
        } else if flags.needs_child_profile {
            Some(OnboardingStep::CreateProfile)
        } else {
            None
        }
    }

    /// Re-derive the step from the session and return it.
    pub fn sync(&mut self, flags: &SessionFlags, has_pending_email: bool) -> OnboardingStep {
        if self.completed {
            return self.step;
        }

        let next = match Self::derive_step(flags, has_pending_email) {
            Some(OnboardingStep::ConsentMethod) => match self.consent_method {
                Some(method) => method.step(),
                None => OnboardingStep::ConsentMethod,
            },
            Some(step) => step,
            None if !flags.is_authenticated => {
                if self.step.is_entry() {
                    self.step
                } else {
                    OnboardingStep::SignUp
                }
            }
            // Fully onboarded: stay where we are so the caller can either
            // show `welcome` or leave.
            None => self.step,
        };

        if !next.is_consent_sub_step() {
            self.consent_method = None;
        }
        self.go(next);
        self.step
    }

    /// Switch between the sign-up and sign-in forms.
    pub fn show_sign_in(&mut self) -> bool {
        if !self.step.is_entry() {
            return false;
        }
        self.go(OnboardingStep::SignIn);
        true
    }

    pub fn show_sign_up(&mut self) -> bool {
        if !self.step.is_entry() {
            return false;
        }
        self.go(OnboardingStep::SignUp);
        true
    }

    /// Pick a consent method. Only valid on the method chooser.
    pub fn choose_consent_method(&mut self, method: ConsentMethod) -> bool {
        if self.step != OnboardingStep::ConsentMethod {
            return false;
        }
        self.consent_method = Some(method);
        self.go(method.step());
        true
    }

    /// Step back where that makes sense: from a consent sub-step to the
    /// method chooser, or from sign-in to sign-up.
    pub fn back(&mut self) -> bool {
        match self.step {
            OnboardingStep::CreditCard | OnboardingStep::Kbq => {
                self.consent_method = None;
                self.go(OnboardingStep::ConsentMethod);
                true
            }
            OnboardingStep::SignIn => {
                self.go(OnboardingStep::SignUp);
                true
            }
            _ => false,
        }
    }

    /// Move on to `welcome` once nothing is left to do.
    pub fn complete(&mut self, flags: &SessionFlags) -> bool {
        if self.completed {
            return true;
        }
        if !flags.is_fully_onboarded() {
            return false;
        }
        self.consent_method = None;
        self.go(OnboardingStep::Welcome);
        self.completed = true;
        true
    }

    /// True when a fully onboarded parent landed here without going
    /// through the last step, and should be sent to the app.
    pub fn should_exit(&self, flags: &SessionFlags) -> bool {
        flags.is_fully_onboarded()
            && !matches!(
                self.step,
                OnboardingStep::CreateProfile | OnboardingStep::Welcome
            )
    }
}
