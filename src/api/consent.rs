//! Verifiable parental consent (COPPA) by card check or knowledge questions.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{ApiResponse, AuthSession, ConsentStatus};
use crate::error::Error;

/// Client secret for the card-check payment intent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardConsentIntent {
    pub client_secret: String,

    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

/// A knowledge-based question
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbqQuestion {
    pub id: String,
    pub question: String,

    #[serde(default)]
    pub options: Vec<String>,
}

/// Answer to a [`KbqQuestion`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KbqAnswer {
    pub question_id: String,
    pub answer: String,
}

impl KbqAnswer {
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
        }
    }
}

/// Outcome of a knowledge-based check
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbqResult {
    #[serde(default)]
    pub verified: bool,

    #[serde(default)]
    pub attempts_remaining: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsentStatusPayload {
    #[serde(alias = "consentStatus")]
    status: ConsentStatus,
}

#[derive(Debug, Deserialize)]
struct KbqQuestionsPayload {
    questions: Vec<KbqQuestion>,
}

/// Consent endpoints. A successful verification is mirrored into the
/// session so the onboarding flags move on without a reload.
#[derive(Debug, Clone)]
pub struct ConsentClient {
    session: Arc<AuthSession>,
}

impl ConsentClient {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    /// Current consent status, mirrored into the session.
    pub async fn consent_status(&self) -> Result<ConsentStatus, Error> {
        let payload = self.session.guard(
            self.session
                .api()
                .get::<ApiResponse<ConsentStatusPayload>>("/auth/consent/status")
                .await
                .and_then(ApiResponse::into_data),
        )?;
        self.session.set_consent_status(payload.status);
        Ok(payload.status)
    }

    /// Start a card check. The returned secret confirms the payment
    /// intent with the payment provider.
    pub async fn initiate_card_consent(&self) -> Result<CardConsentIntent, Error> {
        let intent = self.session.guard(
            self.session
                .api()
                .post::<_, ApiResponse<CardConsentIntent>>(
                    "/auth/consent/credit-card/initiate",
                    &json!({}),
                )
                .await
                .and_then(ApiResponse::into_data),
        )?;
        self.session.set_consent_status(ConsentStatus::Pending);
        Ok(intent)
    }

    /// Finish a card check once the provider confirmed the payment intent.
    pub async fn confirm_card_consent(&self, payment_intent_id: &str) -> Result<(), Error> {
        if payment_intent_id.trim().is_empty() {
            return Err(Error::validation("payment_intent_id", "is required"));
        }
        self.session.guard(
            self.session
                .api()
                .post::<_, ApiResponse<serde_json::Value>>(
                    "/auth/consent/credit-card/verify",
                    &json!({ "paymentIntentId": payment_intent_id }),
                )
                .await
                .and_then(ApiResponse::into_unit),
        )?;
        self.session.mark_consent_verified();
        info!("Parental consent verified by card check");
        Ok(())
    }

    pub async fn kbq_questions(&self) -> Result<Vec<KbqQuestion>, Error> {
        let payload = self.session.guard(
            self.session
                .api()
                .get::<ApiResponse<KbqQuestionsPayload>>("/auth/consent/kbq/questions")
                .await
                .and_then(ApiResponse::into_data),
        )?;
        Ok(payload.questions)
    }

    /// Submit answers. Only a `verified` result changes the session.
    pub async fn submit_kbq(&self, answers: &[KbqAnswer]) -> Result<KbqResult, Error> {
        if answers.is_empty() {
            return Err(Error::validation("answers", "at least one answer is required"));
        }
        let result = self.session.guard(
            self.session
                .api()
                .post::<_, ApiResponse<KbqResult>>(
                    "/auth/consent/kbq/verify",
                    &json!({ "answers": answers }),
                )
                .await
                .and_then(ApiResponse::into_data),
        )?;
        if result.verified {
            self.session.mark_consent_verified();
            info!("Parental consent verified by knowledge questions");
        }
        Ok(result)
    }
}
