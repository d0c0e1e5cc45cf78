//! Structured recipe requests.
//!
//! [`RecommendationRequester`] renders the recommendation prompt, asks the
//! text model for schema-constrained JSON and turns the reply into a
//! [`Recommendation`]. Only the model call itself is retried; content-shape
//! failures are deterministic and surface immediately.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::{ComforterConfig, PromptTemplates};
use crate::error::{ComforterError, Result};
use crate::gemini::{GenerateContentRequest, GenerationConfig, GenerativeBackend};
use crate::prompt::{PromptMoment, recommendation_prompt};
use crate::recipe::{MoodBudgetContext, REQUIRED_FIELDS, Recommendation, UserProfile};
use crate::retry::RetryPolicy;

const SAFETY_GUIDANCE: &str = "This request touched upon sensitive culinary boundaries. \
Please try describing your mood differently.";

/// JSON schema sent with every recommendation request.
pub fn recommendation_schema() -> serde_json::Value {
    let string = json!({ "type": "STRING" });
    let string_list = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "dishName": string,
            "energyMatch": string,
            "moodExplanation": string,
            "estimatedCost": string,
            "keyIngredients": string_list,
            "instructions": string_list,
            "bestFor": string,
            "prepTime": string,
            "chefTip": string,
        },
        "required": REQUIRED_FIELDS,
    })
}

/// Turns user context into a [`Recommendation`] via the text model.
pub struct RecommendationRequester {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    retry: RetryPolicy,
    templates: PromptTemplates,
}

impl RecommendationRequester {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        model: impl Into<String>,
        retry: RetryPolicy,
        templates: PromptTemplates,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            retry,
            templates,
        }
    }

    pub fn from_config(backend: Arc<dyn GenerativeBackend>, config: &ComforterConfig) -> Self {
        Self::new(
            backend,
            config.api.text_model.clone(),
            config.retry,
            config.prompts.clone(),
        )
    }

    /// Request a recommendation for the current local moment.
    ///
    /// # Errors
    ///
    /// [`ComforterError::SafetyBlocked`] when the model refuses on policy
    /// grounds, [`ComforterError::NoContent`] / [`ComforterError::MalformedOutput`]
    /// for unusable replies, and transport kinds from the backend.
    pub async fn request(
        &self,
        profile: &UserProfile,
        context: &MoodBudgetContext,
    ) -> Result<Recommendation> {
        self.request_at(profile, context, PromptMoment::now()).await
    }

    /// Same as [`request`](Self::request) at an explicit moment.
    pub async fn request_at(
        &self,
        profile: &UserProfile,
        context: &MoodBudgetContext,
        moment: PromptMoment,
    ) -> Result<Recommendation> {
        let prompt = recommendation_prompt(&self.templates, profile, context, moment);
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting recommendation");

        let request = GenerateContentRequest::from_text(prompt)
            .with_generation_config(GenerationConfig::json_schema(recommendation_schema()));

        let response = self
            .retry
            .invoke_model(|| self.backend.generate_content(&self.model, &request))
            .await
            .map_err(|e| match e {
                ComforterError::SafetyBlocked(detail) => {
                    warn!(%detail, "recommendation blocked by backend");
                    ComforterError::SafetyBlocked(SAFETY_GUIDANCE.to_owned())
                }
                other => other,
            })?;

        if let Some(reason) = response.block_reason() {
            warn!(%reason, "recommendation withheld on policy grounds");
            return Err(ComforterError::SafetyBlocked(SAFETY_GUIDANCE.to_owned()));
        }

        let text = response.text().ok_or_else(|| {
            ComforterError::NoContent("The chef is silent. (No content returned)".to_owned())
        })?;
        let recommendation = parse_recommendation(&text)?;
        info!(dish = %recommendation.dish_name, "recommendation ready");
        Ok(recommendation)
    }
}

/// Parse model output into a validated recommendation without image fields.
///
/// Tries the whole text first, then the first balanced `{...}` span.
///
/// # Errors
///
/// [`ComforterError::NoContent`] for blank text, [`ComforterError::MalformedOutput`]
/// when no JSON object can be found or it lacks required content.
pub fn parse_recommendation(text: &str) -> Result<Recommendation> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ComforterError::NoContent(
            "The chef is silent. (No content returned)".to_owned(),
        ));
    }

    let parsed = match serde_json::from_str::<Recommendation>(trimmed) {
        Ok(rec) => rec,
        Err(direct) => {
            let span = first_json_object(trimmed).ok_or_else(|| {
                ComforterError::MalformedOutput(
                    "The chef provided a recipe in an unreadable format.".to_owned(),
                )
            })?;
            serde_json::from_str::<Recommendation>(span).map_err(|e| {
                debug!(%direct, "direct parse failed before span extraction");
                ComforterError::MalformedOutput(format!("recipe JSON is incomplete: {e}"))
            })?
        }
    };

    parsed.validate()?;
    Ok(parsed.without_images())
}

/// The first balanced `{...}` span in `text`, honouring JSON string escapes.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
