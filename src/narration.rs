//! Spoken recipe walkthroughs.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ComforterConfig, PromptTemplates};
use crate::error::{ComforterError, Result};
use crate::gemini::{GenerateContentRequest, GenerationConfig, GenerativeBackend};
use crate::prompt::narration_prompt;
use crate::recipe::Recommendation;
use crate::retry::RetryPolicy;

/// Asks the speech model to narrate a recommendation.
///
/// The result is the raw base64 payload: 16-bit little-endian mono PCM at
/// the configured sample rate. Decoding lives in [`crate::audio::pcm`].
pub struct AudioNarrator {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    voice: String,
    retry: RetryPolicy,
    templates: PromptTemplates,
}

impl AudioNarrator {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        model: impl Into<String>,
        voice: impl Into<String>,
        retry: RetryPolicy,
        templates: PromptTemplates,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            voice: voice.into(),
            retry,
            templates,
        }
    }

    pub fn from_config(backend: Arc<dyn GenerativeBackend>, config: &ComforterConfig) -> Self {
        Self::new(
            backend,
            config.api.speech_model.clone(),
            config.api.voice.clone(),
            config.retry,
            config.prompts.clone(),
        )
    }

    /// Generate narration audio for `recommendation`, addressed to `user_name`.
    ///
    /// # Errors
    ///
    /// [`ComforterError::NoAudioData`] when the reply's leading part carries
    /// no inline audio. Rate limits are retried; the final error propagates.
    pub async fn narrate(
        &self,
        recommendation: &Recommendation,
        user_name: &str,
    ) -> Result<String> {
        let prompt = narration_prompt(&self.templates, recommendation, user_name);
        debug!(model = %self.model, voice = %self.voice, "requesting narration");

        let request = GenerateContentRequest::from_text(prompt)
            .with_generation_config(GenerationConfig::speech(self.voice.clone()));

        let backend = &self.backend;
        let model = self.model.as_str();
        let request = &request;
        let payload = self
            .retry
            .invoke_model(|| async move {
                let response = backend.generate_content(model, request).await?;
                response
                    .leading_inline_data()
                    .map(|inline| inline.data.clone())
                    .ok_or_else(|| {
                        ComforterError::NoAudioData("No audio data received.".to_owned())
                    })
            })
            .await?;

        info!(
            dish = %recommendation.dish_name,
            payload_chars = payload.len(),
            "narration ready"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::gemini::{GenerateContentResponse, Part};
    use crate::recipe::fixtures::risotto;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<Result<GenerateContentResponse>>>,
        seen: Mutex<Vec<GenerateContentRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<GenerateContentResponse>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_content(
            &self,
            _model: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ComforterError::RequestFailed("script exhausted".into())))
        }
    }

    fn narrator(backend: Arc<Scripted>) -> AudioNarrator {
        AudioNarrator::new(
            backend,
            "speech-model",
            "Kore",
            RetryPolicy::default().with_base_delay_ms(1),
            PromptTemplates::default(),
        )
    }

    #[tokio::test]
    async fn returns_leading_inline_payload() {
        let backend = Scripted::new(vec![Ok(GenerateContentResponse::with_parts(vec![
            Part::inline("audio/L16;codec=pcm;rate=24000", "AAABAA=="),
        ]))]);
        let payload = narrator(Arc::clone(&backend))
            .narrate(&risotto(), "Sam Okafor")
            .await
            .unwrap();
        assert_eq!(payload, "AAABAA==");

        let seen = backend.seen.lock().unwrap();
        let config = seen[0].generation_config.as_ref().unwrap();
        assert_eq!(config.response_modalities.as_deref(), Some(&["AUDIO".to_owned()][..]));
        let voice = &config.speech_config.as_ref().unwrap().voice_config;
        assert_eq!(voice.prebuilt_voice_config.voice_name, "Kore");
        assert!(seen[0].prompt_text().contains("Greet Sam"));
    }

    #[tokio::test]
    async fn text_only_reply_is_no_audio() {
        let backend = Scripted::new(vec![Ok(GenerateContentResponse::with_parts(vec![
            Part::text("I would rather write it down."),
        ]))]);
        let err = narrator(backend).narrate(&risotto(), "Sam").await.unwrap_err();
        assert!(matches!(err, ComforterError::NoAudioData(_)));
        assert_eq!(err.message(), "No audio data received.");
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let backend = Scripted::new(vec![
            Err(ComforterError::RateLimited("RESOURCE_EXHAUSTED".into())),
            Ok(GenerateContentResponse::with_parts(vec![Part::inline(
                "audio/pcm",
                "AAAA",
            )])),
        ]);
        let payload = narrator(Arc::clone(&backend))
            .narrate(&risotto(), "Sam")
            .await
            .unwrap();
        assert_eq!(payload, "AAAA");
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn other_failures_propagate_without_retry() {
        let backend = Scripted::new(vec![Err(ComforterError::RequestFailed("HTTP 500".into()))]);
        let err = narrator(Arc::clone(&backend))
            .narrate(&risotto(), "Sam")
            .await
            .unwrap_err();
        assert!(matches!(err, ComforterError::RequestFailed(_)));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }
}
