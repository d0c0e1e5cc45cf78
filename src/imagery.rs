//! Dish photography.
//!
//! Hero images never fail from the caller's point of view: any error falls
//! back to a seeded placeholder URL. Step images propagate their errors so
//! the hydration loop can decide what to do.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{ComforterConfig, PlaceholderConfig, PromptTemplates};
use crate::error::{ComforterError, Result};
use crate::gemini::{GenerateContentRequest, GenerationConfig, GenerativeBackend, InlineData};
use crate::prompt::{hero_image_prompt, step_image_prompt};
use crate::retry::RetryPolicy;

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Requested frame shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    /// 16:9, used for the hero shot.
    Wide,
    /// 4:3, used for step shots.
    Standard,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Standard => "4:3",
        }
    }
}

/// Generates hero and step images through the image model.
pub struct ImageSynthesizer {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    retry: RetryPolicy,
    templates: PromptTemplates,
    placeholder: PlaceholderConfig,
}

impl ImageSynthesizer {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        model: impl Into<String>,
        retry: RetryPolicy,
        templates: PromptTemplates,
        placeholder: PlaceholderConfig,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            retry,
            templates,
            placeholder,
        }
    }

    pub fn from_config(backend: Arc<dyn GenerativeBackend>, config: &ComforterConfig) -> Self {
        Self::new(
            backend,
            config.api.image_model.clone(),
            config.retry,
            config.prompts.clone(),
            config.placeholder.clone(),
        )
    }

    /// Produce the hero image for `dish_name`.
    ///
    /// Returns a `data:` URI on success and [`placeholder_url`](Self::placeholder_url)
    /// on any failure, including exhausted rate-limit retries.
    pub async fn synthesize_hero_image(&self, dish_name: &str) -> String {
        let prompt = hero_image_prompt(&self.templates, dish_name);
        match self.generate(prompt, AspectRatio::Wide).await {
            Ok(uri) => uri,
            Err(e) => {
                warn!(dish = dish_name, error = %e, "hero image failed, using placeholder");
                self.placeholder_url(dish_name)
            }
        }
    }

    /// Produce an action shot for one instruction step.
    ///
    /// # Errors
    ///
    /// [`ComforterError::NoImageData`] when the reply carries no inline
    /// payload, otherwise whatever the backend reported after retries.
    pub async fn synthesize_step_image(&self, step: &str, dish_name: &str) -> Result<String> {
        let prompt = step_image_prompt(&self.templates, step, dish_name);
        self.generate(prompt, AspectRatio::Standard).await
    }

    /// Deterministic placeholder URL for a dish, seeded by its name.
    pub fn placeholder_url(&self, dish_name: &str) -> String {
        format!(
            "{}/seed/{}/{}/{}",
            self.placeholder.base_url.trim_end_matches('/'),
            urlencoding::encode(dish_name),
            self.placeholder.width,
            self.placeholder.height
        )
    }

    async fn generate(&self, prompt: String, aspect: AspectRatio) -> Result<String> {
        debug!(model = %self.model, aspect = aspect.as_str(), "requesting image");
        let request = GenerateContentRequest::from_text(prompt)
            .with_generation_config(GenerationConfig::image(aspect.as_str()));

        let response = self
            .retry
            .invoke_model(|| self.backend.generate_content(&self.model, &request))
            .await?;

        response
            .first_inline_data()
            .filter(|inline| !inline.data.is_empty())
            .map(data_uri)
            .ok_or_else(|| ComforterError::NoImageData("No image data found".to_owned()))
    }
}

/// Format an inline payload as a `data:` URI, defaulting the MIME type.
pub fn data_uri(inline: &InlineData) -> String {
    let mime = if inline.mime_type.trim().is_empty() {
        DEFAULT_IMAGE_MIME
    } else {
        inline.mime_type.as_str()
    };
    format!("data:{mime};base64,{}", inline.data)
}
