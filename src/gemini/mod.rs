//! Generative backend seam.
//!
//! Every outbound call (structured recipe text, images, speech) goes through
//! [`GenerativeBackend::generate_content`]. [`GeminiClient`] is the HTTP
//! implementation; tests substitute scripted backends.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{GeminiClient, GeminiConfig, is_rate_limit_signal};
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part, PromptFeedback,
};

/// A model backend that answers `generateContent` requests.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Returns the backend name (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Run one request against `model`.
    ///
    /// Implementations translate transport failures into
    /// [`ComforterError`](crate::error::ComforterError) kinds; rate limiting
    /// must surface as `RateLimited` so callers can back off.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}
