//! Configuration types for the comforter services.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ComforterError, Result};
use crate::retry::RetryPolicy;

/// Environment variables consulted, in order, after [`ApiConfig::api_key_env`].
pub const FALLBACK_API_KEY_ENVS: [&str; 2] = ["API_KEY", "GOOGLE_API_KEY"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComforterConfig {
    /// Generative backend endpoint, credential and model selection.
    pub api: ApiConfig,
    /// Backoff applied to every outbound model call.
    pub retry: RetryPolicy,
    /// Background image hydration pacing.
    pub hydration: HydrationConfig,
    /// Narration playback settings.
    pub audio: AudioConfig,
    /// Fallback hero image service.
    pub placeholder: PlaceholderConfig,
    /// Prompt templates.
    pub prompts: PromptTemplates,
}

/// Generative backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL without the `/v1beta` suffix.
    pub base_url: String,
    /// Inline credential. Prefer the environment; empty means "not set".
    pub api_key: String,
    /// Primary environment variable holding the credential.
    pub api_key_env: String,
    /// Model used for structured recipe generation.
    pub text_model: String,
    /// Model used for hero and step photographs.
    pub image_model: String,
    /// Model used for spoken narration.
    pub speech_model: String,
    /// Prebuilt voice name for narration.
    pub voice: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_owned(),
            api_key: String::new(),
            api_key_env: "GEMINI_API_KEY".to_owned(),
            text_model: "gemini-3-flash-preview".to_owned(),
            image_model: "gemini-2.5-flash-image".to_owned(),
            speech_model: "gemini-2.5-flash-preview-tts".to_owned(),
            voice: "Kore".to_owned(),
            request_timeout_secs: 90,
        }
    }
}

impl ApiConfig {
    /// Resolve the API credential from config or the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ComforterError::ServiceUnavailable`] when no non-empty
    /// credential is found.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Same as [`resolve_api_key`](Self::resolve_api_key) with an injectable
    /// environment lookup.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let inline = self.api_key.trim();
        if !inline.is_empty() {
            return Ok(inline.to_owned());
        }

        std::iter::once(self.api_key_env.as_str())
            .chain(FALLBACK_API_KEY_ENVS)
            .filter(|name| !name.is_empty())
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_owned())
            .find(|value| !value.is_empty())
            .ok_or_else(|| {
                ComforterError::ServiceUnavailable(format!(
                    "no API credential found (set {} or api.api_key)",
                    self.api_key_env
                ))
            })
    }
}

/// Background image hydration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationConfig {
    /// Maximum number of step images generated per recommendation.
    pub step_image_limit: usize,
    /// Pause before each step image request, in milliseconds.
    pub step_delay_ms: u64,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            step_image_limit: 4,
            step_delay_ms: 800,
        }
    }
}

/// Narration playback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate of the narration PCM payload and the output context, in Hz.
    pub sample_rate: u32,
    /// Channel count of the narration payload (1 = mono).
    pub channels: u16,
    /// Output device name (None = system default).
    pub output_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            output_device: None,
        }
    }
}

/// Placeholder image service used when hero generation fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    /// Base URL of a seeded placeholder service.
    pub base_url: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://picsum.photos".to_owned(),
            width: 800,
            height: 450,
        }
    }
}

/// Prompt templates with `{name}` placeholders.
///
/// See [`crate::prompt`] for the placeholder names each template receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// Structured recipe request.
    pub recommendation: String,
    /// Hero photograph.
    pub hero_image: String,
    /// Step action shot.
    pub step_image: String,
    /// Narration script.
    pub narration: String,
    /// Upper bound on spoken words requested from the speech model.
    pub narration_word_limit: u32,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            recommendation: DEFAULT_RECOMMENDATION_TEMPLATE.to_owned(),
            hero_image: DEFAULT_HERO_IMAGE_TEMPLATE.to_owned(),
            step_image: DEFAULT_STEP_IMAGE_TEMPLATE.to_owned(),
            narration: DEFAULT_NARRATION_TEMPLATE.to_owned(),
            narration_word_limit: 180,
        }
    }
}

const DEFAULT_RECOMMENDATION_TEMPLATE: &str = r#"You are "The Culinary Comforter," an expert chef who blends psychology, nutrition and gastronomy.

TASK: Recommend a personalized gourmet dish that fuses the user's heritage ({nationality}) with {fusion_source}.

USER PROFILE:
- Name: {name}
- Age: {age}
- Current Context: {location}

HARD CONSTRAINTS (MUST NOT BE VIOLATED):
- Dietary Restrictions: {dietary}
- Allergies (NEVER USE THESE INGREDIENTS): {allergies}

CREATIVE INPUTS:
- Mood/Vibe: {mood}
- Budget Level: {budget}
- Current Time/Season: {time_of_day} in {season}
- Personal Story/Notes: {context}

CREATIVE DIRECTION:
Provide a sophisticated, gourmet recommendation that strictly adheres to the dietary and allergy constraints. Return strictly as a JSON object."#;

const DEFAULT_HERO_IMAGE_TEMPLATE: &str = "A high-end, professional culinary photograph of {dish_name}. \
Beautiful plating, gourmet restaurant quality, soft natural lighting.";

const DEFAULT_STEP_IMAGE_TEMPLATE: &str = "A professional close-up culinary action shot showing: {step}. \
Focusing on the texture of ingredients for {dish_name}.";

const DEFAULT_NARRATION_TEMPLATE: &str = r#"You are "The Culinary Comforter," a warm, high-end mentor chef, speaking directly to {first_name}.
1. Greet {first_name} by name.
2. Briefly explain why "{dish_name}" suits how they feel right now: {mood_explanation}
3. Guide them through these steps in a mentoring tone, dwelling on aromas, sounds and textures:
{steps}
4. Close with an encouraging remark.
Keep the whole narration under {word_limit} words."#;

impl ComforterConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ComforterError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| ComforterError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ComforterError::Config(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ComforterError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ComforterError::Config(format!("cannot write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/culinary-comforter/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("culinary-comforter")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ComforterConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.hydration.step_image_limit, 4);
        assert_eq!(config.hydration.step_delay_ms, 800);
        assert_eq!(config.audio.sample_rate, 24_000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!((config.placeholder.width, config.placeholder.height), (800, 450));
        assert!(!config.api.text_model.is_empty());
        assert!(config.prompts.recommendation.contains("{allergies}"));
        assert!(config.prompts.narration.contains("{first_name}"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ComforterConfig::default();
        config.api.voice = "Puck".to_owned();
        config.hydration.step_delay_ms = 250;
        config.audio.output_device = Some("Kitchen Speaker".to_owned());
        config.save_to_file(&path).unwrap();

        let loaded = ComforterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.api.voice, "Puck");
        assert_eq!(loaded.hydration.step_delay_ms, 250);
        assert_eq!(loaded.audio.output_device.as_deref(), Some("Kitchen Speaker"));
        assert_eq!(loaded.prompts.hero_image, config.prompts.hero_image);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = 5\n").unwrap();

        let loaded = ComforterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.retry.max_attempts, 5);
        assert_eq!(loaded.retry.base_delay_ms, 1000);
        assert_eq!(loaded.api.voice, "Kore");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retry\nmax_attempts = ").unwrap();

        let err = ComforterConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ComforterError::Config(_)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = ComforterConfig::from_file(std::path::Path::new("/nonexistent/comforter.toml"))
            .unwrap_err();
        assert!(matches!(err, ComforterError::Config(_)));
    }

    #[test]
    fn inline_key_wins_over_environment() {
        let api = ApiConfig {
            api_key: " inline-key ".to_owned(),
            ..ApiConfig::default()
        };
        let key = api.resolve_api_key_with(|_| Some("env-key".to_owned())).unwrap();
        assert_eq!(key, "inline-key");
    }

    #[test]
    fn fallback_env_names_are_consulted() {
        let api = ApiConfig::default();
        let key = api
            .resolve_api_key_with(|name| (name == "GOOGLE_API_KEY").then(|| "g-key".to_owned()))
            .unwrap();
        assert_eq!(key, "g-key");
    }

    #[test]
    fn blank_credentials_are_service_unavailable() {
        let api = ApiConfig::default();
        let err = api.resolve_api_key_with(|_| Some("   ".to_owned())).unwrap_err();
        assert!(matches!(err, ComforterError::ServiceUnavailable(_)));
        assert!(err.message().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = ComforterConfig::default_config_path();
        assert!(path.ends_with("culinary-comforter/config.toml"));
    }
}
