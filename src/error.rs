//! Error types for the recommendation, imagery and narration services.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via [`ComforterError::code()`].
//! Transport-level failures are translated into these kinds at the service
//! boundary so that raw HTTP or parse errors never reach the caller.

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// No usable API credential, or the backend rejected it.
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";

    /// The backend signalled rate limiting (HTTP 429 / `RESOURCE_EXHAUSTED`).
    pub const RATE_LIMITED: &str = "RATE_LIMITED";

    /// Any other transport or HTTP failure.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// The model returned no text at all.
    pub const NO_CONTENT: &str = "NO_CONTENT";

    /// The model returned text that is not a usable recipe.
    pub const MALFORMED_OUTPUT: &str = "MALFORMED_OUTPUT";

    /// The prompt or response was blocked on safety/policy grounds.
    pub const SAFETY_BLOCKED: &str = "SAFETY_BLOCKED";

    /// An image response carried no inline image payload.
    pub const NO_IMAGE_DATA: &str = "NO_IMAGE_DATA";

    /// A speech response carried no inline audio payload.
    pub const NO_AUDIO_DATA: &str = "NO_AUDIO_DATA";

    /// The audio payload decoded to zero usable samples.
    pub const DECODE_FAILED: &str = "DECODE_FAILED";

    /// Audio device or stream error.
    pub const AUDIO_ERROR: &str = "AUDIO_ERROR";

    /// Invalid, unreadable or unwritable configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
}

/// Errors produced by the comforter services.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum ComforterError {
    /// No usable API credential, or the backend rejected it.
    #[error("[{}] {}", error_codes::SERVICE_UNAVAILABLE, .0)]
    ServiceUnavailable(String),

    /// Rate limited by the backend.
    #[error("[{}] {}", error_codes::RATE_LIMITED, .0)]
    RateLimited(String),

    /// Transport or HTTP failure not covered by other variants.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    RequestFailed(String),

    /// Empty model response.
    #[error("[{}] {}", error_codes::NO_CONTENT, .0)]
    NoContent(String),

    /// Unparseable or incomplete model response.
    #[error("[{}] {}", error_codes::MALFORMED_OUTPUT, .0)]
    MalformedOutput(String),

    /// Safety/policy rejection.
    #[error("[{}] {}", error_codes::SAFETY_BLOCKED, .0)]
    SafetyBlocked(String),

    /// Image response without inline data.
    #[error("[{}] {}", error_codes::NO_IMAGE_DATA, .0)]
    NoImageData(String),

    /// Speech response without inline data.
    #[error("[{}] {}", error_codes::NO_AUDIO_DATA, .0)]
    NoAudioData(String),

    /// Audio payload could not be decoded into samples.
    #[error("[{}] {}", error_codes::DECODE_FAILED, .0)]
    DecodeFailed(String),

    /// Audio device or stream error.
    #[error("[{}] {}", error_codes::AUDIO_ERROR, .0)]
    Audio(String),

    /// Configuration error.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),
}

impl ComforterError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => error_codes::SERVICE_UNAVAILABLE,
            Self::RateLimited(_) => error_codes::RATE_LIMITED,
            Self::RequestFailed(_) => error_codes::REQUEST_FAILED,
            Self::NoContent(_) => error_codes::NO_CONTENT,
            Self::MalformedOutput(_) => error_codes::MALFORMED_OUTPUT,
            Self::SafetyBlocked(_) => error_codes::SAFETY_BLOCKED,
            Self::NoImageData(_) => error_codes::NO_IMAGE_DATA,
            Self::NoAudioData(_) => error_codes::NO_AUDIO_DATA,
            Self::DecodeFailed(_) => error_codes::DECODE_FAILED,
            Self::Audio(_) => error_codes::AUDIO_ERROR,
            Self::Config(_) => error_codes::CONFIG_INVALID,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ServiceUnavailable(m)
            | Self::RateLimited(m)
            | Self::RequestFailed(m)
            | Self::NoContent(m)
            | Self::MalformedOutput(m)
            | Self::SafetyBlocked(m)
            | Self::NoImageData(m)
            | Self::NoAudioData(m)
            | Self::DecodeFailed(m)
            | Self::Audio(m)
            | Self::Config(m) => m,
        }
    }

    /// Returns true if this error is worth retrying after a delay.
    ///
    /// Only rate limiting qualifies. Content-shape failures are deterministic
    /// and transport failures other than rate limits are surfaced directly.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Text suitable for showing to the person using the app.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::SafetyBlocked(_) => {
                "This request touched upon sensitive culinary boundaries. \
                 Please try describing your mood differently."
            }
            Self::NoContent(_) | Self::MalformedOutput(_) => {
                "The chef provided a recipe in an unreadable format. Please try again."
            }
            Self::NoImageData(_) => "This picture is still unavailable. Please try again.",
            Self::NoAudioData(_) | Self::DecodeFailed(_) | Self::Audio(_) => {
                "Audio narration is currently unavailable. Please try again."
            }
            Self::ServiceUnavailable(_) => {
                "The kitchen is closed right now. The chef service is not configured."
            }
            Self::RateLimited(_) | Self::RequestFailed(_) | Self::Config(_) => {
                "The kitchen is currently overwhelmed. Please try again."
            }
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ComforterError>;
