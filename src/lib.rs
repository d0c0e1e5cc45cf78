//! Culinary Comforter: mood-aware recipe generation with images and narration.
//!
//! This crate turns a user's mood, budget, dietary constraints and free-text
//! context into a personalised recipe by calling a generative backend:
//! Profile + Mood → Recipe JSON → Hero/Step images → Spoken walkthrough
//!
//! # Architecture
//!
//! - **Retry**: rate-limited model calls back off exponentially (`retry`)
//! - **Backend**: `generateContent` over HTTP via `reqwest` (`gemini`)
//! - **Recipe**: schema-constrained JSON parsed into a `Recommendation` (`recommend`)
//! - **Images**: hero shot with placeholder fallback, paced step shots (`imagery`, `hydration`)
//! - **Narration**: speech synthesis and PCM playback via `cpal` (`narration`, `audio`)
//! - **Kitchen**: the facade a UI drives (`kitchen`, `board`)

pub mod audio;
pub mod board;
pub mod config;
pub mod cookbook;
pub mod error;
pub mod gemini;
pub mod hydration;
pub mod imagery;
pub mod kitchen;
pub mod logging;
pub mod narration;
pub mod prompt;
pub mod recipe;
pub mod recommend;
pub mod retry;

pub use audio::{AudioPlaybackEngine, AudioSession, PlaybackState};
pub use board::{DisplayedRecommendation, RecommendationBoard};
pub use config::ComforterConfig;
pub use cookbook::SavedRecipes;
pub use error::{ComforterError, Result};
pub use hydration::HydrationReport;
pub use kitchen::{Generated, Kitchen};
pub use recipe::{Budget, Mood, MoodBudgetContext, Recommendation, UserProfile};
pub use retry::RetryPolicy;
