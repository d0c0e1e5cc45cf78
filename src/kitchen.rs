//! Top-level orchestration.
//!
//! [`Kitchen`] wires the requester, the image and narration services, the
//! display board and the playback engine together:
//!
//! 1. [`recommend`](Kitchen::recommend) awaits the structured recipe,
//!    publishes it and hands back immediately while images hydrate on a
//!    detached task.
//! 2. [`toggle_narration`](Kitchen::toggle_narration) fetches and plays the
//!    spoken walkthrough on demand, or pauses/resumes one already running.
//!    The audio session is shared behind a mutex that is only locked around
//!    device calls, so [`stop_narration`](Kitchen::stop_narration) can run
//!    while a narration fetch is still in flight.
//!
//! # Examples
//!
//! ```rust,no_run
//! use comforter::{ComforterConfig, Kitchen};
//! use comforter::recipe::{Budget, Mood, MoodBudgetContext, UserProfile};
//!
//! # async fn example() -> Result<(), comforter::ComforterError> {
//! let kitchen = Kitchen::from_config(&ComforterConfig::default())?;
//! let context = MoodBudgetContext::new(Some(Mood::Tired), Budget::Low);
//! let generated = kitchen.recommend(&UserProfile::default(), &context).await?;
//! println!("{}", generated.recommendation.dish_name);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audio::{AudioPlaybackEngine, AudioSession, PlaybackState};
use crate::board::RecommendationBoard;
use crate::config::{ComforterConfig, HydrationConfig};
use crate::error::Result;
use crate::gemini::{GeminiClient, GeminiConfig, GenerativeBackend};
use crate::hydration::{HydrationReport, spawn_hydration};
use crate::imagery::ImageSynthesizer;
use crate::narration::AudioNarrator;
use crate::recipe::{MoodBudgetContext, Recommendation, UserProfile};
use crate::recommend::RecommendationRequester;

/// A freshly generated recommendation and its background hydration.
#[derive(Debug)]
pub struct Generated {
    /// Ticket the recommendation was published under.
    pub ticket: Uuid,
    /// The recommendation as first displayed, without images.
    pub recommendation: Recommendation,
    /// Hydration task. Dropping it does not cancel hydration.
    pub hydration: JoinHandle<HydrationReport>,
}

pub struct Kitchen {
    requester: RecommendationRequester,
    images: Arc<ImageSynthesizer>,
    narrator: AudioNarrator,
    board: Arc<RecommendationBoard>,
    playback: AudioPlaybackEngine,
    hydration: HydrationConfig,
}

impl Kitchen {
    /// Build every service on top of `backend`.
    pub fn new(config: &ComforterConfig, backend: Arc<dyn GenerativeBackend>) -> Self {
        debug!(backend = backend.name(), "building kitchen");
        Self {
            requester: RecommendationRequester::from_config(Arc::clone(&backend), config),
            images: Arc::new(ImageSynthesizer::from_config(Arc::clone(&backend), config)),
            narrator: AudioNarrator::from_config(backend, config),
            board: Arc::new(RecommendationBoard::new()),
            playback: AudioPlaybackEngine::new(),
            hydration: config.hydration.clone(),
        }
    }

    /// Build on the Gemini HTTP backend.
    ///
    /// # Errors
    ///
    /// [`ComforterError::ServiceUnavailable`](crate::ComforterError::ServiceUnavailable)
    /// when no API credential is configured.
    pub fn from_config(config: &ComforterConfig) -> Result<Self> {
        let client = GeminiClient::new(GeminiConfig::from_api_config(&config.api)?)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn board(&self) -> &Arc<RecommendationBoard> {
        &self.board
    }

    pub fn playback(&self) -> &AudioPlaybackEngine {
        &self.playback
    }

    pub fn images(&self) -> &Arc<ImageSynthesizer> {
        &self.images
    }

    /// Generate, display and start hydrating a recommendation.
    ///
    /// # Errors
    ///
    /// Whatever [`RecommendationRequester::request`] reports. The board is
    /// left untouched on failure.
    pub async fn recommend(
        &self,
        profile: &UserProfile,
        context: &MoodBudgetContext,
    ) -> Result<Generated> {
        let recommendation = self.requester.request(profile, context).await?;
        let ticket = self.board.publish(recommendation.clone());
        info!(%ticket, dish = %recommendation.dish_name, "recommendation displayed");

        let hydration = spawn_hydration(
            Arc::clone(&self.board),
            Arc::clone(&self.images),
            self.hydration.clone(),
            ticket,
            recommendation.clone(),
        );
        Ok(Generated {
            ticket,
            recommendation,
            hydration,
        })
    }

    /// Navigate away from the displayed recommendation.
    pub fn leave(&self) {
        debug!("leaving recommendation view");
        self.board.clear();
    }

    /// Narration button behaviour, routed by the playback state.
    ///
    /// - `Playing` / `Paused`: pause or resume.
    /// - `Loading`: ignored; the pending fetch holds the lock.
    /// - `Idle`: narrate the displayed recommendation and play it.
    ///
    /// Returns the resulting state.
    ///
    /// # Errors
    ///
    /// Narration and playback errors. The state is `Idle` after any error.
    pub async fn toggle_narration(
        &self,
        session: &Mutex<AudioSession>,
        user_name: &str,
    ) -> Result<PlaybackState> {
        match self.playback.state() {
            PlaybackState::Playing | PlaybackState::Paused => {
                return self.playback.pause_or_resume(&mut lock(session));
            }
            PlaybackState::Loading => {
                debug!("narration already loading");
                return Ok(PlaybackState::Loading);
            }
            PlaybackState::Idle => {}
        }

        let Some(shown) = self.board.current() else {
            debug!("nothing displayed to narrate");
            return Ok(PlaybackState::Idle);
        };
        if !self.playback.begin_loading() {
            return Ok(self.playback.state());
        }

        let payload = match self.narrator.narrate(&shown.recipe, user_name).await {
            Ok(payload) => payload,
            Err(e) => {
                self.playback.cancel_loading();
                return Err(e);
            }
        };

        let mut session = lock(session);
        if self.playback.state() != PlaybackState::Loading {
            debug!("narration stopped while loading, discarding audio");
            return Ok(self.playback.state());
        }
        self.playback.play(&mut session, &payload)?;
        Ok(self.playback.state())
    }

    /// Stop narration from any state, including while the audio is loading.
    pub fn stop_narration(&self, session: &Mutex<AudioSession>) {
        self.playback.stop(&mut lock(session));
    }
}

// A panic mid device call leaves nothing half-written in the session.
fn lock(session: &Mutex<AudioSession>) -> MutexGuard<'_, AudioSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
