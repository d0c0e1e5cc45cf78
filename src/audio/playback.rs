//! Narration playback state machine.
//!
//! [`AudioPlaybackEngine`] moves between [`PlaybackState`]s and drives the
//! [`AudioOutput`](super::AudioOutput) held by an [`AudioSession`]. State is
//! published on a `tokio::sync::watch` channel so a UI can follow along.
//!
//! Completion hooks from earlier sources are made inert by a generation
//! counter: each `play` and `stop` bumps it, and a hook only acts if the
//! generation it captured is still current.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::pcm::decode_payload;
use super::session::AudioSession;
use crate::error::Result;

/// Where narration playback currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Narration audio is being fetched.
    Loading,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Whether a source is attached (playing or suspended).
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

/// Plays decoded narration one source at a time.
///
/// The engine does not guard against overlapping `play` calls; callers route
/// an active session to [`pause_or_resume`](Self::pause_or_resume) instead.
pub struct AudioPlaybackEngine {
    state: Arc<watch::Sender<PlaybackState>>,
    generation: Arc<AtomicU64>,
}

impl Default for AudioPlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlaybackEngine {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Self {
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// Follow state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    /// Mark narration as being fetched. Only valid from `Idle`.
    ///
    /// Returns false, leaving the state alone, when something else is
    /// already loading or playing.
    pub fn begin_loading(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == PlaybackState::Idle {
                *state = PlaybackState::Loading;
                true
            } else {
                false
            }
        })
    }

    /// Abandon a fetch started with [`begin_loading`](Self::begin_loading).
    pub fn cancel_loading(&self) {
        self.state.send_if_modified(|state| {
            if *state == PlaybackState::Loading {
                *state = PlaybackState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Decode `payload` and start playing it on the session's output.
    ///
    /// Returns to `Idle` automatically when the buffer plays out.
    ///
    /// # Errors
    ///
    /// [`ComforterError::DecodeFailed`](crate::error::ComforterError::DecodeFailed)
    /// for an unusable payload and
    /// [`ComforterError::Audio`](crate::error::ComforterError::Audio) when the
    /// output cannot be opened or started. The state is `Idle` after any error.
    pub fn play(&self, session: &mut AudioSession, payload: &str) -> Result<()> {
        let audio = session.config();
        let buffer = match decode_payload(payload, audio.sample_rate, audio.channels) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!(error = %e, "narration payload rejected");
                self.set(PlaybackState::Idle);
                return Err(e);
            }
        };
        let duration = buffer.duration();

        let output = match session.output() {
            Ok(output) => output,
            Err(e) => {
                self.set(PlaybackState::Idle);
                return Err(e);
            }
        };
        if output.is_suspended() {
            if let Err(e) = output.resume() {
                warn!(error = %e, "could not resume output before playback");
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // Playing must be published before start: an output may complete
        // synchronously and the hook has to win.
        self.set(PlaybackState::Playing);

        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let on_complete = Box::new(move || {
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            state.send_if_modified(|s| {
                if s.is_active() {
                    *s = PlaybackState::Idle;
                    true
                } else {
                    false
                }
            });
            debug!(generation, "narration finished");
        });

        if let Err(e) = output.start(buffer, on_complete) {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.set(PlaybackState::Idle);
            return Err(e);
        }
        info!(seconds = duration.as_secs_f32(), "narration playing");
        Ok(())
    }

    /// Suspend while `Playing`, resume while `Paused`, otherwise do nothing.
    ///
    /// Returns the resulting state.
    ///
    /// # Errors
    ///
    /// Propagates output suspend/resume failures; the state is unchanged then.
    pub fn pause_or_resume(&self, session: &mut AudioSession) -> Result<PlaybackState> {
        let current = self.state();
        let Some(output) = session.existing_output() else {
            return Ok(current);
        };
        let next = match current {
            PlaybackState::Playing => {
                output.suspend()?;
                PlaybackState::Paused
            }
            PlaybackState::Paused => {
                output.resume()?;
                PlaybackState::Playing
            }
            PlaybackState::Idle | PlaybackState::Loading => return Ok(current),
        };
        self.set(next);
        debug!(?next, "playback toggled");
        Ok(next)
    }

    /// Halt any source, un-suspend the output and return to `Idle`.
    pub fn stop(&self, session: &mut AudioSession) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(output) = session.existing_output() {
            output.halt();
            if output.is_suspended() {
                if let Err(e) = output.resume() {
                    warn!(error = %e, "could not resume output after stop");
                }
            }
        }
        if self.set(PlaybackState::Idle) {
            debug!("playback stopped");
        }
    }

    fn set(&self, next: PlaybackState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        })
    }
}
