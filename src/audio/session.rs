//! Output device seam and the lazily opened playback session.

use std::sync::Arc;

use tracing::{debug, info};

use super::pcm::PcmBuffer;
use crate::config::AudioConfig;
use crate::error::Result;

/// Called once when a started buffer has played to its end.
///
/// Not called when the source is stopped early.
pub type CompletionHook = Box<dyn FnOnce() + Send + 'static>;

/// A device output context capable of playing one buffer at a time.
pub trait AudioOutput: Send {
    /// Begin playing `buffer`, replacing any active source.
    ///
    /// # Errors
    ///
    /// Returns [`ComforterError::Audio`](crate::error::ComforterError::Audio)
    /// if the device rejects the stream.
    fn start(&mut self, buffer: PcmBuffer, on_complete: CompletionHook) -> Result<()>;

    /// Suspend the output context, keeping the playback position.
    fn suspend(&mut self) -> Result<()>;

    /// Resume a suspended context.
    fn resume(&mut self) -> Result<()>;

    /// Halt the active source without firing its completion hook.
    /// Idempotent when nothing is playing.
    fn halt(&mut self);

    /// Whether the context is currently suspended.
    fn is_suspended(&self) -> bool;
}

/// Opens [`AudioOutput`] contexts.
pub trait AudioOutputFactory: Send + Sync {
    /// Open an output for `config.sample_rate` / `config.channels`.
    fn open(&self, config: &AudioConfig) -> Result<Box<dyn AudioOutput>>;
}

/// Owns the output context for the lifetime of the app.
///
/// The context is opened on first use and reused afterwards;
/// [`shutdown`](Self::shutdown) releases it.
pub struct AudioSession {
    factory: Arc<dyn AudioOutputFactory>,
    config: AudioConfig,
    output: Option<Box<dyn AudioOutput>>,
}

impl AudioSession {
    pub fn new(factory: Arc<dyn AudioOutputFactory>, config: AudioConfig) -> Self {
        Self {
            factory,
            config,
            output: None,
        }
    }

    /// A session backed by the system's speakers.
    #[cfg(feature = "speaker")]
    pub fn speakers(config: AudioConfig) -> Self {
        Self::new(Arc::new(super::cpal_output::SpeakerFactory), config)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.output.is_some()
    }

    /// The output context, opening it on first call.
    ///
    /// # Errors
    ///
    /// Propagates the factory's error; the next call retries the open.
    pub fn output(&mut self) -> Result<&mut (dyn AudioOutput + 'static)> {
        let output = match self.output.take() {
            Some(output) => output,
            None => {
                info!(sample_rate = self.config.sample_rate, "opening audio output");
                self.factory.open(&self.config)?
            }
        };
        Ok(self.output.insert(output).as_mut())
    }

    /// The output context if it has been opened.
    pub fn existing_output(&mut self) -> Option<&mut (dyn AudioOutput + 'static)> {
        self.output.as_deref_mut()
    }

    /// Release the output context. A later [`output`](Self::output) reopens it.
    pub fn shutdown(&mut self) {
        if let Some(mut output) = self.output.take() {
            debug!("closing audio output");
            output.halt();
        }
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}


#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::error::ComforterError;

    struct NoDevice;

    impl AudioOutputFactory for NoDevice {
        fn open(&self, _config: &AudioConfig) -> Result<Box<dyn AudioOutput>> {
            Err(ComforterError::Audio("no default output device".into()))
        }
    }

    #[test]
    fn output_is_opened_once_and_reused() {
        let (mut session, probe) = fake::session();
        assert!(!session.is_open());
        session.output().unwrap();
        session.output().unwrap();
        assert!(session.is_open());
        assert_eq!(probe.opened(), 1);
    }

    #[test]
    fn shutdown_releases_and_allows_reopen() {
        let (mut session, probe) = fake::session();
        session.output().unwrap();
        session.shutdown();
        assert!(!session.is_open());
        session.shutdown();
        session.output().unwrap();
        assert_eq!(probe.opened(), 2);
    }

    #[test]
    fn open_failure_propagates_and_leaves_session_closed() {
        let mut session = AudioSession::new(Arc::new(NoDevice), AudioConfig::default());
        assert!(matches!(session.output(), Err(ComforterError::Audio(_))));
        assert!(!session.is_open());
        assert!(session.existing_output().is_none());
    }
}
