//! Speaker output via cpal.
//!
//! cpal streams cannot move between threads, so each [`SpeakerOutput`] owns a
//! worker thread that holds the device and the active stream and obeys
//! commands sent over a channel. A stream that plays to the end reports back
//! to the worker, which drops it so the device is released while idle.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info, warn};

use super::pcm::PcmBuffer;
use super::session::{AudioOutput, AudioOutputFactory, CompletionHook};
use crate::config::AudioConfig;
use crate::error::{ComforterError, Result};

/// Opens the configured (or default) output device.
pub struct SpeakerFactory;

impl AudioOutputFactory for SpeakerFactory {
    fn open(&self, config: &AudioConfig) -> Result<Box<dyn AudioOutput>> {
        Ok(Box::new(SpeakerOutput::open(config)?))
    }
}

enum Command {
    Start(PcmBuffer, CompletionHook, mpsc::Sender<Result<()>>),
    Suspend(mpsc::Sender<Result<()>>),
    Resume(mpsc::Sender<Result<()>>),
    Halt,
    /// The stream with this id played its last sample.
    Finished(u64),
    Shutdown,
}

/// Output context backed by a cpal device.
pub struct SpeakerOutput {
    commands: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
    suspended: bool,
}

impl SpeakerOutput {
    /// Open the output device and start its worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`ComforterError::Audio`] if no matching device is available.
    pub fn open(config: &AudioConfig) -> Result<Self> {
        let (commands, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let config = config.clone();
        let loopback = commands.clone();

        let worker = std::thread::Builder::new()
            .name("comforter-audio".into())
            .spawn(move || match select_device(&config) {
                Ok(device) => {
                    let _ = ready_tx.send(Ok(()));
                    run_worker(device, &config, inbox, loopback);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| ComforterError::Audio(format!("cannot spawn audio thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| ComforterError::Audio("audio thread exited during open".into()))??;

        Ok(Self {
            commands,
            worker: Some(worker),
            suspended: false,
        })
    }

    /// List available output devices.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_output_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| ComforterError::Audio(format!("cannot enumerate devices: {e}")))?;

        let mut names = Vec::new();
        for device in devices {
            if let Ok(desc) = device.description() {
                names.push(desc.name().to_owned());
            }
        }
        Ok(names)
    }

    fn request(&self, build: impl FnOnce(mpsc::Sender<Result<()>>) -> Command) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands
            .send(build(reply_tx))
            .map_err(|_| ComforterError::Audio("audio thread is gone".into()))?;
        reply_rx
            .recv()
            .map_err(|_| ComforterError::Audio("audio thread dropped the reply".into()))?
    }
}

impl AudioOutput for SpeakerOutput {
    fn start(&mut self, buffer: PcmBuffer, on_complete: CompletionHook) -> Result<()> {
        self.request(|reply| Command::Start(buffer, on_complete, reply))?;
        self.suspended = false;
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        self.request(Command::Suspend)?;
        self.suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.request(Command::Resume)?;
        self.suspended = false;
        Ok(())
    }

    fn halt(&mut self) {
        let _ = self.commands.send(Command::Halt);
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }
}

impl Drop for SpeakerOutput {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("audio thread panicked");
            }
        }
    }
}

fn select_device(config: &AudioConfig) -> Result<cpal::Device> {
    let host = cpal::default_host();

    let device = if let Some(ref name) = config.output_device {
        host.output_devices()
            .map_err(|e| ComforterError::Audio(format!("cannot enumerate devices: {e}")))?
            .find(|d| {
                d.description()
                    .ok()
                    .map(|desc| desc.name() == name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| ComforterError::Audio(format!("output device '{name}' not found")))?
    } else {
        host.default_output_device()
            .ok_or_else(|| ComforterError::Audio("no default output device".into()))?
    };

    let device_name = device
        .description()
        .map(|d| d.name().to_owned())
        .unwrap_or_else(|_| "<unknown>".into());
    info!("using output device: {device_name}");
    Ok(device)
}

/// Progress of the source being played.
struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    on_complete: Option<CompletionHook>,
}

/// The stream currently owned by the worker, tagged so that a completion
/// signal from a replaced stream cannot drop its successor.
struct StreamSlot<S> {
    current: Option<(u64, S)>,
    next_id: u64,
}

impl<S> StreamSlot<S> {
    fn new() -> Self {
        Self {
            current: None,
            next_id: 0,
        }
    }

    /// Drop the current stream and reserve the id for its replacement.
    fn reserve(&mut self) -> u64 {
        self.current = None;
        self.next_id += 1;
        self.next_id
    }

    fn install(&mut self, id: u64, stream: S) {
        self.current = Some((id, stream));
    }

    fn get(&self) -> Option<&S> {
        self.current.as_ref().map(|(_, stream)| stream)
    }

    fn clear(&mut self) {
        self.current = None;
    }

    /// Drop the stream if it is still the one with `id`.
    fn finish(&mut self, id: u64) -> bool {
        match &self.current {
            Some((current, _)) if *current == id => {
                self.current = None;
                true
            }
            _ => false,
        }
    }
}

fn run_worker(
    device: cpal::Device,
    config: &AudioConfig,
    inbox: mpsc::Receiver<Command>,
    loopback: mpsc::Sender<Command>,
) {
    let stream_config = StreamConfig {
        channels: config.channels.max(1),
        sample_rate: config.sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };
    let mut active: StreamSlot<cpal::Stream> = StreamSlot::new();

    while let Ok(command) = inbox.recv() {
        match command {
            Command::Start(buffer, on_complete, reply) => {
                // Replacing the stream drops the old source and its hook.
                let id = active.reserve();
                let finished = loopback.clone();
                let hook: CompletionHook = Box::new(move || {
                    on_complete();
                    let _ = finished.send(Command::Finished(id));
                });
                let result = build_stream(&device, &stream_config, buffer, hook);
                let _ = reply.send(result.map(|stream| active.install(id, stream)));
            }
            Command::Suspend(reply) => {
                let result = match active.get() {
                    Some(stream) => stream
                        .pause()
                        .map_err(|e| ComforterError::Audio(format!("failed to pause stream: {e}"))),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
            Command::Resume(reply) => {
                let result = match active.get() {
                    Some(stream) => stream
                        .play()
                        .map_err(|e| {
                            ComforterError::Audio(format!("failed to resume stream: {e}"))
                        }),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
            Command::Halt => active.clear(),
            Command::Finished(id) => {
                if active.finish(id) {
                    debug!("narration finished, output stream released");
                }
            }
            Command::Shutdown => break,
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    stream_config: &StreamConfig,
    buffer: PcmBuffer,
    on_complete: CompletionHook,
) -> Result<cpal::Stream> {
    let shared = Arc::new(Mutex::new(PlaybackBuffer {
        samples: buffer.samples,
        position: 0,
        on_complete: Some(on_complete),
    }));
    let buffer_clone = Arc::clone(&shared);

    let stream = device
        .build_output_stream(
            stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut buf = match buffer_clone.lock() {
                    Ok(b) => b,
                    Err(_) => return,
                };

                for sample in data.iter_mut() {
                    if buf.position < buf.samples.len() {
                        *sample = buf.samples[buf.position];
                        buf.position += 1;
                    } else {
                        *sample = 0.0;
                    }
                }
                if buf.position >= buf.samples.len() {
                    if let Some(hook) = buf.on_complete.take() {
                        hook();
                    }
                }
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| ComforterError::Audio(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| ComforterError::Audio(format!("failed to start output stream: {e}")))?;
    Ok(stream)
}
