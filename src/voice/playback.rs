//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// How often the blocking loop checks for completion or a stop request
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a playback call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// All samples were played
    Finished,
    /// The stop flag was raised first
    Interrupted,
}

/// Plays audio to the default output device
#[derive(Clone)]
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Decode MP3 bytes and play them until finished or `stop` is raised
    ///
    /// Blocks the calling thread; run it on a blocking task.
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3_blocking(
        &self,
        mp3_data: &[u8],
        stop: &Arc<AtomicBool>,
    ) -> Result<PlaybackEnd> {
        let samples = decode_mp3(mp3_data)?;
        self.play_samples_blocking(samples, stop)
    }

    /// Play samples until finished or `stop` is raised
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built or started
    pub fn play_samples_blocking(
        &self,
        samples: Vec<f32>,
        stop: &Arc<AtomicBool>,
    ) -> Result<PlaybackEnd> {
        if samples.is_empty() {
            return Ok(PlaybackEnd::Finished);
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let config = self.config.clone();
        let channels = usize::from(config.channels);
        let sample_count = samples.len();

        let cursor = Arc::new(OutputCursor::new(samples, Arc::clone(stop)));

        let stream = {
            let cursor = Arc::clone(&cursor);
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        cursor.fill(data, channels);
                    },
                    |err| {
                        tracing::error!(error = %err, "audio playback error");
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);

        let end = loop {
            if stop.load(Ordering::Acquire) {
                break PlaybackEnd::Interrupted;
            }
            if cursor.is_finished() || Instant::now() > deadline {
                break PlaybackEnd::Finished;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        // Dropping the stream halts output immediately
        drop(stream);
        tracing::debug!(samples = sample_count, ?end, "playback ended");

        Ok(end)
    }
}

/// Playback position shared with the output callback
struct OutputCursor {
    samples: Vec<f32>,
    position: AtomicUsize,
    finished: AtomicBool,
    stop: Arc<AtomicBool>,
}

impl OutputCursor {
    fn new(samples: Vec<f32>, stop: Arc<AtomicBool>) -> Self {
        Self {
            samples,
            position: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
            stop,
        }
    }

    /// Fill one output buffer; silence once stopped or exhausted
    fn fill(&self, data: &mut [f32], channels: usize) {
        if self.stop.load(Ordering::Acquire) {
            data.fill(0.0);
            self.finished.store(true, Ordering::Release);
            return;
        }

        let mut pos = self.position.load(Ordering::Relaxed);
        for frame in data.chunks_mut(channels) {
            let sample = self.samples.get(pos).copied().unwrap_or_else(|| {
                self.finished.store(true, Ordering::Release);
                0.0
            });
            frame.fill(sample);
            if pos < self.samples.len() {
                pos += 1;
            }
        }
        self.position.store(pos, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
