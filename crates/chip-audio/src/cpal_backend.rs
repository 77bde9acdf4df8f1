//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput, RenderCallback};

/// CPAL output on the host's default device.
///
/// The device is looked up when the stream is opened, so constructing a
/// `CpalOutput` never fails.
pub struct CpalOutput {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn open(&mut self, sample_rate: u32, channels: u16, mut callback: RenderCallback) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Err(AudioError::AlreadyOpen);
        }
        if channels == 0 {
            return Err(AudioError::DeviceInit("channel count must be at least 1".into()));
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let default_config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let supported: Vec<(u16, u32, u32)> = device
            .supported_output_configs()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?
            .filter(|range| range.sample_format() == SampleFormat::F32)
            .map(|range| (range.channels(), range.min_sample_rate().0, range.max_sample_rate().0))
            .collect();

        // Many devices refuse mono streams; render mono and fan it out to the device's layout
        let width = device_width(channels, default_config.channels(), &supported, sample_rate);
        if let Ok(name) = device.name() {
            log::info!(
                "opening output device '{}' at {} Hz, {} channel(s) for {} rendered",
                name,
                sample_rate,
                width,
                channels
            );
        }

        let config = StreamConfig {
            channels: width,
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Default,
        };

        let running = self.running.clone();
        let width = width as usize;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    render_interleaved(&mut callback, data, width);
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let stream = self.stream.as_ref().ok_or(AudioError::NotOpen)?;
        self.running.store(true, Ordering::Relaxed);
        stream.play().map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        self.stream = None;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

/// Pick the interleaved channel count to open the device with.
///
/// `supported` lists `(channels, min_rate, max_rate)` for each f32 config the
/// device offers. The requested width wins when the device takes it at
/// `sample_rate`, then the device's default width, then any width it takes.
/// Never narrower than `requested`.
fn device_width(requested: u16, default_width: u16, supported: &[(u16, u32, u32)], sample_rate: u32) -> u16 {
    let takes = |width: u16| {
        supported
            .iter()
            .any(|&(channels, min, max)| channels == width && (min..=max).contains(&sample_rate))
    };
    let width = if takes(requested) {
        requested
    } else if takes(default_width) {
        default_width
    } else {
        supported
            .iter()
            .find(|&&(channels, min, max)| channels >= requested && (min..=max).contains(&sample_rate))
            .map_or(default_width, |&(channels, _, _)| channels)
    };
    width.max(requested)
}

/// Run the mono `callback` over the front of `data`, then interleave its
/// output across `width` device channels.
fn render_interleaved(callback: &mut impl FnMut(&mut [f32]), data: &mut [f32], width: usize) {
    let frames = data.len() / width.max(1);
    callback(&mut data[..frames]);
    spread_mono(data, frames, width);
}

/// Expand `frames` mono samples at the front of `data` into interleaved
/// frames of `width` channels, in place.
fn spread_mono(data: &mut [f32], frames: usize, width: usize) {
    if width <= 1 {
        return;
    }
    // Back to front so no mono sample is overwritten before it is read
    for i in (0..frames).rev() {
        let sample = data[i];
        data[i * width..(i + 1) * width].fill(sample);
    }
    data[frames * width..].fill(0.0);
}
