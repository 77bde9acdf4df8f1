//! Headless output device pulled by the caller instead of a sound card.
//!
//! Useful for driving a session from tests or for embedding the player
//! where some other component owns the audio clock.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput, RenderCallback};

#[derive(Default)]
struct Shared {
    callback: Mutex<Option<RenderCallback>>,
    running: AtomicBool,
}

/// Output whose callback runs only when [`ManualHandle::pull`] is called.
pub struct ManualOutput {
    shared: Arc<Shared>,
    fail_open: bool,
}

/// Caller side of a [`ManualOutput`].
#[derive(Clone)]
pub struct ManualHandle {
    shared: Arc<Shared>,
}

impl ManualOutput {
    pub fn new() -> (Self, ManualHandle) {
        let shared = Arc::new(Shared::default());
        let output = Self {
            shared: shared.clone(),
            fail_open: false,
        };
        (output, ManualHandle { shared })
    }

    /// An output that behaves like a machine without a sound card.
    pub fn unavailable() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            fail_open: true,
        }
    }
}

impl AudioOutput for ManualOutput {
    fn open(&mut self, _sample_rate: u32, channels: u16, callback: RenderCallback) -> Result<(), AudioError> {
        if self.fail_open {
            return Err(AudioError::NoDevice);
        }
        if channels != 1 {
            return Err(AudioError::DeviceInit(format!("manual output is mono, got {} channels", channels)));
        }
        let mut slot = self.shared.callback.lock();
        if slot.is_some() {
            return Err(AudioError::AlreadyOpen);
        }
        *slot = Some(callback);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        if !self.is_open() {
            return Err(AudioError::NotOpen);
        }
        self.shared.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.shared.running.store(false, Ordering::Release);
        Ok(())
    }

    fn close(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.callback.lock().take();
    }

    fn is_open(&self) -> bool {
        self.shared.callback.lock().is_some()
    }
}

impl ManualHandle {
    /// Request `frames` samples, the way a device would.
    pub fn pull(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.pull_into(&mut out);
        out
    }

    /// Fill `out` through the callback, or with silence while stopped.
    pub fn pull_into(&self, out: &mut [f32]) {
        let mut slot = self.shared.callback.lock();
        match slot.as_mut() {
            Some(callback) if self.shared.running.load(Ordering::Acquire) => callback(out),
            _ => out.fill(0.0),
        }
    }

    pub fn is_open(&self) -> bool {
        self.shared.callback.lock().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_runs_callback_only_while_started() {
        let (mut output, handle) = ManualOutput::new();
        output
            .open(44100, 1, Box::new(|out: &mut [f32]| out.fill(0.5)))
            .unwrap();

        assert_eq!(handle.pull(2), vec![0.0, 0.0]);
        output.start().unwrap();
        assert_eq!(handle.pull(2), vec![0.5, 0.5]);
        output.stop().unwrap();
        assert_eq!(handle.pull(2), vec![0.0, 0.0]);
    }

    #[test]
    fn close_drops_callback() {
        let (mut output, handle) = ManualOutput::new();
        output.open(44100, 1, Box::new(|_: &mut [f32]| {})).unwrap();
        assert!(handle.is_open());
        output.close();
        assert!(!handle.is_open());
        assert!(matches!(output.start(), Err(AudioError::NotOpen)));
    }

    #[test]
    fn second_open_is_rejected() {
        let (mut output, _handle) = ManualOutput::new();
        output.open(44100, 1, Box::new(|_: &mut [f32]| {})).unwrap();
        let again = output.open(44100, 1, Box::new(|_: &mut [f32]| {}));
        assert!(matches!(again, Err(AudioError::AlreadyOpen)));
    }

    #[test]
    fn unavailable_output_fails_to_open() {
        let mut output = ManualOutput::unavailable();
        let result = output.open(44100, 1, Box::new(|_: &mut [f32]| {}));
        assert!(matches!(result, Err(AudioError::NoDevice)));
        assert!(!output.is_open());
    }
}
