//! State shared between the controller and the channel producers.
//!
//! Carries the stop signal, lets producers sleep on a monotonic deadline
//! that `stop` can cut short, and records how far each channel has got.

use chip_ir::{ChannelKind, CHANNEL_COUNT};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
struct ChannelProgress {
    /// Events rendered and appended
    steps: AtomicU64,
    /// Samples appended to the channel buffer
    samples: AtomicU64,
    /// Producer thread has exited its loop
    done: AtomicBool,
}

#[derive(Default)]
pub struct Transport {
    stopped: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
    channels: [ChannelProgress; CHANNEL_COUNT],
    failures: AtomicU64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every producer to halt and wake any that are sleeping.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Sleep until `deadline` or until a stop is requested.
    ///
    /// Returns `true` if the deadline passed with the session still running.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        let mut guard = self.lock.lock();
        while !self.is_stopped() {
            if Instant::now() >= deadline {
                return true;
            }
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                return !self.is_stopped();
            }
        }
        false
    }

    pub fn sleep_for(&self, duration: Duration) -> bool {
        self.sleep_until(Instant::now() + duration)
    }

    /// Record that `channel` has appended `step` events totalling `samples` samples.
    pub fn advance(&self, channel: ChannelKind, step: u64, samples: u64) {
        let progress = &self.channels[channel.index()];
        progress.samples.store(samples, Ordering::Release);
        progress.steps.store(step, Ordering::Release);
    }

    pub fn steps(&self, channel: ChannelKind) -> u64 {
        self.channels[channel.index()].steps.load(Ordering::Acquire)
    }

    /// Samples every channel has appended so far.
    pub fn appended_samples(&self) -> u64 {
        self.channels
            .iter()
            .map(|p| p.samples.load(Ordering::Acquire))
            .min()
            .unwrap_or(0)
    }

    /// Mark `channel`'s producer as exited.
    pub fn finish(&self, channel: ChannelKind) {
        self.channels[channel.index()].done.store(true, Ordering::Release);
        self.notify();
    }

    pub fn is_finished(&self, channel: ChannelKind) -> bool {
        self.channels[channel.index()].done.load(Ordering::Acquire)
    }

    pub fn all_finished(&self) -> bool {
        self.channels.iter().all(|p| p.done.load(Ordering::Acquire))
    }

    /// Wait up to `timeout` for every producer to exit.
    pub fn wait_all_finished(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.all_finished() {
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                return self.all_finished();
            }
        }
        true
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks replaced with silence after a synthesis failure.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn notify(&self) {
        // Taking the lock orders this wake-up after any in-progress check-then-wait
        let _guard = self.lock.lock();
        self.wake.notify_all();
    }
}

/// Marks a producer finished when dropped, including on unwind.
pub struct FinishGuard<'a> {
    transport: &'a Transport,
    channel: ChannelKind,
}

impl<'a> FinishGuard<'a> {
    pub fn new(transport: &'a Transport, channel: ChannelKind) -> Self {
        Self { transport, channel }
    }
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.transport.finish(self.channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sleep_returns_true_after_deadline() {
        let transport = Transport::new();
        let start = Instant::now();
        assert!(transport.sleep_for(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn stop_cuts_sleep_short() {
        let transport = Arc::new(Transport::new());
        let sleeper = {
            let transport = transport.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let running = transport.sleep_for(Duration::from_secs(10));
                (running, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        transport.request_stop();

        let (running, elapsed) = sleeper.join().unwrap();
        assert!(!running);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn sleep_after_stop_returns_immediately() {
        let transport = Transport::new();
        transport.request_stop();
        assert!(!transport.sleep_for(Duration::from_secs(10)));
    }

    #[test]
    fn appended_samples_is_slowest_channel() {
        let transport = Transport::new();
        transport.advance(ChannelKind::Pulse1, 2, 200);
        transport.advance(ChannelKind::Pulse2, 1, 100);
        transport.advance(ChannelKind::Triangle, 2, 200);
        transport.advance(ChannelKind::Noise, 2, 200);
        assert_eq!(transport.appended_samples(), 100);
        assert_eq!(transport.steps(ChannelKind::Pulse1), 2);
    }

    #[test]
    fn finish_guard_marks_channel_on_drop() {
        let transport = Transport::new();
        {
            let _guard = FinishGuard::new(&transport, ChannelKind::Noise);
            assert!(!transport.is_finished(ChannelKind::Noise));
        }
        assert!(transport.is_finished(ChannelKind::Noise));
        assert!(!transport.all_finished());
    }

    #[test]
    fn wait_all_finished_times_out() {
        let transport = Transport::new();
        transport.finish(ChannelKind::Pulse1);
        assert!(!transport.wait_all_finished(Duration::from_millis(10)));
        for channel in ChannelKind::ALL {
            transport.finish(channel);
        }
        assert!(transport.wait_all_finished(Duration::from_millis(10)));
    }
}
