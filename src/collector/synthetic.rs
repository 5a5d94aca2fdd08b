//! Synthetic sensor sources for demos and soak runs.
//!
//! Each source runs its pattern on a background thread and delivers samples
//! through a bounded channel, the same way a hardware collector would. The
//! patterns are deterministic so runs are reproducible.

use crate::collector::types::{AudioSpectrum, Frame, MotionSample};
use crate::collector::SensorSource;
use crate::error::SourceError;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A deterministic sample generator.
pub trait Pattern: Clone + Send + 'static {
    type Sample: Send + 'static;

    fn name(&self) -> &'static str;

    /// Delay between samples.
    fn interval(&self) -> Duration;

    /// Produce the sample for `index`, or `None` to skip this slot.
    fn generate(&mut self, index: u64) -> Option<Self::Sample>;
}

/// A [`SensorSource`] that drives a [`Pattern`] on a background thread.
pub struct SyntheticSource<P: Pattern> {
    pattern: P,
    sender: Sender<P::Sample>,
    receiver: Receiver<P::Sample>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl<P: Pattern> SyntheticSource<P> {
    pub fn new(pattern: P) -> Self {
        let (sender, receiver) = bounded(16);
        Self {
            pattern,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

impl<P: Pattern> SensorSource for SyntheticSource<P> {
    type Sample = P::Sample;

    fn name(&self) -> &'static str {
        self.pattern.name()
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let sender = self.sender.clone();
        let running = self.running.clone();
        let mut pattern = self.pattern.clone();
        let name = pattern.name();

        let handle = thread::Builder::new()
            .name(format!("synthetic-{name}"))
            .spawn(move || {
                let interval = pattern.interval();
                let mut index = 0u64;
                while running.load(Ordering::SeqCst) {
                    if let Some(sample) = pattern.generate(index) {
                        // Don't block if the channel is full - just drop the sample
                        let _ = sender.try_send(sample);
                    }
                    index += 1;
                    thread::sleep(interval);
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SourceError::SpawnFailed {
                    source_name: name,
                    reason: e.to_string(),
                }
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        while self.receiver.try_recv().is_ok() {}
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn latest(&mut self) -> Option<P::Sample> {
        self.receiver.try_iter().last()
    }
}

impl<P: Pattern> Drop for SyntheticSource<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Small xorshift generator so patterns stay reproducible without a RNG crate.
#[derive(Debug, Clone)]
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn unit(&mut self) -> f64 {
        (self.next() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// A dark room with a drifting bright square and periodic light flashes.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Emit a brightened frame every `flash_every` frames
    pub flash_every: Option<u64>,
    /// Stop delivering frames after this many, simulating a stalled device
    pub stall_after: Option<u64>,
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            fps: 15,
            flash_every: Some(90),
            stall_after: None,
        }
    }
}

impl SyntheticCamera {
    pub fn into_source(self) -> SyntheticSource<Self> {
        SyntheticSource::new(self)
    }

    fn render(&self, index: u64) -> Vec<u8> {
        let (w, h) = (self.width as usize, self.height as usize);
        let side = (w.min(h) / 6).max(1);
        let span = w.saturating_sub(side).max(1);
        let left = (index as usize * 3) % span;
        let top = h / 2 - side.min(h / 2) / 2;

        let flash = self
            .flash_every
            .map(|every| every > 0 && index > 0 && index % every == 0)
            .unwrap_or(false);
        let base: [u8; 3] = if flash { [150, 150, 160] } else { [30, 30, 40] };

        let mut pixels = Vec::with_capacity(w * h * 4);
        for y in 0..h {
            for x in 0..w {
                let inside = x >= left && x < left + side && y >= top && y < top + side;
                let [r, g, b] = if inside { [220, 220, 230] } else { base };
                pixels.extend_from_slice(&[r, g, b, 255]);
            }
        }
        pixels
    }
}

impl Pattern for SyntheticCamera {
    type Sample = Frame;

    fn name(&self) -> &'static str {
        "camera"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }

    fn generate(&mut self, index: u64) -> Option<Frame> {
        if self.stall_after.is_some_and(|limit| index >= limit) {
            return None;
        }
        Frame::new(self.width, self.height, self.render(index)).ok()
    }
}

/// Low background noise with a loud burst every `peak_every` snapshots.
#[derive(Debug, Clone)]
pub struct SyntheticMicrophone {
    pub bins: usize,
    pub rate_hz: u32,
    pub peak_every: Option<u64>,
    noise: XorShift,
}

impl Default for SyntheticMicrophone {
    fn default() -> Self {
        Self {
            bins: 1024,
            rate_hz: 30,
            peak_every: Some(150),
            noise: XorShift(0x9E37_79B9_7F4A_7C15),
        }
    }
}

impl SyntheticMicrophone {
    pub fn into_source(self) -> SyntheticSource<Self> {
        SyntheticSource::new(self)
    }
}

impl Pattern for SyntheticMicrophone {
    type Sample = AudioSpectrum;

    fn name(&self) -> &'static str {
        "microphone"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.rate_hz.max(1)))
    }

    fn generate(&mut self, index: u64) -> Option<AudioSpectrum> {
        let burst = self
            .peak_every
            .is_some_and(|every| every > 0 && index > 0 && index % every == 0);
        let mut magnitudes: Vec<f32> = (0..self.bins)
            .map(|_| (self.noise.unit() * 80.0) as f32)
            .collect();
        if burst {
            let centre = self.bins / 8;
            for bin in magnitudes.iter_mut().skip(centre).take(16) {
                *bin = 255.0;
            }
        }
        Some(AudioSpectrum::new(magnitudes))
    }
}

/// A device resting on a table, knocked every `shake_every` samples.
#[derive(Debug, Clone)]
pub struct SyntheticMotion {
    pub rate_hz: u32,
    pub shake_every: Option<u64>,
    noise: XorShift,
}

impl Default for SyntheticMotion {
    fn default() -> Self {
        Self {
            rate_hz: 5,
            shake_every: Some(60),
            noise: XorShift(0xD1B5_4A32_D192_ED03),
        }
    }
}

impl SyntheticMotion {
    pub fn into_source(self) -> SyntheticSource<Self> {
        SyntheticSource::new(self)
    }
}

impl Pattern for SyntheticMotion {
    type Sample = MotionSample;

    fn name(&self) -> &'static str {
        "motion"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.rate_hz.max(1)))
    }

    fn generate(&mut self, index: u64) -> Option<MotionSample> {
        let shake = self
            .shake_every
            .is_some_and(|every| every > 0 && index > 0 && index % every == 0);
        let jitter = self.noise.unit() - 0.5;
        let z = if shake { 24.0 } else { 9.81 + jitter * 0.2 };
        Some(MotionSample::acceleration(jitter * 0.1, jitter * 0.1, z))
    }
}
