//! Sensor acquisition boundary for the Ghostwatch agent.
//!
//! Platform code (camera, microphone, motion sensor, object classifier)
//! lives outside this crate. It plugs in through two capabilities:
//!
//! - [`SensorSource`]: a start/stop-able stream whose newest sample can be
//!   taken without blocking.
//! - [`Classifier`]: a blocking labeller for a single frame.
//!
//! [`ChannelSource`] adapts any push-based platform callback into a
//! [`SensorSource`]. The `synthetic` sources generate test patterns on
//! background threads for demos.

pub mod channel;
pub mod synthetic;
pub mod types;

pub use channel::{ChannelSource, SourceFeeder};
pub use synthetic::{SyntheticCamera, SyntheticMicrophone, SyntheticMotion};
pub use types::{
    Acceleration, AudioSpectrum, BoundingBox, Classification, Frame, MotionSample, RotationRate,
};

use crate::error::{ClassifierError, SourceError};

/// A restartable sensor stream.
///
/// `stop` must be idempotent and must release the device. `latest` drains
/// whatever arrived since the previous call and returns only the newest
/// sample; older samples are discarded.
pub trait SensorSource: Send {
    type Sample;

    /// Short name used in logs ("camera", "microphone", ...).
    fn name(&self) -> &'static str;

    /// Acquire the device and begin producing samples.
    fn start(&mut self) -> Result<(), SourceError>;

    /// Stop producing samples and release the device.
    ///
    /// May block until the device is released, for example while joining a
    /// capture thread. Keep it bounded.
    fn stop(&mut self);

    /// Check if the source is currently producing samples.
    fn is_running(&self) -> bool;

    /// Take the newest sample, if any arrived since the last call.
    fn latest(&mut self) -> Option<Self::Sample>;
}

pub type VideoSource = Box<dyn SensorSource<Sample = Frame>>;
pub type AudioSource = Box<dyn SensorSource<Sample = AudioSpectrum>>;
pub type MotionSource = Box<dyn SensorSource<Sample = MotionSample>>;

/// The three sensor streams a pipeline supervises.
pub struct SensorSources {
    pub video: VideoSource,
    pub audio: AudioSource,
    pub motion: MotionSource,
}

impl SensorSources {
    pub fn new(video: VideoSource, audio: AudioSource, motion: MotionSource) -> Self {
        Self {
            video,
            audio,
            motion,
        }
    }
}

/// An object classifier.
///
/// Inference is blocking; the pipeline runs it off the tick loop and keeps
/// at most one request in flight.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, frame: &Frame) -> Result<Vec<Classification>, ClassifierError>;
}

impl<F> Classifier for F
where
    F: Fn(&Frame) -> Result<Vec<Classification>, ClassifierError> + Send + Sync + 'static,
{
    fn classify(&self, frame: &Frame) -> Result<Vec<Classification>, ClassifierError> {
        self(frame)
    }
}
