//! Integration tests for the pipeline runner

use ghostwatch_agent::collector::{
    AudioSpectrum, BoundingBox, ChannelSource, Classification, Frame, MotionSample, SensorSource,
    SensorSources, SourceFeeder,
};
use ghostwatch_agent::error::{ClassifierError, SourceError};
use ghostwatch_agent::{AlertEvent, AlertKind, Config, Pipeline, PipelineStatus, RestartOutcome};
use pretty_assertions::assert_eq;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Feeders {
    video: SourceFeeder<Frame>,
    audio: SourceFeeder<AudioSpectrum>,
    motion: SourceFeeder<MotionSample>,
}

fn channel_sources() -> (SensorSources, Feeders) {
    let (video, video_feed) = ChannelSource::new("camera");
    let (audio, audio_feed) = ChannelSource::new("microphone");
    let (motion, motion_feed) = ChannelSource::new("motion");
    (
        SensorSources::new(Box::new(video), Box::new(audio), Box::new(motion)),
        Feeders {
            video: video_feed,
            audio: audio_feed,
            motion: motion_feed,
        },
    )
}

/// A 10x10 grey frame with the first `changed` pixels brightened.
fn frame(changed: usize) -> Frame {
    let mut pixels = Vec::with_capacity(400);
    for i in 0..100 {
        let v = if i < changed { 200 } else { 100 };
        pixels.extend_from_slice(&[v, v, v, 255]);
    }
    Frame::new(10, 10, pixels).unwrap()
}

fn drain(pipeline: &Pipeline) -> Vec<AlertEvent> {
    pipeline.alerts().try_iter().collect()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn test_start_and_stop() {
    let (sources, feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();

    assert_eq!(pipeline.start().await, Ok(PipelineStatus::Running));
    assert_eq!(pipeline.status(), PipelineStatus::Running);
    assert!(feeds.video.is_running());
    assert!(feeds.audio.is_running());
    assert!(feeds.motion.is_running());

    pipeline.stop().await;
    assert_eq!(pipeline.status(), PipelineStatus::Stopped);
    assert!(!feeds.video.is_running());
    assert!(!feeds.audio.is_running());
    assert!(!feeds.motion.is_running());

    // Idempotent
    pipeline.stop().await;
    assert_eq!(pipeline.status(), PipelineStatus::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_frames_raise_motion_alert() {
    let (sources, feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();
    pipeline.start().await.unwrap();

    assert!(feeds.video.push(frame(0)));
    settle().await;
    assert!(feeds.video.push(frame(3)));
    settle().await;

    let alerts = drain(&pipeline);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Motion);
    assert_eq!(alerts[0].message, "GHOST-LIKE MOTION DETECTED");
    assert_eq!(pipeline.trails().len(), 1);
    assert_eq!(pipeline.activity().stats().frames_processed, 2);

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_restarted_session_raises_alerts_again() {
    let (sources, feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();

    // Both sessions fit inside one alert hold window
    for _ in 0..2 {
        pipeline.start().await.unwrap();
        feeds.video.push(frame(0));
        settle().await;
        feeds.video.push(frame(3));
        settle().await;
        pipeline.stop().await;

        let alerts = drain(&pipeline);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Motion);
    }
}

#[tokio::test(start_paused = true)]
async fn test_audio_and_device_motion_alerts() {
    let (sources, feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();
    pipeline.start().await.unwrap();

    feeds.audio.push(AudioSpectrum::new(vec![12.0, 251.0, 40.0]));
    feeds.motion.push(MotionSample::acceleration(0.0, 16.0, 0.0));
    settle().await;

    let mut kinds: Vec<AlertKind> = drain(&pipeline).into_iter().map(|a| a.kind).collect();
    kinds.sort_by_key(|k| k.to_string());
    assert_eq!(kinds, vec![AlertKind::AudioPeak, AlertKind::DeviceMotion]);

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_missed_heartbeat_restarts_streams() {
    let (sources, feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();
    pipeline.start().await.unwrap();
    assert_eq!(feeds.video.start_count(), 1);

    // Start arms the watchdog, so the first check at 2s passes and the
    // second at 4s misses.
    tokio::time::sleep(Duration::from_millis(4500)).await;

    assert_eq!(feeds.video.start_count(), 2);
    assert_eq!(feeds.video.stop_count(), 1);
    assert_eq!(feeds.audio.start_count(), 2);
    assert_eq!(pipeline.activity().stats().restarts, 1);
    assert_eq!(pipeline.status(), PipelineStatus::Running);
    assert!(pipeline.watchdog_state().total_misses >= 1);

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stalled_camera_restarts_every_interval() {
    let (sources, feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();
    pipeline.start().await.unwrap();

    // Checks at 4, 6, 8, 10 and 12s all miss
    tokio::time::sleep(Duration::from_millis(12_500)).await;

    assert_eq!(pipeline.activity().stats().restarts, 5);
    assert_eq!(feeds.video.start_count(), 6);
    let watchdog = pipeline.watchdog_state();
    assert_eq!(watchdog.consecutive_misses, 5);
    assert_eq!(watchdog.total_misses, 5);

    // A frame after the last restart ends the streak
    feeds.video.push(frame(0));
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(pipeline.watchdog_state().consecutive_misses, 0);
    assert_eq!(pipeline.activity().stats().restarts, 5);

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_flowing_frames_keep_streams_alive() {
    let (sources, feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();
    pipeline.start().await.unwrap();

    for _ in 0..20 {
        feeds.video.push(frame(0));
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    assert_eq!(feeds.video.start_count(), 1);
    assert_eq!(pipeline.activity().stats().restarts, 0);
    assert_eq!(pipeline.watchdog_state().consecutive_misses, 0);

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_source_degrades_then_recovers() {
    let (sources, feeds) = channel_sources();
    feeds.audio.set_available(false);
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();

    assert_eq!(pipeline.start().await, Ok(PipelineStatus::Degraded));
    assert!(feeds.video.is_running());
    assert!(!feeds.audio.is_running());
    assert!(feeds.motion.is_running());

    // Remaining sources keep producing alerts
    feeds.motion.push(MotionSample::rotation(0.0, 250.0, 0.0));
    settle().await;
    assert_eq!(drain(&pipeline)[0].kind, AlertKind::DeviceMotion);

    feeds.audio.set_available(true);
    assert_eq!(pipeline.force_restart().await, Ok(RestartOutcome::Recovered));
    assert_eq!(pipeline.status(), PipelineStatus::Running);
    assert!(feeds.audio.is_running());

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_restart_stays_degraded() {
    let (sources, feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();
    pipeline.start().await.unwrap();

    feeds.video.set_available(false);
    let outcome = pipeline.force_restart().await.unwrap();
    assert!(matches!(outcome, RestartOutcome::Degraded { ref failures } if failures.len() == 1));
    assert_eq!(pipeline.status(), PipelineStatus::Degraded);
    assert_eq!(pipeline.activity().stats().restart_failures, 1);

    pipeline.stop().await;
    assert!(!feeds.audio.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_status_subscription_sees_restart() {
    let (sources, _feeds) = channel_sources();
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();
    let mut status = pipeline.subscribe_status();

    pipeline.start().await.unwrap();
    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), PipelineStatus::Running);

    pipeline.force_restart().await.unwrap();
    assert_eq!(*status.borrow_and_update(), PipelineStatus::Running);
    assert_eq!(pipeline.activity().stats().restarts, 1);

    pipeline.stop().await;
    assert_eq!(*status.borrow_and_update(), PipelineStatus::Stopped);
}

/// Records every start and stop into a shared journal.
struct JournalSource<T> {
    name: &'static str,
    running: bool,
    journal: Arc<Mutex<Vec<String>>>,
    _sample: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> JournalSource<T> {
    fn boxed(
        name: &'static str,
        journal: &Arc<Mutex<Vec<String>>>,
    ) -> Box<dyn SensorSource<Sample = T>> {
        Box::new(Self {
            name,
            running: false,
            journal: journal.clone(),
            _sample: PhantomData,
        })
    }

    fn record(&self, event: &str) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{event}:{}", self.name));
    }
}

impl<T: Send + 'static> SensorSource for JournalSource<T> {
    type Sample = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn start(&mut self) -> Result<(), SourceError> {
        self.running = true;
        self.record("start");
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        self.record("stop");
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn latest(&mut self) -> Option<T> {
        None
    }
}

#[tokio::test(start_paused = true)]
async fn test_restart_stops_everything_before_starting() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let sources = SensorSources::new(
        JournalSource::boxed("camera", &journal),
        JournalSource::boxed("microphone", &journal),
        JournalSource::boxed("motion", &journal),
    );
    let pipeline = Pipeline::new(Config::default(), sources, None).unwrap();
    pipeline.start().await.unwrap();
    journal.lock().unwrap().clear();

    assert_eq!(pipeline.force_restart().await, Ok(RestartOutcome::Recovered));

    let entries = journal.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "stop:camera",
            "stop:microphone",
            "stop:motion",
            "start:camera",
            "start:microphone",
            "start:motion",
        ]
    );

    pipeline.stop().await;
}

/// A camera whose `stop` blocks while the gate is closed.
struct GatedCamera {
    running: bool,
    closed: Arc<AtomicBool>,
    entered: crossbeam_channel::Sender<()>,
    release: crossbeam_channel::Receiver<()>,
}

impl SensorSource for GatedCamera {
    type Sample = Frame;

    fn name(&self) -> &'static str {
        "camera"
    }

    fn start(&mut self) -> Result<(), SourceError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(Duration::from_secs(5));
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn latest(&mut self) -> Option<Frame> {
        None
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_restart_is_rejected() {
    let closed = Arc::new(AtomicBool::new(false));
    let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);
    let camera = GatedCamera {
        running: false,
        closed: closed.clone(),
        entered: entered_tx,
        release: release_rx,
    };
    let (audio, _) = ChannelSource::<AudioSpectrum>::new("microphone");
    let (motion, _) = ChannelSource::<MotionSample>::new("motion");
    let sources = SensorSources::new(Box::new(camera), Box::new(audio), Box::new(motion));

    let pipeline = Arc::new(Pipeline::new(Config::default(), sources, None).unwrap());
    pipeline.start().await.unwrap();

    closed.store(true, Ordering::SeqCst);
    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.force_restart().await }
    });

    // Wait until the first restart is blocked inside teardown
    tokio::task::spawn_blocking(move || entered_rx.recv_timeout(Duration::from_secs(5)))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        pipeline.force_restart().await,
        Ok(RestartOutcome::AlreadyInProgress)
    );

    closed.store(false, Ordering::SeqCst);
    release_tx.send(()).unwrap();
    assert_eq!(first.await.unwrap(), Ok(RestartOutcome::Recovered));
    assert_eq!(pipeline.activity().stats().restarts, 1);

    pipeline.stop().await;
    assert_eq!(pipeline.status(), PipelineStatus::Stopped);
}

/// A camera whose `stop` holds the calling thread once armed.
struct SlowStopCamera {
    running: bool,
    armed: Arc<AtomicBool>,
    progress: Arc<AtomicUsize>,
    advanced: Arc<Mutex<Option<usize>>>,
}

impl SensorSource for SlowStopCamera {
    type Sample = Frame;

    fn name(&self) -> &'static str {
        "camera"
    }

    fn start(&mut self) -> Result<(), SourceError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            let before = self.progress.load(Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            let after = self.progress.load(Ordering::SeqCst);
            *self.advanced.lock().unwrap() = Some(after - before);
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn latest(&mut self) -> Option<Frame> {
        None
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_blocking_stop_leaves_runtime_responsive() {
    let armed = Arc::new(AtomicBool::new(false));
    let progress = Arc::new(AtomicUsize::new(0));
    let advanced = Arc::new(Mutex::new(None));
    let camera = SlowStopCamera {
        running: false,
        armed: armed.clone(),
        progress: progress.clone(),
        advanced: advanced.clone(),
    };
    let (audio, _) = ChannelSource::<AudioSpectrum>::new("microphone");
    let (motion, _) = ChannelSource::<MotionSample>::new("motion");
    let sources = SensorSources::new(Box::new(camera), Box::new(audio), Box::new(motion));

    let pipeline = Arc::new(Pipeline::new(Config::default(), sources, None).unwrap());
    pipeline.start().await.unwrap();

    let counter = tokio::spawn({
        let progress = progress.clone();
        async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                progress.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    // The restart runs on the only worker thread
    armed.store(true, Ordering::SeqCst);
    let restart = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.force_restart().await }
    });
    assert_eq!(restart.await.unwrap(), Ok(RestartOutcome::Recovered));
    counter.abort();

    let advanced = advanced.lock().unwrap().take().expect("camera never stopped");
    assert!(advanced >= 5, "other tasks advanced {advanced} times during stop");

    pipeline.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_entity_alert_from_classifier() {
    let (sources, feeds) = channel_sources();
    let classifier = |_: &Frame| -> Result<Vec<Classification>, ClassifierError> {
        Ok(vec![
            Classification::new("person", 0.95, BoundingBox::default()),
            Classification::new("dog", 0.7, BoundingBox::default()),
        ])
    };
    let pipeline = Pipeline::new(Config::default(), sources, Some(Arc::new(classifier))).unwrap();
    pipeline.start().await.unwrap();

    feeds.video.push(frame(0));

    let mut unknown = None;
    for _ in 0..100 {
        if let Some(alert) = drain(&pipeline)
            .into_iter()
            .find(|a| a.kind == AlertKind::UnknownEntity)
        {
            unknown = Some(alert);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let alert = unknown.expect("no unknown-entity alert");
    assert!(alert.message.contains("dog"));
    assert_eq!(alert.confidence, Some(0.7));

    pipeline.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_classification_never_overlaps() {
    let (sources, feeds) = channel_sources();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));

    let classifier = {
        let in_flight = in_flight.clone();
        let max_in_flight = max_in_flight.clone();
        let calls = calls.clone();
        move |_: &Frame| -> Result<Vec<Classification>, ClassifierError> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(120));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(ClassifierError::Inference("model busy".to_string()))
        }
    };
    let pipeline = Pipeline::new(Config::default(), sources, Some(Arc::new(classifier))).unwrap();
    pipeline.start().await.unwrap();

    for _ in 0..20 {
        feeds.video.push(frame(0));
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    pipeline.stop().await;

    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    let calls = calls.load(Ordering::SeqCst);
    assert!(calls >= 1 && calls < 20, "classifier ran {calls} times");
    assert_eq!(
        pipeline.activity().stats().classifier_failures,
        calls as u64
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_classifier_counts_as_failure() {
    let (sources, feeds) = channel_sources();
    let classifier = |_: &Frame| -> Result<Vec<Classification>, ClassifierError> {
        panic!("model crashed")
    };
    let pipeline = Pipeline::new(Config::default(), sources, Some(Arc::new(classifier))).unwrap();
    pipeline.start().await.unwrap();

    // The slot reopens after each panic, so later frames are classified too
    for expected in 1..=2u64 {
        feeds.video.push(frame(0));
        for _ in 0..100 {
            if pipeline.activity().stats().classifier_failures >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(pipeline.activity().stats().classifier_failures >= expected);
    }
    assert_eq!(pipeline.status(), PipelineStatus::Running);

    pipeline.stop().await;
}
