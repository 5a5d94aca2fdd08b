//! Async pipeline runner.
//!
//! Two tokio tasks drive a [`Pipeline`]:
//!
//! - the tick task polls the sensor sources at `tick_interval` and runs
//!   every detector on the newest samples;
//! - the heartbeat task checks the watchdog at `heartbeat_interval` and
//!   restarts the sensor streams when a heartbeat is missed.
//!
//! The stream supervisor sits behind an async mutex. A tick holds it while it
//! polls and processes; a restart holds it for the whole teardown and
//! re-acquire, so no tick ever observes a half-restarted stream. Source
//! start and stop calls may block, so on a multi-threaded runtime they run
//! under `block_in_place` and the worker's other tasks move elsewhere.

use crate::activity::{create_shared_log, SharedActivityLog};
use crate::alert::AlertEvent;
use crate::collector::{Classifier, SensorSources};
use crate::config::Config;
use crate::core::TrailSnapshot;
use crate::error::{ConfigError, PipelineError};
use crate::pipeline::classify::ClassificationSlot;
use crate::pipeline::context::PipelineContext;
use crate::supervisor::{
    HeartbeatCheck, HeartbeatWatchdog, RestartGuard, RestartOutcome, StreamSupervisor,
    WatchdogState,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard};
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{watch, Mutex};
use tokio::task::{block_in_place, JoinHandle};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Depth of the alert queue handed to the presentation layer.
const ALERT_QUEUE_CAPACITY: usize = 1024;

/// Externally visible pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Initializing,
    Running,
    /// Some sources could not be acquired; the rest keep running.
    Degraded,
    Restarting,
    Stopped,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStatus::Initializing => "initializing",
            PipelineStatus::Running => "running",
            PipelineStatus::Degraded => "degraded",
            PipelineStatus::Restarting => "restarting",
            PipelineStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// State shared by the pipeline handle and its tasks.
struct Shared {
    supervisor: Mutex<StreamSupervisor>,
    context: std::sync::Mutex<PipelineContext>,
    classification: Option<ClassificationSlot>,
    watchdog: HeartbeatWatchdog,
    restart_guard: RestartGuard,
    stopping: AtomicBool,
    status: watch::Sender<PipelineStatus>,
    alerts: Sender<AlertEvent>,
    activity: SharedActivityLog,
}

/// Handles of a started pipeline.
struct Running {
    shutdown: watch::Sender<bool>,
    tick: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// A running anomaly-detection pipeline.
pub struct Pipeline {
    config: Config,
    shared: Arc<Shared>,
    alerts: Receiver<AlertEvent>,
    lifecycle: Mutex<Option<Running>>,
}

impl Pipeline {
    /// Build a pipeline with an in-memory activity log.
    pub fn new(
        config: Config,
        sources: SensorSources,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Result<Self, ConfigError> {
        Self::with_activity_log(config, sources, classifier, create_shared_log())
    }

    /// Build a pipeline that records into `activity`.
    pub fn with_activity_log(
        config: Config,
        sources: SensorSources,
        classifier: Option<Arc<dyn Classifier>>,
        activity: SharedActivityLog,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let (alert_tx, alert_rx) = bounded(ALERT_QUEUE_CAPACITY);
        let (status, _) = watch::channel(PipelineStatus::Stopped);
        let shared = Shared {
            supervisor: Mutex::new(StreamSupervisor::new(sources)),
            context: std::sync::Mutex::new(PipelineContext::new(&config, activity.clone())),
            classification: classifier.map(ClassificationSlot::new),
            watchdog: HeartbeatWatchdog::new(),
            restart_guard: RestartGuard::new(),
            stopping: AtomicBool::new(false),
            status,
            alerts: alert_tx,
            activity,
        };

        Ok(Self {
            config,
            shared: Arc::new(shared),
            alerts: alert_rx,
            lifecycle: Mutex::new(None),
        })
    }

    /// Acquire the sensor sources and spawn the tick and heartbeat tasks.
    ///
    /// Returns `Running`, or `Degraded` when some source could not be
    /// acquired. Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<PipelineStatus, PipelineError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            return Err(PipelineError::AlreadyRunning);
        }

        self.shared.stopping.store(false, Ordering::SeqCst);
        self.shared.set_status(PipelineStatus::Initializing);

        let status = {
            let mut supervisor = self.shared.supervisor.lock().await;
            match blocking(|| supervisor.acquire()) {
                Ok(()) => PipelineStatus::Running,
                Err(failures) => {
                    for failure in &failures {
                        warn!(error = %failure, "Sensor acquisition failed");
                    }
                    PipelineStatus::Degraded
                }
            }
        };
        {
            // A new session starts with no alert held over from the last one
            let mut context = self.shared.context();
            context.reset_streams();
            context.reset_alerts();
        }
        self.shared.watchdog.arm();
        self.shared.set_status(status);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tick = tokio::spawn(run_ticks(
            self.shared.clone(),
            self.config.tick_interval,
            shutdown_rx.clone(),
        ));
        let heartbeat = tokio::spawn(run_heartbeat(
            self.shared.clone(),
            self.config.heartbeat_interval,
            shutdown_rx,
        ));
        *lifecycle = Some(Running {
            shutdown,
            tick,
            heartbeat,
        });

        info!(%status, vision_mode = self.config.vision_mode.as_str(), "Pipeline started");
        self.shared.activity.note(format!("Pipeline started ({status})"));
        Ok(status)
    }

    /// Stop the pipeline and release every sensor source.
    ///
    /// The heartbeat task is stopped first, after any restart it is running
    /// has finished. Calling `stop` on a stopped pipeline does nothing.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(running) = lifecycle.take() else {
            return;
        };

        self.shared.stopping.store(true, Ordering::SeqCst);
        // Receivers are owned by the tasks, which may have exited already
        let _ = running.shutdown.send(true);

        if let Err(e) = running.heartbeat.await {
            warn!("Heartbeat task ended abnormally: {e}");
        }
        if let Err(e) = running.tick.await {
            warn!("Tick task ended abnormally: {e}");
        }

        let mut supervisor = self.shared.supervisor.lock().await;
        blocking(|| supervisor.teardown());
        drop(supervisor);

        self.shared.set_status(PipelineStatus::Stopped);
        self.shared.activity.note("Pipeline stopped");

        if let Err(e) = self.shared.activity.save() {
            warn!("Could not save activity log: {e}");
        }
        info!("Pipeline stopped");
    }

    /// Restart the sensor streams now.
    ///
    /// Shares the watchdog's restart path: a request made while another
    /// restart is in flight returns [`RestartOutcome::AlreadyInProgress`].
    pub async fn force_restart(&self) -> Result<RestartOutcome, PipelineError> {
        if self.lifecycle.lock().await.is_none() {
            return Err(PipelineError::NotRunning);
        }
        self.shared.restart().await
    }

    pub fn status(&self) -> PipelineStatus {
        *self.shared.status.borrow()
    }

    /// Watch status transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<PipelineStatus> {
        self.shared.status.subscribe()
    }

    /// Stream of emitted alerts. Alerts are dropped when nobody drains it.
    pub fn alerts(&self) -> Receiver<AlertEvent> {
        self.alerts.clone()
    }

    /// Motion trails for overlay rendering.
    pub fn trails(&self) -> TrailSnapshot {
        self.shared.context().trails()
    }

    pub fn watchdog_state(&self) -> WatchdogState {
        self.shared.watchdog.state()
    }

    pub fn activity(&self) -> SharedActivityLog {
        self.shared.activity.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Shared {
    fn context(&self) -> MutexGuard<'_, PipelineContext> {
        self.context
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_status(&self, status: PipelineStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(from = %previous, to = %status, "Pipeline status changed");
        }
    }

    fn publish(&self, alert: AlertEvent) {
        match self.alerts.try_send(alert) {
            Ok(()) => {}
            Err(TrySendError::Full(alert)) => {
                debug!(kind = %alert.kind, "Alert queue full, dropping alert");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    async fn tick(&self) {
        let mut supervisor = self.supervisor.lock().await;
        let samples = supervisor.poll();
        let now = Instant::now().into_std();

        let mut alerts = Vec::new();
        let frame = {
            let mut context = self.context();
            if let Some(slot) = &self.classification {
                for result in slot.poll_completed() {
                    alerts.extend(context.process_classifications(result, now));
                }
            }
            let report = context.tick(samples, now);
            alerts.extend(report.alerts);
            report.frame
        };
        drop(supervisor);

        if let Some(frame) = frame {
            self.watchdog.mark_alive();
            if let Some(slot) = &self.classification {
                slot.try_submit(frame);
            }
        }
        for alert in alerts {
            self.publish(alert);
        }
    }

    async fn restart(&self) -> Result<RestartOutcome, PipelineError> {
        let Some(_ticket) = self.restart_guard.try_begin() else {
            debug!("Restart already in progress");
            return Ok(RestartOutcome::AlreadyInProgress);
        };

        let mut supervisor = self.supervisor.lock().await;
        if self.stopping.load(Ordering::SeqCst) {
            return Err(PipelineError::NotRunning);
        }

        self.set_status(PipelineStatus::Restarting);
        let outcome = blocking(|| supervisor.restart());
        // The watchdog is not re-armed: a stalled camera misses the next check too
        self.context().reset_streams();

        let recovered = outcome == RestartOutcome::Recovered;
        self.activity.record_restart(recovered);
        self.set_status(if supervisor.is_degraded() {
            PipelineStatus::Degraded
        } else {
            PipelineStatus::Running
        });
        Ok(outcome)
    }
}

/// Run a source lifecycle call that may block the current thread.
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => block_in_place(f),
        _ => f(),
    }
}

async fn run_ticks(shared: Arc<Shared>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => shared.tick().await,
        }
    }
    debug!("Tick task exited");
}

async fn run_heartbeat(shared: Arc<Shared>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    // First check one full period after start
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                if let HeartbeatCheck::Missed { consecutive_misses } = shared.watchdog.check() {
                    warn!(consecutive_misses, "Heartbeat missed, restarting sensor streams");
                    match shared.restart().await {
                        Ok(RestartOutcome::Degraded { failures }) => {
                            warn!(failures = failures.len(), "Sensor streams still degraded");
                        }
                        Ok(_) => {}
                        Err(e) => debug!("Restart skipped: {e}"),
                    }
                }
            }
        }
    }
    debug!("Heartbeat task exited");
}
