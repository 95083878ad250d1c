//! Aggregation worker and its handle.
//!
//! A single task owns the accumulator state. All three input streams funnel
//! into one ordered mailbox, so per-stream arrival order is preserved and
//! the accumulators never need locking. Combined samples leave over a
//! bounded channel without waiting: when the consumer falls behind, samples
//! are dropped and counted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use contracts::{
    AccelerationSample, AggregatorConfig, AngularVelocitySample, CombinedSample, PositionFix,
    SensorEvent, StreamKind, StretchWindowConfig, TimeWindowConfig, WindowPolicy,
};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, instrument, warn};

use crate::stretch::StretchAccumulator;
use crate::time_window::TimeWindowAccumulator;

/// Floor for the flush interval; the ticker cannot run on a zero period
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Messages accepted by the aggregation worker
#[derive(Debug, Clone, Copy)]
enum EngineEvent {
    Acceleration(AccelerationSample),
    AngularVelocity(AngularVelocitySample),
    Position(PositionFix),
    /// An input stream ended or failed; aggregation is over
    SourceClosed(StreamKind),
    /// Explicit teardown
    Dispose,
}

/// Handle to a running aggregation worker
///
/// Push methods are non-blocking and return whether the event was accepted.
/// Events are rejected once disposal has begun, and stop being deliverable
/// after any input stream is reported closed.
pub struct AggregatorHandle {
    /// Mailbox into the worker
    tx: mpsc::UnboundedSender<EngineEvent>,
    /// Set before the Dispose message is sent
    disposed: Arc<AtomicBool>,
    /// Worker task handle, taken by the first disposal
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AggregatorHandle {
    /// Spawn the aggregation worker for the given configuration
    ///
    /// Returns the handle and the output stream. The output channel closes
    /// when the worker stops: after [`dispose`], or as soon as any input
    /// stream is reported closed.
    ///
    /// [`dispose`]: AggregatorHandle::dispose
    pub fn spawn(config: AggregatorConfig) -> (Self, mpsc::Receiver<CombinedSample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::channel(config.output_capacity.max(1));
        let disposed = Arc::new(AtomicBool::new(false));

        let worker_disposed = Arc::clone(&disposed);
        let worker = tokio::spawn(async move {
            match config.policy {
                WindowPolicy::Stretch(stretch) => {
                    run_stretch(stretch, rx, output_tx, worker_disposed).await;
                }
                WindowPolicy::TimeWindow(time_window) => {
                    run_time_window(time_window, rx, output_tx, worker_disposed).await;
                }
            }
        });

        (
            Self {
                tx,
                disposed,
                worker: Mutex::new(Some(worker)),
            },
            output_rx,
        )
    }

    /// Route a sensor event to the worker (non-blocking)
    pub fn push_event(&self, event: SensorEvent) -> bool {
        match event {
            SensorEvent::Acceleration(sample) => self.push_acceleration(sample),
            SensorEvent::AngularVelocity(sample) => self.push_angular_velocity(sample),
            SensorEvent::Position(fix) => self.push_position(fix),
        }
    }

    /// Push an acceleration sample (non-blocking)
    pub fn push_acceleration(&self, sample: AccelerationSample) -> bool {
        self.send(EngineEvent::Acceleration(sample))
    }

    /// Push an angular velocity sample (non-blocking)
    pub fn push_angular_velocity(&self, sample: AngularVelocitySample) -> bool {
        self.send(EngineEvent::AngularVelocity(sample))
    }

    /// Push a position fix (non-blocking)
    pub fn push_position(&self, fix: PositionFix) -> bool {
        self.send(EngineEvent::Position(fix))
    }

    /// Report that an input stream ended or failed
    ///
    /// Any closure is terminal: the worker stops and the output channel
    /// closes once the message is processed.
    pub fn notify_source_closed(&self, kind: StreamKind) -> bool {
        self.send(EngineEvent::SourceClosed(kind))
    }

    /// Whether disposal has begun
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn send(&self, event: EngineEvent) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }
        // Fails only when the worker already stopped
        self.tx.send(event).is_ok()
    }

    /// Tear the worker down
    ///
    /// Idempotent: the first call wins, later calls return immediately.
    /// The disposal flag is raised before the teardown message is sent, so
    /// events still queued in the mailbox are drained without emission.
    #[instrument(name = "aggregator_dispose", skip(self))]
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            debug!("aggregator already disposed");
            return;
        }

        // The worker may already be gone after a source closure
        let _ = self.tx.send(EngineEvent::Dispose);

        let worker = self.worker.lock().await.take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                error!(error = ?e, "aggregation worker panicked");
            }
        }
        debug!("aggregator disposed");
    }
}

/// Worker loop for the stretch policy
async fn run_stretch(
    config: StretchWindowConfig,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    output: mpsc::Sender<CombinedSample>,
    disposed: Arc<AtomicBool>,
) {
    debug!(
        threshold_m = config.min_stretch_length_m,
        "stretch aggregation worker started"
    );
    let mut accumulator = StretchAccumulator::new(&config);

    while let Some(event) = events.recv().await {
        if disposed.load(Ordering::SeqCst) {
            if matches!(event, EngineEvent::Dispose) {
                break;
            }
            continue;
        }

        match event {
            EngineEvent::Acceleration(sample) => accumulator.push_acceleration(sample),
            EngineEvent::AngularVelocity(sample) => accumulator.push_angular_velocity(sample),
            EngineEvent::Position(fix) => {
                if let Some(sample) = accumulator.push_position(fix) {
                    forward(&output, sample, "stretch");
                }
            }
            EngineEvent::SourceClosed(kind) => {
                report_source_closed(kind);
                break;
            }
            EngineEvent::Dispose => break,
        }
    }

    debug!(
        buffered_motion = accumulator.buffered_motion(),
        emitted = accumulator.emitted_count(),
        "stretch aggregation worker stopped"
    );
}

/// Worker loop for the time window policy
async fn run_time_window(
    config: TimeWindowConfig,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    output: mpsc::Sender<CombinedSample>,
    disposed: Arc<AtomicBool>,
) {
    debug!(
        span_ms = config.time_span_ms,
        skip_ms = config.time_skip_ms,
        "time window aggregation worker started"
    );
    let mut accumulator = TimeWindowAccumulator::new(&config);

    let mut ticker = tokio::time::interval(config.skip().max(MIN_TICK_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    debug!("all event senders dropped");
                    break;
                };

                if disposed.load(Ordering::SeqCst) {
                    if matches!(event, EngineEvent::Dispose) {
                        break;
                    }
                    continue;
                }

                match event {
                    EngineEvent::Acceleration(sample) => {
                        accumulator.push_acceleration(sample, Instant::now());
                    }
                    EngineEvent::AngularVelocity(sample) => {
                        accumulator.push_angular_velocity(sample, Instant::now());
                    }
                    EngineEvent::Position(fix) => accumulator.push_position(fix),
                    EngineEvent::SourceClosed(kind) => {
                        report_source_closed(kind);
                        break;
                    }
                    EngineEvent::Dispose => break,
                }
            }
            _ = ticker.tick() => {
                if disposed.load(Ordering::SeqCst) {
                    continue;
                }
                if let Some(sample) = accumulator.flush(Instant::now(), epoch_millis()) {
                    forward(&output, sample, "time_window");
                }
            }
        }
    }

    debug!(
        pairs_buffered = accumulator.pair_count(),
        rejected_pairs = accumulator.rejected_count(),
        "time window aggregation worker stopped"
    );
}

/// Hand a combined sample to the output without waiting
fn forward(output: &mpsc::Sender<CombinedSample>, sample: CombinedSample, policy: &'static str) {
    match output.try_send(sample) {
        Ok(()) => {
            metrics::counter!("roadsync_window_emitted_total", "policy" => policy).increment(1);
        }
        Err(mpsc::error::TrySendError::Full(_)) => {
            metrics::counter!("roadsync_window_output_dropped_total", "policy" => policy)
                .increment(1);
            warn!(policy, "output queue full, combined sample dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            error!(policy, "output receiver dropped");
        }
    }
}

fn report_source_closed(kind: StreamKind) {
    metrics::counter!("roadsync_window_source_closed_total", "stream" => kind.as_str())
        .increment(1);
    error!(stream = %kind, "input stream closed, stopping aggregation");
}

/// Current wall-clock time as epoch milliseconds
fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
