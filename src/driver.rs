//! Driver spawns and manages the flush timer and event pump tasks

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::ScannerConfig;
use crate::provider::EventSource;
use crate::transport::Transport;
use crate::window::{Admission, FlushReport, WindowController};

/// Result of spawning the flush task
pub struct DriverChannels {
    /// Receiver for per-window flush reports
    pub reports: watch::Receiver<Option<Arc<FlushReport>>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Counters accumulated by an event pump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Events stored in the registry
    pub accepted: u64,
    /// Events counted but dropped for lack of capacity
    pub dropped: u64,
    /// Events refused because their buffer was draining
    pub rejected: u64,
}

impl PumpStats {
    fn record(&mut self, admission: Admission) {
        match admission {
            Admission::Accepted { .. } => self.accepted += 1,
            Admission::Dropped { .. } => self.dropped += 1,
            Admission::Rejected => self.rejected += 1,
        }
    }
}

/// Driver spawns and manages scanner tasks
///
/// The flush task owns the transport and closes one window per sampling
/// interval until cancelled, whether or not the transport accepts the frames.
/// Encoding and transmission run on the blocking pool so a slow serial link
/// never stalls the runtime, and the producer is never blocked behind it (see
/// [`WindowController::flush`]).
pub struct Driver;

impl Driver {
    /// Spawn the periodic flush task
    pub fn spawn_flush<T>(
        controller: Arc<WindowController>,
        transport: T,
        config: &ScannerConfig,
    ) -> DriverChannels
    where
        T: Transport + Send + 'static,
    {
        let (report_tx, report_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_flush = cancel.clone();

        let period = config.sampling_interval();
        let max_errors = config.max_consecutive_transport_errors.max(1);

        tokio::spawn(async move {
            Self::flush_task(controller, transport, period, max_errors, report_tx, cancel_flush)
                .await;
        });

        DriverChannels { reports: report_rx, cancel }
    }

    /// Spawn a task feeding `source` into the controller until it ends or `cancel` fires
    pub fn spawn_pump<S>(
        controller: Arc<WindowController>,
        source: S,
        cancel: CancellationToken,
    ) -> JoinHandle<PumpStats>
    where
        S: EventSource,
    {
        tokio::spawn(Self::pump_task(controller, source, cancel))
    }

    async fn flush_task<T>(
        controller: Arc<WindowController>,
        mut transport: T,
        period: Duration,
        max_errors: u32,
        report_tx: watch::Sender<Option<Arc<FlushReport>>>,
        cancel: CancellationToken,
    ) where
        T: Transport + Send + 'static,
    {
        info!(?period, "Flush task started");
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut error_count = 0u32;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Flush task cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let worker = Arc::clone(&controller);
            let joined = tokio::task::spawn_blocking(move || {
                let result = worker.flush(&mut transport);
                (transport, result)
            })
            .await;

            let result = match joined {
                Ok((returned, result)) => {
                    transport = returned;
                    result
                }
                Err(e) => {
                    error!("Flush worker failed: {}", e);
                    report_tx.send_replace(None);
                    return;
                }
            };

            match result {
                Ok(report) => {
                    error_count = 0;
                    trace!(sequence = report.sequence, "Publishing flush report");
                    report_tx.send_replace(Some(Arc::new(report)));
                }
                Err(e) => {
                    // The failed window was already reset; keep cycling regardless
                    error_count = error_count.saturating_add(1);
                    if error_count < max_errors {
                        error!("Transport error ({}/{}): {}", error_count, max_errors, e);
                    } else if error_count % max_errors == 0 {
                        error!(
                            consecutive = error_count,
                            "Transport degraded, windows are being discarded: {}", e
                        );
                    } else {
                        debug!(consecutive = error_count, "Transport error: {}", e);
                    }
                }
            }
        }

        info!("Flush task ended after {} windows", controller.completed_windows());
    }

    async fn pump_task<S>(
        controller: Arc<WindowController>,
        mut source: S,
        cancel: CancellationToken,
    ) -> PumpStats
    where
        S: EventSource,
    {
        info!(source = source.name(), "Event pump started");
        let mut stats = PumpStats::default();
        let mut error_count = 0u32;
        const MAX_ERRORS: u32 = 10;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Event pump cancelled");
                    break;
                }
                result = source.next_event() => result,
            };

            match result {
                Ok(Some(event)) => {
                    error_count = 0;
                    stats.record(controller.try_admit(&event));
                }
                Ok(None) => {
                    debug!(source = source.name(), "Event source exhausted");
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    warn!("Event source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many event source errors, stopping pump");
                        break;
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!(
            accepted = stats.accepted,
            dropped = stats.dropped,
            rejected = stats.rejected,
            "Event pump ended"
        );
        stats
    }
}
