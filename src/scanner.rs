//! Scanner facade tying the window controller to its background tasks

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::driver::{Driver, PumpStats};
use crate::provider::EventSource;
use crate::providers::{ChannelSource, EventSender};
use crate::transport::Transport;
use crate::types::{Identity, SnapshotHeader};
use crate::window::{Admission, FlushReport, WindowController};
use crate::{BufferError, Result, ScannerConfig};

/// Running scan buffer.
///
/// Created by [`Scanner::start`], which validates the configuration, checks the
/// transport and spawns the flush task. Advertisements can then be fed directly
/// through [`on_advertisement`](Self::on_advertisement) or from any
/// [`EventSource`] via [`attach`](Self::attach). Dropping the scanner stops all
/// of its tasks.
pub struct Scanner {
    controller: Arc<WindowController>,

    /// Flush report watch receiver
    reports: watch::Receiver<Option<Arc<FlushReport>>>,

    config: ScannerConfig,

    /// Cancellation token for stopping tasks
    cancel: CancellationToken,
}

impl Scanner {
    /// Start scanning with `config`, transmitting every window to `transport`.
    ///
    /// # Errors
    ///
    /// - [`BufferError::Config`] if `config` fails validation
    /// - [`BufferError::TransportUnavailable`] if `transport` is not ready
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<T>(config: ScannerConfig, transport: T) -> Result<Self>
    where
        T: Transport + Send + 'static,
    {
        config.validate()?;

        if !transport.is_ready() {
            error!("Transport not ready, refusing to start scanning");
            return Err(BufferError::transport_unavailable("transport reported not ready"));
        }

        let controller = Arc::new(WindowController::from_config(&config)?);
        let channels = Driver::spawn_flush(Arc::clone(&controller), transport, &config);

        info!(
            capacity = config.capacity,
            sampling_interval_ms = config.sampling_interval_ms,
            "Scanner started"
        );

        Ok(Self { controller, reports: channels.reports, config, cancel: channels.cancel })
    }

    /// Producer entry point for a single observation.
    ///
    /// Never blocks on transmission and never fails; the outcome is returned
    /// for callers that keep their own statistics.
    pub fn on_advertisement(
        &self,
        identity: &Identity,
        identity_kind: u8,
        signal_level: i8,
        event_kind: u8,
        payload: &[u8],
    ) -> Admission {
        self.controller.admit(identity, identity_kind, signal_level, event_kind, payload)
    }

    /// Feed `source` into the scanner until it is exhausted or the scanner stops
    pub fn attach<S: EventSource>(&self, source: S) -> JoinHandle<PumpStats> {
        debug!(source = source.name(), "Attaching event source");
        Driver::spawn_pump(Arc::clone(&self.controller), source, self.cancel.child_token())
    }

    /// Queue handle for radio callbacks running outside the runtime.
    ///
    /// Each call creates a fresh bounded queue of `event_queue_depth` events
    /// with its own pump task.
    pub fn event_sender(&self) -> EventSender {
        let (sender, source) = ChannelSource::new(self.config.event_queue_depth);
        // Pump ends on its own once every sender clone is dropped
        drop(self.attach(source));
        sender
    }

    /// Stream of flush reports, one per completed window.
    ///
    /// Intermediate reports may be skipped if the consumer falls behind. The
    /// stream ends when the flush task stops.
    pub fn reports(&self) -> impl Stream<Item = Arc<FlushReport>> + 'static {
        WatchStream::new(self.reports.clone()).filter_map(|opt| async move { opt })
    }

    /// Most recent flush report, if any window has completed
    pub fn latest_report(&self) -> Option<Arc<FlushReport>> {
        self.reports.borrow().clone()
    }

    /// Header of the window currently admitting events
    pub fn current_header(&self) -> SnapshotHeader {
        self.controller.header()
    }

    /// Shared window controller
    pub fn controller(&self) -> &Arc<WindowController> {
        &self.controller
    }

    /// Active configuration
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Whether [`shutdown`](Self::shutdown) has been requested
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the flush task and every attached source
    pub fn shutdown(&self) {
        info!(windows = self.controller.completed_windows(), "Scanner shutting down");
        self.cancel.cancel();
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        debug!("Dropping scanner");
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{SharedTransport, event, identity};
    use std::time::Duration;

    struct Unplugged;

    impl Transport for Unplugged {
        fn write_byte(&mut self, _byte: u8) -> Result<()> {
            Ok(())
        }

        fn is_ready(&self) -> bool {
            false
        }
    }

    fn fast_config() -> ScannerConfig {
        ScannerConfig::default()
            .with_capacity(64)
            .with_sampling_interval(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn refuses_unready_transport() {
        let err = Scanner::start(fast_config(), Unplugged).err().expect("start must fail");
        assert!(matches!(err, BufferError::TransportUnavailable { .. }));
    }

    #[tokio::test]
    async fn refuses_invalid_config() {
        let config = fast_config().with_capacity(1000);
        let err = Scanner::start(config, SharedTransport::new()).err().expect("start must fail");
        assert!(matches!(err, BufferError::Config { .. }));
    }

    #[tokio::test]
    async fn direct_admission_is_visible_in_current_header() {
        let scanner = Scanner::start(
            ScannerConfig::default().with_capacity(64),
            SharedTransport::new(),
        )
        .expect("scanner starts");

        let id = identity(1);
        assert!(scanner.on_advertisement(&id, 0, -40, 0, &[1, 2]).is_accepted());
        assert!(scanner.on_advertisement(&id, 0, -41, 0, &[3]).is_accepted());

        let header = scanner.current_header();
        assert_eq!(header.raw_event_count, 2);
        assert_eq!(header.unique_count, 1);
        assert!(scanner.latest_report().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reports_follow_flushed_windows() {
        let transport = SharedTransport::new();
        let scanner = Scanner::start(fast_config(), transport.clone()).expect("scanner starts");
        let sender = scanner.event_sender();

        for i in 0..4 {
            assert!(sender.send(event(i, -60)));
        }

        let mut reports = Box::pin(scanner.reports());
        let report = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match reports.next().await {
                    Some(report) if report.raw_event_count > 0 => return Some(report),
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await
        .expect("a non-empty window is flushed")
        .expect("flush task still running");

        assert_eq!(report.raw_event_count, 4);
        assert_eq!(report.unique_count, 4);

        scanner.shutdown();
        assert!(scanner.is_stopped());
        assert!(!transport.frames().is_empty());
    }
}
