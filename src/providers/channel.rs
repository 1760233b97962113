//! Queue-fed event source for radio callbacks running on foreign threads

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::Result;
use crate::provider::EventSource;
use crate::types::AdvertisementEvent;

/// Producer half handed to the radio stack.
///
/// `send` never blocks: when the queue is full the event is discarded and
/// counted, so a stalled consumer cannot back-pressure the radio.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<AdvertisementEvent>,
    overflowed: Arc<AtomicU64>,
}

impl EventSender {
    /// Queue one advertisement; returns `false` if it was discarded
    pub fn send(&self, event: AdvertisementEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                let total = self.overflowed.fetch_add(1, Ordering::Relaxed) + 1;
                if total == 1 || total.is_power_of_two() {
                    warn!(identity = %event.identity, total, "Event queue full, discarding");
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event queue closed, discarding");
                false
            }
        }
    }

    /// Events discarded because the queue was full
    pub fn overflowed(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }
}

/// Consumer half, pumped into the window controller by the driver.
pub struct ChannelSource {
    rx: mpsc::Receiver<AdvertisementEvent>,
}

impl ChannelSource {
    /// Bounded queue of `depth` events
    pub fn new(depth: usize) -> (EventSender, Self) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (EventSender { tx, overflowed: Arc::new(AtomicU64::new(0)) }, Self { rx })
    }
}

#[async_trait::async_trait]
impl EventSource for ChannelSource {
    async fn next_event(&mut self) -> Result<Option<AdvertisementEvent>> {
        Ok(self.rx.recv().await)
    }

    fn name(&self) -> &str {
        "channel"
    }
}
