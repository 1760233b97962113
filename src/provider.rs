//! Event source trait for advertisement producers

use crate::Result;
use crate::types::AdvertisementEvent;

/// Trait for advertisement producers
///
/// Sources abstract over where observations come from (a radio callback
/// bridged through a queue, a recorded script, a simulator) and handle their
/// own pacing internally.
#[async_trait::async_trait]
pub trait EventSource: Send + 'static {
    /// Get the next observed advertisement
    ///
    /// Returns:
    /// - `Ok(Some(event))` - New advertisement available
    /// - `Ok(None)` - Source exhausted (normal termination)
    /// - `Err(e)` - Error occurred
    async fn next_event(&mut self) -> Result<Option<AdvertisementEvent>>;

    /// Short label used in log output
    fn name(&self) -> &str {
        "events"
    }
}
