//! Scripted event source for replaying recorded or simulated advertisements

use std::path::Path;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::provider::EventSource;
use crate::types::AdvertisementEvent;
use crate::{BufferError, Result};

/// YAML document describing a sequence of advertisements.
///
/// ```yaml
/// interval_ms: 5
/// repeat: 2
/// events:
///   - identity: "AA:BB:CC:DD:EE:FF"
///     signal_level: -40
///     payload: [2, 1, 6]
///   - identity: "11:22:33:44:55:66"
///     identity_kind: 1
///     signal_level: -71
///     event_kind: 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct EventScript {
    /// Delay between events; 0 replays as fast as possible
    #[serde(default)]
    pub interval_ms: u64,

    /// Number of passes over `events`
    #[serde(default = "default_repeat")]
    pub repeat: u32,

    /// Advertisements in playback order
    pub events: Vec<AdvertisementEvent>,
}

fn default_repeat() -> u32 {
    1
}

impl EventScript {
    /// Parse a script document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| BufferError::parse("Event script", e.to_string()))
    }

    /// Total events a full playback produces
    pub fn total_events(&self) -> usize {
        self.events.len() * self.repeat as usize
    }
}

/// Replays an [`EventScript`], optionally paced by a fixed interval.
pub struct ScriptedSource {
    script: EventScript,

    /// Position within the current pass
    position: usize,

    /// Completed passes
    round: u32,

    /// Pacing timer, created on first use so construction needs no runtime
    pacing: Option<Interval>,
}

impl ScriptedSource {
    /// Source replaying `script`
    pub fn new(script: EventScript) -> Self {
        info!(
            events = script.events.len(),
            repeat = script.repeat,
            interval_ms = script.interval_ms,
            "Loaded event script"
        );
        Self { script, position: 0, round: 0, pacing: None }
    }

    /// Source replaying `events` once, unpaced
    pub fn from_events(events: Vec<AdvertisementEvent>) -> Self {
        Self::new(EventScript { interval_ms: 0, repeat: 1, events })
    }

    /// Load a script from a YAML file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| BufferError::file_error(path.to_path_buf(), e))?;
        Ok(Self::new(EventScript::from_yaml_str(&yaml)?))
    }

    /// Events not yet produced
    pub fn remaining(&self) -> usize {
        let played = self.round as usize * self.script.events.len() + self.position;
        self.script.total_events().saturating_sub(played)
    }

    async fn pace(&mut self) {
        if self.script.interval_ms == 0 {
            return;
        }
        let period = Duration::from_millis(self.script.interval_ms);
        let pacing = self.pacing.get_or_insert_with(|| {
            let mut pacing = interval(period);
            pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
            pacing
        });
        pacing.tick().await;
    }
}

#[async_trait::async_trait]
impl EventSource for ScriptedSource {
    async fn next_event(&mut self) -> Result<Option<AdvertisementEvent>> {
        if self.script.events.is_empty() || self.round >= self.script.repeat {
            debug!("Event script finished");
            return Ok(None);
        }

        self.pace().await;

        let event = self.script.events[self.position].clone();
        trace!(
            round = self.round,
            position = self.position,
            identity = %event.identity,
            "Replaying advertisement"
        );

        self.position += 1;
        if self.position == self.script.events.len() {
            self.position = 0;
            self.round += 1;
        }

        Ok(Some(event))
    }

    fn name(&self) -> &str {
        "script"
    }
}
