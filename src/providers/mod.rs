//! Event source implementations

pub mod channel;
pub mod scripted;

pub use channel::{ChannelSource, EventSender};
pub use scripted::{EventScript, ScriptedSource};
