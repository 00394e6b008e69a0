//! Event channels: per-kind subscriber lists with early-message buffering.
//!
//! A machine owns four channels, one per [`EventKind`]. Each channel keeps an
//! ordered subscriber list and a buffer for messages published before any
//! subscriber existed.
//!
//! # Delivery Rules
//!
//! | Situation                        | Behavior                               |
//! |----------------------------------|----------------------------------------|
//! | Publish, live subscribers        | Fan-out clone to every subscriber      |
//! | Publish, no subscribers          | Append to the channel buffer           |
//! | First subscriber attaches        | Buffer flushed to it in arrival order  |
//! | Later subscriber attaches        | Sees only subsequent publishes         |
//! | Duplicate registration           | Legal; delivered once per registration |
//!
//! A message is buffered *or* delivered at publish time, never both, and a
//! drained buffer entry is never re-buffered. Delivery order per subscriber
//! is exactly publish order.
//!
//! Channel kinds are a closed enum, so dispatch is compile-time checked;
//! [`EngineError::InvalidEventKind`](crate::EngineError::InvalidEventKind)
//! can only arise from parsing kind names out of external input.

mod registry;

pub use registry::{Channel, ChannelRef, SubscriberId, Subscription};

pub(crate) use registry::lock;

use crate::error::EngineError;

/// The closed set of event kinds a machine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Messages received from the peer.
    Inbound,
    /// Messages the protocol writes toward the peer.
    Outbound,
    /// Protocol run failures broadcast by the lifecycle controller.
    Error,
    /// Machine state transitions recorded via `set_state`.
    StateChanged,
}

impl EventKind {
    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
            Self::Error => "error",
            Self::StateChanged => "state-changed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for EventKind {
    type Err = EngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" | "inbound" => Ok(Self::Inbound),
            "out" | "outbound" => Ok(Self::Outbound),
            "error" => Ok(Self::Error),
            "state" | "state-changed" | "statechanged" => Ok(Self::StateChanged),
            _ => Err(EngineError::InvalidEventKind(s.to_string())),
        }
    }
}
