//! Structured notifications emitted at lifecycle transitions.
//!
//! Consumed by external indexers through an
//! [`EventSink`](crate::traits::EventSink). Delivery is fire-and-forget.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelType, Identity};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    ChannelAdded {
        identity: Identity,
        channel_type: ChannelType,
        meta: Vec<u8>,
    },
    ChannelUpdated {
        identity: Identity,
        meta: Vec<u8>,
    },
    ChannelDeactivated {
        identity: Identity,
    },
    Subscribed {
        channel: Identity,
        user: Identity,
    },
    Unsubscribed {
        channel: Identity,
        user: Identity,
    },
}

impl ChannelEvent {
    /// Short name used as the tracing message and JSON tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChannelAdded { .. } => "channel_added",
            Self::ChannelUpdated { .. } => "channel_updated",
            Self::ChannelDeactivated { .. } => "channel_deactivated",
            Self::Subscribed { .. } => "subscribed",
            Self::Unsubscribed { .. } => "unsubscribed",
        }
    }
}
