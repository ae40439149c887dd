//! Completion notifications published by the fitter.
//!
//! A single broadcast bus per `TextFitter`: every subscriber sees every
//! event, in publish order. Events carry the batch id so listeners can tell
//! concurrent batches apart.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dom::NodeId;

/// Default number of events buffered per subscriber before it lags.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum FitEvent {
    /// One element finished fitting; `font_size` is its final size.
    #[serde(rename = "resizeFinished")]
    ResizeFinished {
        batch_id: Uuid,
        element: NodeId,
        font_size: f64,
    },
    /// Every element of the batch finished. Published once per batch.
    #[serde(rename = "TextFitterFinished")]
    AllFinished { batch_id: Uuid, count: usize },
}

impl FitEvent {
    pub fn batch_id(&self) -> Uuid {
        match self {
            FitEvent::ResizeFinished { batch_id, .. } | FitEvent::AllFinished { batch_id, .. } => {
                *batch_id
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FitEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FitEvent> {
        self.sender.subscribe()
    }

    /// Publishes `event`; returns how many subscribers received it.
    pub fn publish(&self, event: FitEvent) -> usize {
        // No subscribers is not an error: nobody is listening for completion.
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
