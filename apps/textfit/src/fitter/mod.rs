//! TextFitter: grows or shrinks the font size of target elements until their
//! text just fits inside the parent's box.
//!
//! # Components
//! - `bounds`: does the element overflow its parent right now?
//! - `search`: per-element stepping loop, one deferred tick at a time.
//! - `coordinator`: resolves targets, starts one search per element, and
//!   publishes a single completion event for the batch.
//! - `measurement_mode`: the temporary style override used while searching,
//!   restored when the search ends.

pub mod bounds;
pub mod coordinator;
pub mod measurement_mode;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dom::selector::{SelectorError, SelectorList};
use crate::dom::{Document, NodeId, SharedDocument};
use crate::events::{EventBus, FitEvent, DEFAULT_EVENT_CAPACITY};
use crate::layout::{Measurer, MetricsMeasurer};

pub use coordinator::{BatchReport, FitHandle};
pub use search::{Direction, FinishReason, FitOutcome};

/// Delay between two ticks of a search.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on the ticks of one search. A search that reaches it finishes
/// as a failsafe.
pub const MAX_TICKS: u32 = 10_000;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("invalid selector '{selector}': {source}")]
    Selector {
        selector: String,
        #[source]
        source: SelectorError,
    },

    #[error("element {0} does not exist in this document")]
    UnknownElement(NodeId),

    #[error("invalid fit options: {0}")]
    InvalidOptions(String),

    #[error("fit batch {0} stopped before every element finished")]
    Interrupted(Uuid),
}

/// Per-call fitting options. Field names follow the camelCase option names
/// (`minFontsize`, `maxFontsize`, `velocity`, `onReadyClass`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FitOptions {
    /// Lower clamp bound in px.
    pub min_fontsize: f64,
    /// Upper clamp bound in px.
    pub max_fontsize: f64,
    /// Font-size increment per tick in px.
    pub velocity: f64,
    /// Class added to each element once its fit completes. `false` or an
    /// empty string in JSON means none.
    #[serde(deserialize_with = "deserialize_ready_class")]
    pub on_ready_class: Option<String>,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            min_fontsize: 10.0,
            max_fontsize: 24.0,
            velocity: 1.0,
            on_ready_class: None,
        }
    }
}

impl FitOptions {
    pub fn with_bounds(mut self, min_fontsize: f64, max_fontsize: f64) -> Self {
        self.min_fontsize = min_fontsize;
        self.max_fontsize = max_fontsize;
        self
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_ready_class(mut self, class: impl Into<String>) -> Self {
        self.on_ready_class = Some(class.into());
        self
    }

    /// `min > max` is accepted: the final clamp resolves it to `min`.
    pub fn validate(&self) -> Result<(), FitError> {
        if !self.velocity.is_finite() || self.velocity <= 0.0 {
            return Err(FitError::InvalidOptions(format!(
                "velocity must be a positive number, got {}",
                self.velocity
            )));
        }
        if !self.min_fontsize.is_finite() || !self.max_fontsize.is_finite() {
            return Err(FitError::InvalidOptions(
                "font size bounds must be finite".to_string(),
            ));
        }

        let span = (self.max_fontsize - self.min_fontsize).abs();
        if span / self.velocity > f64::from(MAX_TICKS) {
            return Err(FitError::InvalidOptions(format!(
                "velocity {} cannot cover {}..{} within {MAX_TICKS} ticks",
                self.velocity, self.min_fontsize, self.max_fontsize
            )));
        }
        // A step below the float resolution of the bounds never moves the size.
        let largest = self.min_fontsize.abs().max(self.max_fontsize.abs());
        if largest + self.velocity == largest {
            return Err(FitError::InvalidOptions(format!(
                "velocity {} is too small for font sizes around {largest}",
                self.velocity
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReadyClass {
    Name(String),
    Flag(bool),
}

fn deserialize_ready_class<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<ReadyClass>::deserialize(deserializer)? {
        Some(ReadyClass::Name(name)) if !name.is_empty() => Some(name),
        Some(ReadyClass::Name(_)) | Some(ReadyClass::Flag(_)) | None => None,
    })
}

/// What to fit: a selector resolved against the whole document, or an
/// explicit element collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Selector(String),
    Elements(Vec<NodeId>),
}

impl Target {
    /// Resolves to elements in document order (selector) or collection order
    /// with duplicates removed (elements).
    pub fn resolve(&self, doc: &Document) -> Result<Vec<NodeId>, FitError> {
        match self {
            Target::Selector(selector) => SelectorList::parse(selector)
                .map(|list| list.query_all(doc))
                .map_err(|source| FitError::Selector {
                    selector: selector.clone(),
                    source,
                }),
            Target::Elements(ids) => {
                let mut resolved = Vec::with_capacity(ids.len());
                for id in ids {
                    if !doc.contains(*id) {
                        return Err(FitError::UnknownElement(*id));
                    }
                    if !resolved.contains(id) {
                        resolved.push(*id);
                    }
                }
                Ok(resolved)
            }
        }
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

impl From<NodeId> for Target {
    fn from(id: NodeId) -> Self {
        Target::Elements(vec![id])
    }
}

impl From<Vec<NodeId>> for Target {
    fn from(ids: Vec<NodeId>) -> Self {
        Target::Elements(ids)
    }
}

/// Fitter-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FitterConfig {
    pub tick_interval: Duration,
    pub event_capacity: usize,
}

impl Default for FitterConfig {
    fn default() -> Self {
        FitterConfig {
            tick_interval: DEFAULT_TICK_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Fits text of elements in one shared document.
#[derive(Clone)]
pub struct TextFitter {
    document: SharedDocument,
    measurer: Arc<dyn Measurer>,
    config: FitterConfig,
    events: EventBus,
}

impl TextFitter {
    pub fn new(document: SharedDocument, config: FitterConfig) -> Self {
        Self::with_measurer(document, config, Arc::new(MetricsMeasurer))
    }

    pub fn with_measurer(
        document: SharedDocument,
        config: FitterConfig,
        measurer: Arc<dyn Measurer>,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        TextFitter {
            document,
            measurer,
            config,
            events,
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    /// Receives `ResizeFinished` and `AllFinished` events of every batch
    /// started after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<FitEvent> {
        self.events.subscribe()
    }

    /// Starts fitting every element `target` resolves to.
    ///
    /// Must be called from within a Tokio runtime: each element is searched in
    /// its own task. Errors are only raised for a bad target or bad options,
    /// before anything is modified.
    pub fn fit(
        &self,
        target: impl Into<Target>,
        options: FitOptions,
    ) -> Result<FitHandle, FitError> {
        coordinator::start_batch(self, target.into(), options)
    }
}
