//! Fits the font size of elements to the box of their parent container.

pub mod config;
pub mod dom;
pub mod errors;
pub mod events;
pub mod fitter;
pub mod layout;
pub mod routes;
pub mod state;

pub use dom::{share, Document, NodeId, SharedDocument};
pub use events::FitEvent;
pub use fitter::{FitError, FitHandle, FitOptions, FitterConfig, Target, TextFitter};
