use crate::config::Config;
use crate::dom::Size;
use crate::fitter::FitterConfig;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every request fits its own document, so nothing here is mutable.
#[derive(Debug, Clone)]
pub struct AppState {
    pub fitter_config: FitterConfig,
    /// Viewport used when a request does not send one.
    pub viewport: Size,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        AppState {
            fitter_config: config.fitter_config(),
            viewport: config.viewport(),
        }
    }
}
