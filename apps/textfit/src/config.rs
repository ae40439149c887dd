use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::dom::Size;
use crate::fitter::FitterConfig;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Delay between two size-search ticks.
    pub tick_interval_ms: u64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            tick_interval_ms: env_or("TEXTFIT_TICK_MS", 50)?,
            viewport_width: env_or("TEXTFIT_VIEWPORT_WIDTH", 1024.0)?,
            viewport_height: env_or("TEXTFIT_VIEWPORT_HEIGHT", 768.0)?,
        })
    }

    pub fn fitter_config(&self) -> FitterConfig {
        FitterConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            ..FitterConfig::default()
        }
    }

    pub fn viewport(&self) -> Size {
        Size::new(self.viewport_width, self.viewport_height)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => Ok(default),
    }
}
