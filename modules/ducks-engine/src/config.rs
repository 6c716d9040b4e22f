use std::env;

use tracing::info;

use crate::error::EngineError;

/// Reactions allowed per dispatch unless configured otherwise.
pub const DEFAULT_MAX_REACTIONS: usize = 1_000;

/// Engine configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Cap on consecutive reactor dispatches triggered by a single
    /// `dispatch` call. `None` leaves the reactor loop unguarded.
    pub max_reactions: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reactions: Some(DEFAULT_MAX_REACTIONS),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment.
    ///
    /// `DUCKS_MAX_REACTIONS` accepts a non-negative integer, or one of
    /// `none`, `off`, `unbounded` to disable the cap.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// No cap on the reactor loop.
    pub fn unbounded() -> Self {
        Self {
            max_reactions: None,
        }
    }

    pub fn with_max_reactions(limit: usize) -> Self {
        Self {
            max_reactions: Some(limit),
        }
    }

    pub fn log(&self) {
        match self.max_reactions {
            Some(limit) => info!(max_reactions = limit, "Engine config loaded"),
            None => info!("Engine config loaded, reactor loop unbounded"),
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let max_reactions = match lookup("DUCKS_MAX_REACTIONS") {
            Some(raw) => parse_max_reactions(&raw)?,
            None => Some(DEFAULT_MAX_REACTIONS),
        };
        Ok(Self { max_reactions })
    }
}

fn parse_max_reactions(raw: &str) -> Result<Option<usize>, EngineError> {
    let raw = raw.trim();
    match raw.to_ascii_lowercase().as_str() {
        "none" | "off" | "unbounded" => Ok(None),
        _ => raw.parse().map(Some).map_err(|_| {
            EngineError::Config(format!(
                "DUCKS_MAX_REACTIONS must be a number or `none`, got `{raw}`"
            ))
        }),
    }
}
