//! Error types for configuration loading and batch runs

use thiserror::Error;

/// Problems with a fight configuration. Raised before any simulation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fight duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    #[error("iteration count must be at least 1")]
    NoIterations,

    #[error("{hand} weapon damage range is inverted: min {min} > max {max}")]
    InvalidWeaponRange { hand: &'static str, min: f64, max: f64 },

    #[error("{hand} weapon speed must be positive, got {speed}")]
    NonPositiveWeaponSpeed { hand: &'static str, speed: f64 },

    #[error("ability priority list is empty")]
    EmptyPriority,

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by a batch run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("fight {fight} on worker {worker} produced an invalid result: {reason}")]
    InvalidFight {
        worker: usize,
        fight: usize,
        reason: String,
    },

    #[error("batch cancelled")]
    Cancelled,
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
