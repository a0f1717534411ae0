use crate::routing::ZoneViolation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No route found between origin and destination")]
    NoRouteFound,

    #[error("All routes blocked by {} restricted zone(s)", violations.len())]
    AllRoutesBlocked { violations: Vec<ZoneViolation> },

    #[error("Routing service error: {0}")]
    Routing(String),

    #[error("Zone data error: {0}")]
    ZoneData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NavError>;
