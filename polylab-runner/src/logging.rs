//! Tracing subscriber setup.

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSection;

#[derive(Debug, Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct LoggingError(String);

/// Install a global fmt subscriber filtered at `level`.
///
/// `RUST_LOG`, when set, overrides `level`. `json` switches the output to
/// one JSON object per event. Fails if a global subscriber already exists.
pub fn init(level: &str, json: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_target(true)))
        .with((!json).then(|| fmt::layer().with_target(false)))
        .try_init()
        .map_err(|e| LoggingError(e.to_string()))
}

pub fn init_from_config(section: &LoggingSection) -> Result<(), LoggingError> {
    init(&section.level, section.json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails() {
        // Whichever call installs first wins; at most one may succeed.
        let first = init("debug", false);
        let second = init("info", true);
        assert!(first.is_err() || second.is_err());
    }
}
