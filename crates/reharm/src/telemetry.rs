//! Diagnostic logging to stderr. Stdout stays reserved for prompts and status.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set, otherwise the configured level.
pub fn filter(log_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log filter '{}'", log_level)),
    }
}

pub fn init(log_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(log_level)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_levels_and_directives() {
        assert!(filter("warn").is_ok());
        assert!(filter("reharm=debug,midi_analysis=info").is_ok());
    }
}
