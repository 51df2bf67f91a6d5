// src/config/validate.rs

use crate::clock::ClockPosition;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchqueryError};
use crate::query::registry;
use crate::types::WatcherBackendKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WatchqueryError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_global_config(&raw)?;
        let since = parse_since(&raw)?;
        let config = ConfigFile::new_unchecked(raw.config, raw.query, since);
        validate_expression(&config)?;
        Ok(config)
    }
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.watcher == WatcherBackendKind::Poll && cfg.config.poll_interval_ms == 0 {
        return Err(WatchqueryError::ConfigError(
            "[config].poll_interval_ms must be >= 1 with the poll watcher (got 0)".to_string(),
        ));
    }

    if cfg.config.settle_ms == 0 {
        return Err(WatchqueryError::ConfigError(
            "[config].settle_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(paths) = &cfg.query.paths {
        if let Some(bad) = paths.iter().find(|p| p.is_empty() || p.starts_with('/')) {
            return Err(WatchqueryError::ConfigError(format!(
                "[query].paths entries must be non-empty relative paths (got {bad:?})"
            )));
        }
    }

    Ok(())
}

fn parse_since(cfg: &RawConfigFile) -> Result<Option<ClockPosition>> {
    cfg.query
        .since
        .as_deref()
        .map(|raw| {
            raw.parse::<ClockPosition>().map_err(|err| {
                WatchqueryError::ConfigError(format!("invalid [query].since: {err}"))
            })
        })
        .transpose()
}

/// Build the expression once so unknown or malformed terms surface at load
/// time rather than on the first query.
fn validate_expression(cfg: &ConfigFile) -> Result<()> {
    cfg.build_query(registry::global()).map(|_| ())
}
