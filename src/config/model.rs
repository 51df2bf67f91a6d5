// src/config/model.rs

use serde::Deserialize;

use crate::clock::ClockPosition;
use crate::errors::Result;
use crate::file::LocalFileStateOptions;
use crate::query::{Query, QueryOptions, TermRegistry};
use crate::types::{IndeterminatePolicy, MissingEntryPolicy, WatcherBackendKind};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// watcher = "notify"
/// settle_ms = 20
///
/// [query]
/// expression = ["allof", ["type", "f"], ["suffix", "rs"]]
/// indeterminate = "exclude"
/// ```
///
/// Both sections are optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub query: QuerySection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub query: QuerySection,
    since: Option<ClockPosition>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        query: QuerySection,
        since: Option<ClockPosition>,
    ) -> Self {
        Self {
            config,
            query,
            since,
        }
    }

    /// The parsed `[query].since` cursor.
    pub fn since(&self) -> Option<ClockPosition> {
        self.since
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            since: self.since,
            case_sensitive: self.config.case_sensitive,
            indeterminate: self.query.indeterminate,
            parallel: self.query.parallel,
        }
    }

    pub fn file_state_options(&self) -> LocalFileStateOptions {
        LocalFileStateOptions {
            case_sensitive: self.config.case_sensitive,
            missing_entry: self.config.missing_entry,
        }
    }

    pub fn build_query(&self, registry: &TermRegistry) -> Result<Query> {
        Query::build(registry, &self.query.expression, self.query_options())
    }
}

/// `[config]` section: how the root is watched and probed.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"notify"` (default) or `"poll"`.
    #[serde(default)]
    pub watcher: WatcherBackendKind,

    /// Rescan interval for the `poll` backend.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Quiet period after a change before the query is re-run.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Upper bound on a single query execution; 0 disables it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,

    /// How explicitly listed paths that don't exist are classified.
    #[serde(default)]
    pub missing_entry: MissingEntryPolicy,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_settle_ms() -> u64 {
    20
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_case_sensitive() -> bool {
    !cfg!(any(target_os = "macos", target_os = "windows"))
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            watcher: WatcherBackendKind::default(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_ms: default_settle_ms(),
            timeout_ms: default_timeout_ms(),
            case_sensitive: default_case_sensitive(),
            missing_entry: MissingEntryPolicy::default(),
        }
    }
}

/// `[query]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct QuerySection {
    /// Expression term: a bare term name or `[name, args...]`.
    #[serde(default = "default_expression")]
    pub expression: toml::Value,

    /// Initial `c:<root>:<ticks>` cursor.
    #[serde(default)]
    pub since: Option<String>,

    #[serde(default)]
    pub indeterminate: IndeterminatePolicy,

    /// Evaluate exactly these paths (relative to the root) instead of
    /// everything the root has seen.
    #[serde(default)]
    pub paths: Option<Vec<String>>,

    #[serde(default)]
    pub parallel: bool,
}

fn default_expression() -> toml::Value {
    toml::Value::String("exists".to_string())
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            expression: default_expression(),
            since: None,
            indeterminate: IndeterminatePolicy::default(),
            paths: None,
            parallel: false,
        }
    }
}
