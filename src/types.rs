use std::str::FromStr;

use serde::Deserialize;

/// What a query does with candidates whose predicate result is indeterminate.
///
/// - `Include`: report them as matches; callers re-check (default).
/// - `Exclude`: drop them; callers may miss files whose state is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndeterminatePolicy {
    #[default]
    Include,
    Exclude,
}

impl FromStr for IndeterminatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "include" => Ok(IndeterminatePolicy::Include),
            "exclude" => Ok(IndeterminatePolicy::Exclude),
            other => Err(format!(
                "invalid indeterminate policy: {other} (expected \"include\" or \"exclude\")"
            )),
        }
    }
}

/// Which change-detection backend a root uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatcherBackendKind {
    /// The platform's native notification API via `notify`.
    #[default]
    Notify,
    /// Periodic rescans; for filesystems without native notifications.
    Poll,
}

impl FromStr for WatcherBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "notify" => Ok(WatcherBackendKind::Notify),
            "poll" => Ok(WatcherBackendKind::Poll),
            other => Err(format!(
                "invalid watcher backend: {other} (expected \"notify\" or \"poll\")"
            )),
        }
    }
}

/// How the probing file state classifies an entry that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingEntryPolicy {
    /// Report a zeroed regular-file stat record.
    ///
    /// Only sound when every path comes from a source-control listing, which
    /// never lists directories.
    #[default]
    AssumeRegularFile,
    /// Report stat as unknown, like every other property.
    Unknown,
}
