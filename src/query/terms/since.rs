// src/query/terms/since.rs

//! `since`: changed after a clock position or a unix timestamp.
//!
//! - `["since", "c:1:42"]` compares the observed clock (`oclock`, default)
//!   or created clock (`cclock`) against the position's ticks.
//! - `["since", 1700000000]` compares `mtime` (default) or `ctime`.
//!
//! A clock position issued by a different root can't be compared; every
//! existing file counts as changed.

use std::time::{Duration, SystemTime};

use toml::Value;

use crate::clock::ClockPosition;
use crate::errors::{Result, WatchqueryError};
use crate::file::FileState;
use crate::query::parse::{expect_args, expect_str};
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockField {
    Observed,
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeField {
    Modified,
    Changed,
}

#[derive(Debug)]
enum SinceSpec {
    Clock(ClockPosition, ClockField),
    Timestamp(SystemTime, TimeField),
}

#[derive(Debug)]
pub struct SinceExpr {
    spec: SinceSpec,
}

impl QueryExpr for SinceExpr {
    fn evaluate(&self, ctx: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        match self.spec {
            SinceSpec::Clock(position, field) => {
                if position.is_fresh_instance_for(ctx.root_number) {
                    return file.exists().into();
                }
                let clock = match field {
                    ClockField::Observed => file.observed_clock(),
                    ClockField::Created => file.created_clock(),
                };
                match clock {
                    Some(clock) => (clock.ticks > position.ticks).into(),
                    None => EvaluateResult::Indeterminate,
                }
            }
            SinceSpec::Timestamp(since, field) => {
                let time = match field {
                    TimeField::Modified => file.modified_time(),
                    TimeField::Changed => file.changed_time(),
                };
                match time {
                    Some(time) => (time > since).into(),
                    None => EvaluateResult::Indeterminate,
                }
            }
        }
    }
}

pub fn parse_since(_: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    let args = expect_args(term, 1, 2)?;
    let field = args
        .get(1)
        .map(|v| expect_str("since", v, "field"))
        .transpose()?;

    let spec = match &args[0] {
        Value::String(raw) => {
            let position: ClockPosition = raw.parse()?;
            let field = match field {
                None | Some("oclock") => ClockField::Observed,
                Some("cclock") => ClockField::Created,
                Some(other) => return Err(bad_field(other, "a clock position")),
            };
            SinceSpec::Clock(position, field)
        }
        Value::Integer(secs) => {
            let secs = u64::try_from(*secs)
                .map_err(|_| WatchqueryError::parse("\"since\": timestamp must not be negative"))?;
            let field = match field {
                None | Some("mtime") => TimeField::Modified,
                Some("ctime") => TimeField::Changed,
                Some(other) => return Err(bad_field(other, "a timestamp")),
            };
            SinceSpec::Timestamp(SystemTime::UNIX_EPOCH + Duration::from_secs(secs), field)
        }
        other => {
            return Err(WatchqueryError::parse(format!(
                "\"since\": expected a clock position or timestamp, got {}",
                other.type_str()
            )));
        }
    };

    Ok(Box::new(SinceExpr { spec }))
}

fn bad_field(field: &str, kind: &str) -> WatchqueryError {
    WatchqueryError::parse(format!("\"since\": field {field:?} can't be used with {kind}"))
}
