// src/query/exec.rs

//! Run a query over a candidate set.

use rayon::prelude::*;
use tracing::debug;

use crate::clock::ClockPosition;
use crate::file::FileState;
use crate::query::{EvaluateResult, Query, QueryContext};
use crate::types::IndeterminatePolicy;

/// Files that satisfied a query, plus the cursor for the next incremental
/// query.
#[derive(Debug)]
pub struct QueryResult<F> {
    pub clock: ClockPosition,
    pub is_fresh_instance: bool,
    pub matches: Vec<F>,
    /// How many candidates evaluated to `Indeterminate` (whatever the policy
    /// did with them).
    pub indeterminate: usize,
}

/// Pre-filter for the query-level `since` cursor.
///
/// With a usable cursor, only files observed after it are candidates (removed
/// ones included, so callers learn about deletions). A fresh instance has
/// nothing to report as deleted, so it only considers existing files.
fn since_filter(ctx: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
    match ctx.since {
        None => EvaluateResult::True,
        Some(_) if ctx.is_fresh_instance() => file.exists().into(),
        Some(position) => match file.observed_clock() {
            Some(clock) => (clock.ticks > position.ticks).into(),
            None => EvaluateResult::Indeterminate,
        },
    }
}

fn evaluate_candidate(query: &Query, ctx: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
    let since = since_filter(ctx, file);
    if since == EvaluateResult::False {
        return since;
    }
    since.and(query.evaluate(ctx, file))
}

/// Evaluate `query` against every file in `files`.
///
/// The whole set is handed to [`FileState::batch_fetch_properties`] first.
/// Matches keep their input order.
pub fn execute<F>(query: &Query, ctx: &QueryContext, mut files: Vec<F>) -> QueryResult<F>
where
    F: FileState + Send,
{
    let candidates = files.len();
    F::batch_fetch_properties(&mut files);

    let results: Vec<EvaluateResult> = if query.options.parallel {
        files
            .par_iter_mut()
            .map(|file| evaluate_candidate(query, ctx, file))
            .collect()
    } else {
        files
            .iter_mut()
            .map(|file| evaluate_candidate(query, ctx, file))
            .collect()
    };

    let include_indeterminate = query.options.indeterminate == IndeterminatePolicy::Include;
    let mut indeterminate = 0usize;
    let matches: Vec<F> = files
        .into_iter()
        .zip(results)
        .filter_map(|(file, result)| match result {
            EvaluateResult::True => Some(file),
            EvaluateResult::False => None,
            EvaluateResult::Indeterminate => {
                indeterminate += 1;
                include_indeterminate.then_some(file)
            }
        })
        .collect();

    debug!(
        candidates,
        matched = matches.len(),
        indeterminate,
        "query executed"
    );

    QueryResult {
        clock: ClockPosition::new(ctx.root_number, ctx.clock_at_start.ticks),
        is_fresh_instance: ctx.is_fresh_instance(),
        matches,
        indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockValue;
    use crate::query::terms::test_support::{StubFile, ctx};
    use crate::query::{QueryOptions, TermRegistry};
    use std::time::SystemTime;

    fn query(src: &str, options: QueryOptions) -> Query {
        let doc: toml::Table = toml::from_str(&format!("v = {src}")).unwrap();
        Query::build(&TermRegistry::with_builtin_terms(), &doc["v"], options).unwrap()
    }

    fn files() -> Vec<StubFile> {
        let mut unknown = StubFile::unknown("unknown.txt");
        unknown.observed = Some(ClockValue::new(7, SystemTime::UNIX_EPOCH));
        vec![
            StubFile::file("empty.txt", 0),
            StubFile::file("full.txt", 3),
            unknown,
        ]
    }

    fn names(result: &QueryResult<StubFile>) -> Vec<String> {
        result
            .matches
            .iter()
            .map(|f| f.name.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn indeterminate_included_by_default() {
        let q = query(r#""empty""#, QueryOptions::default());
        let result = execute(&q, &ctx(), files());
        assert_eq!(names(&result), vec!["empty.txt", "unknown.txt"]);
        assert_eq!(result.indeterminate, 1);
    }

    #[test]
    fn indeterminate_excluded_on_request() {
        let q = query(
            r#""empty""#,
            QueryOptions {
                indeterminate: IndeterminatePolicy::Exclude,
                ..Default::default()
            },
        );
        let result = execute(&q, &ctx(), files());
        assert_eq!(names(&result), vec!["empty.txt"]);
        assert_eq!(result.indeterminate, 1);
    }

    #[test]
    fn parallel_matches_sequential() {
        let seq = query(r#"["not", "empty"]"#, QueryOptions::default());
        let par = query(
            r#"["not", "empty"]"#,
            QueryOptions {
                parallel: true,
                ..Default::default()
            },
        );
        let a = execute(&seq, &ctx(), files());
        let b = execute(&par, &ctx(), files());
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn since_cursor_filters_by_observed_clock() {
        let q = query(
            r#""true""#,
            QueryOptions {
                since: Some(ClockPosition::new(1, 5)),
                ..Default::default()
            },
        );
        let result = execute(&q, &ctx(), files());
        // Stubs default to tick 1; only the unknown one was observed at 7.
        assert_eq!(names(&result), vec!["unknown.txt"]);
        assert!(!result.is_fresh_instance);
        assert_eq!(result.clock, ClockPosition::new(1, 10));
    }

    #[test]
    fn fresh_instance_skips_missing_files() {
        let q = query(
            r#""true""#,
            QueryOptions {
                since: Some(ClockPosition::new(42, 5)),
                indeterminate: IndeterminatePolicy::Exclude,
                ..Default::default()
            },
        );
        let mut all = files();
        all[1].exists = Some(false);
        let result = execute(&q, &ctx(), all);
        assert_eq!(names(&result), vec!["empty.txt"]);
        assert!(result.is_fresh_instance);
    }
}
