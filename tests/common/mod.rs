#![allow(dead_code)]

use watchquery::file::FileState;
use watchquery::query::{Query, QueryOptions, QueryResult, TermRegistry};
use watchquery_test_utils::builders::expr;

pub use watchquery_test_utils::init_tracing;

/// Build a query from an inline TOML expression with the builtin terms.
pub fn query(src: &str, options: QueryOptions) -> Query {
    Query::build(&TermRegistry::with_builtin_terms(), &expr(src), options)
        .expect("query should parse")
}

/// Matched names, with `/` separators.
pub fn names<F: FileState>(result: &QueryResult<F>) -> Vec<String> {
    result
        .matches
        .iter()
        .map(|f| f.name().to_string_lossy().replace('\\', "/"))
        .collect()
}
