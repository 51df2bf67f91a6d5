// src/query/terms/suffix.rs

use std::collections::HashSet;

use toml::Value;

use crate::errors::Result;
use crate::file::FileState;
use crate::query::parse::{expect_args, expect_str_list};
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

/// `["suffix", "rs"]` or `["suffix", ["rs", "toml"]]`. Always
/// case-insensitive; needs nothing but the name, so it is indeterminate only
/// when the name isn't valid UTF-8.
#[derive(Debug)]
pub struct SuffixExpr {
    suffixes: HashSet<String>,
}

impl QueryExpr for SuffixExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        let Some(base) = file.base_name() else {
            return EvaluateResult::Indeterminate;
        };
        let Some((_, ext)) = base.rsplit_once('.') else {
            return EvaluateResult::False;
        };
        self.suffixes.contains(&ext.to_lowercase()).into()
    }
}

pub fn parse_suffix(_: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    let args = expect_args(term, 1, 1)?;
    let suffixes = expect_str_list("suffix", &args[0], "suffix")?
        .into_iter()
        .map(|s| s.trim_start_matches('.').to_lowercase())
        .collect();
    Ok(Box::new(SuffixExpr { suffixes }))
}
