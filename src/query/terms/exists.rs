// src/query/terms/exists.rs

use toml::Value;

use crate::errors::Result;
use crate::file::FileState;
use crate::query::parse::expect_args;
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

/// Reports the existence accessor verbatim.
#[derive(Debug)]
pub struct ExistsExpr;

impl QueryExpr for ExistsExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        file.exists().into()
    }
}

/// True for an existing file or directory of size zero.
#[derive(Debug)]
pub struct EmptyExpr;

impl QueryExpr for EmptyExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        let Some(exists) = file.exists() else {
            return EvaluateResult::Indeterminate;
        };
        if !exists {
            return EvaluateResult::False;
        }

        let (Some(stat), Some(size)) = (file.stat(), file.size()) else {
            return EvaluateResult::Indeterminate;
        };

        if stat.is_dir() || stat.is_file() {
            return (size == 0).into();
        }

        EvaluateResult::False
    }
}

pub fn parse_exists(_: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    expect_args(term, 0, 0)?;
    Ok(Box::new(ExistsExpr))
}

pub fn parse_empty(_: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    expect_args(term, 0, 0)?;
    Ok(Box::new(EmptyExpr))
}
