// src/query/terms/size.rs

use toml::Value;

use crate::errors::{Result, WatchqueryError};
use crate::file::FileState;
use crate::query::parse::{expect_args, expect_integer, expect_str};
use crate::query::terms::CompareOp;
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

/// `["size", "gt", 1024]`. A file that doesn't exist never matches.
#[derive(Debug)]
pub struct SizeExpr {
    op: CompareOp,
    value: i64,
}

impl QueryExpr for SizeExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        match file.exists() {
            None => return EvaluateResult::Indeterminate,
            Some(false) => return EvaluateResult::False,
            Some(true) => {}
        }
        match file.size() {
            Some(size) => {
                let size = i64::try_from(size).unwrap_or(i64::MAX);
                self.op.matches(size, self.value).into()
            }
            None => EvaluateResult::Indeterminate,
        }
    }
}

pub fn parse_size(_: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    let args = expect_args(term, 2, 2)?;
    let op = CompareOp::parse("size", expect_str("size", &args[0], "operator")?)?;
    let value = expect_integer("size", &args[1], "size")?;
    if value < 0 {
        return Err(WatchqueryError::parse("\"size\": size must not be negative"));
    }
    Ok(Box::new(SizeExpr { op, value }))
}
