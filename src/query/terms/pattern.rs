// src/query/terms/pattern.rs

//! Pattern terms: `match`/`imatch` (glob) and `pcre`/`ipcre` (regex).
//!
//! Both take `[name, pattern, scope?]` where scope defaults to `basename`.

use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};
use toml::Value;

use crate::errors::{Result, WatchqueryError};
use crate::file::FileState;
use crate::query::parse::{expect_args, expect_str};
use crate::query::terms::NameScope;
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

#[derive(Debug)]
pub struct MatchExpr {
    matcher: GlobMatcher,
    scope: NameScope,
}

impl QueryExpr for MatchExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        match self.scope.subject(&*file) {
            Some(subject) => self.matcher.is_match(&*subject).into(),
            None => EvaluateResult::Indeterminate,
        }
    }
}

#[derive(Debug)]
pub struct PcreExpr {
    regex: Regex,
    scope: NameScope,
}

impl QueryExpr for PcreExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        match self.scope.subject(&*file) {
            Some(subject) => self.regex.is_match(&subject).into(),
            None => EvaluateResult::Indeterminate,
        }
    }
}

fn pattern_and_scope<'v>(term: &'v Value, term_name: &str) -> Result<(&'v str, NameScope)> {
    let args = expect_args(term, 1, 2)?;
    let pattern = expect_str(term_name, &args[0], "pattern")?;
    let scope = match args.get(1) {
        Some(raw) => NameScope::parse(term_name, Some(expect_str(term_name, raw, "scope")?))?,
        None => NameScope::Basename,
    };
    Ok((pattern, scope))
}

fn parse_glob(
    ctx: &QueryBuildContext<'_>,
    term: &Value,
    term_name: &str,
    case_insensitive: bool,
) -> Result<Box<dyn QueryExpr>> {
    let (pattern, scope) = pattern_and_scope(term, term_name)?;
    let glob = GlobBuilder::new(pattern)
        .case_insensitive(case_insensitive || !ctx.case_sensitive)
        .literal_separator(scope == NameScope::Wholename)
        .build()
        .map_err(|e| {
            WatchqueryError::parse(format!("\"{term_name}\": invalid glob {pattern:?}: {e}"))
        })?;
    Ok(Box::new(MatchExpr {
        matcher: glob.compile_matcher(),
        scope,
    }))
}

fn parse_regex(
    ctx: &QueryBuildContext<'_>,
    term: &Value,
    term_name: &str,
    case_insensitive: bool,
) -> Result<Box<dyn QueryExpr>> {
    let (pattern, scope) = pattern_and_scope(term, term_name)?;
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive || !ctx.case_sensitive)
        .build()
        .map_err(|e| {
            WatchqueryError::parse(format!("\"{term_name}\": invalid regex {pattern:?}: {e}"))
        })?;
    Ok(Box::new(PcreExpr { regex, scope }))
}

pub fn parse_match(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    parse_glob(ctx, term, "match", false)
}

pub fn parse_imatch(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    parse_glob(ctx, term, "imatch", true)
}

pub fn parse_pcre(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    parse_regex(ctx, term, "pcre", false)
}

pub fn parse_ipcre(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    parse_regex(ctx, term, "ipcre", true)
}
