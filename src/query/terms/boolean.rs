// src/query/terms/boolean.rs

use toml::Value;

use crate::errors::{Result, WatchqueryError};
use crate::file::FileState;
use crate::query::parse::{expect_args, term_args, term_name};
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

#[derive(Debug)]
pub struct ConstExpr(pub bool);

impl QueryExpr for ConstExpr {
    fn evaluate(&self, _: &QueryContext, _: &mut dyn FileState) -> EvaluateResult {
        self.0.into()
    }
}

/// Conjunction. Short-circuits on the first `False`; an `Indeterminate`
/// operand only wins if no later operand is `False`.
#[derive(Debug)]
pub struct AllOfExpr(pub Vec<Box<dyn QueryExpr>>);

impl QueryExpr for AllOfExpr {
    fn evaluate(&self, ctx: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        let mut result = EvaluateResult::True;
        for expr in &self.0 {
            result = result.and(expr.evaluate(ctx, file));
            if result == EvaluateResult::False {
                break;
            }
        }
        result
    }
}

/// Disjunction, the dual of [`AllOfExpr`].
#[derive(Debug)]
pub struct AnyOfExpr(pub Vec<Box<dyn QueryExpr>>);

impl QueryExpr for AnyOfExpr {
    fn evaluate(&self, ctx: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        let mut result = EvaluateResult::False;
        for expr in &self.0 {
            result = result.or(expr.evaluate(ctx, file));
            if result == EvaluateResult::True {
                break;
            }
        }
        result
    }
}

#[derive(Debug)]
pub struct NotExpr(pub Box<dyn QueryExpr>);

impl QueryExpr for NotExpr {
    fn evaluate(&self, ctx: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        self.0.evaluate(ctx, file).not()
    }
}

pub fn parse_true(_: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    expect_args(term, 0, 0)?;
    Ok(Box::new(ConstExpr(true)))
}

pub fn parse_false(_: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    expect_args(term, 0, 0)?;
    Ok(Box::new(ConstExpr(false)))
}

fn parse_operands(
    ctx: &QueryBuildContext<'_>,
    term: &Value,
) -> Result<Vec<Box<dyn QueryExpr>>> {
    let args = term_args(term);
    if args.is_empty() {
        return Err(WatchqueryError::parse(format!(
            "\"{}\" requires at least one operand",
            term_name(term)?
        )));
    }
    args.iter().map(|arg| ctx.parse(arg)).collect()
}

pub fn parse_allof(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    Ok(Box::new(AllOfExpr(parse_operands(ctx, term)?)))
}

pub fn parse_anyof(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    Ok(Box::new(AnyOfExpr(parse_operands(ctx, term)?)))
}

pub fn parse_not(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    let args = expect_args(term, 1, 1)?;
    Ok(Box::new(NotExpr(ctx.parse(&args[0])?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::terms::test_support::{StubFile, build, ctx, try_build};

    #[test]
    fn allof_with_unknown_and_false_is_false() {
        // "exists" is unknown on this stub; "false" decides.
        let expr = build(r#"["allof", "exists", "false"]"#);
        let mut file = StubFile::unknown("x");
        assert_eq!(expr.evaluate(&ctx(), &mut file), EvaluateResult::False);
    }

    #[test]
    fn allof_with_unknown_and_true_is_indeterminate() {
        let expr = build(r#"["allof", "true", "exists"]"#);
        let mut file = StubFile::unknown("x");
        assert_eq!(expr.evaluate(&ctx(), &mut file), EvaluateResult::Indeterminate);
    }

    #[test]
    fn anyof_with_unknown_and_true_is_true() {
        let expr = build(r#"["anyof", "exists", "true"]"#);
        let mut file = StubFile::unknown("x");
        assert_eq!(expr.evaluate(&ctx(), &mut file), EvaluateResult::True);
    }

    #[test]
    fn not_of_unknown_is_indeterminate() {
        let expr = build(r#"["not", "exists"]"#);
        let mut file = StubFile::unknown("x");
        assert_eq!(expr.evaluate(&ctx(), &mut file), EvaluateResult::Indeterminate);
    }

    #[test]
    fn arity_is_checked_at_parse_time() {
        assert!(try_build(r#"["allof"]"#).is_err());
        assert!(try_build(r#""anyof""#).is_err());
        assert!(try_build(r#"["not", "true", "false"]"#).is_err());
        assert!(try_build(r#"["true", 1]"#).is_err());
    }
}
