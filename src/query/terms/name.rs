// src/query/terms/name.rs

use std::collections::HashSet;

use toml::Value;

use crate::errors::Result;
use crate::file::FileState;
use crate::query::parse::{expect_args, expect_str, expect_str_list};
use crate::query::terms::NameScope;
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

/// Exact name match against a set of names.
///
/// `["name", "Cargo.toml"]`, `["name", ["a.c", "b.c"], "wholename"]`.
#[derive(Debug)]
pub struct NameExpr {
    names: HashSet<String>,
    scope: NameScope,
    case_insensitive: bool,
}

impl QueryExpr for NameExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        let Some(subject) = self.scope.subject(&*file) else {
            return EvaluateResult::Indeterminate;
        };
        if self.case_insensitive {
            self.names.contains(&subject.to_lowercase()).into()
        } else {
            self.names.contains(&*subject).into()
        }
    }
}

fn parse(
    ctx: &QueryBuildContext<'_>,
    term: &Value,
    term_name: &str,
    case_insensitive: bool,
) -> Result<Box<dyn QueryExpr>> {
    let args = expect_args(term, 1, 2)?;
    let scope = match args.get(1) {
        Some(raw) => NameScope::parse(term_name, Some(expect_str(term_name, raw, "scope")?))?,
        None => NameScope::Basename,
    };
    let case_insensitive = case_insensitive || !ctx.case_sensitive;
    let names = expect_str_list(term_name, &args[0], "name")?
        .into_iter()
        .map(|n| if case_insensitive { n.to_lowercase() } else { n })
        .collect();
    Ok(Box::new(NameExpr {
        names,
        scope,
        case_insensitive,
    }))
}

pub fn parse_name(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    parse(ctx, term, "name", false)
}

pub fn parse_iname(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    parse(ctx, term, "iname", true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::terms::test_support::{StubFile, build, ctx, try_build};

    #[test]
    fn basename_is_the_default_scope() {
        let expr = build(r#"["name", "lib.rs"]"#);
        let mut file = StubFile::file("src/lib.rs", 1);
        assert_eq!(expr.evaluate(&ctx(), &mut file), EvaluateResult::True);
    }

    #[test]
    fn wholename_scope_uses_relative_path() {
        let expr = build(r#"["name", ["src/lib.rs", "src/main.rs"], "wholename"]"#);
        let mut hit = StubFile::file("src/main.rs", 1);
        let mut miss = StubFile::file("lib.rs", 1);
        assert_eq!(expr.evaluate(&ctx(), &mut hit), EvaluateResult::True);
        assert_eq!(expr.evaluate(&ctx(), &mut miss), EvaluateResult::False);
    }

    #[test]
    fn iname_ignores_case() {
        let expr = build(r#"["iname", "readme.md"]"#);
        let mut file = StubFile::file("README.md", 1);
        assert_eq!(expr.evaluate(&ctx(), &mut file), EvaluateResult::True);
        let strict = build(r#"["name", "readme.md"]"#);
        assert_eq!(strict.evaluate(&ctx(), &mut file), EvaluateResult::False);
    }

    #[test]
    fn rejects_bad_scope() {
        assert!(try_build(r#"["name", "a", "dirname"]"#).is_err());
    }
}
