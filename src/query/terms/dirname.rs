// src/query/terms/dirname.rs

use toml::Value;

use crate::errors::{Result, WatchqueryError};
use crate::file::FileState;
use crate::query::parse::{expect_args, expect_integer, expect_str};
use crate::query::terms::CompareOp;
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

/// Files below a directory, optionally constrained by depth.
///
/// `["dirname", "src"]` matches everything under `src/`;
/// `["dirname", "src", ["depth", "eq", 0]]` only its direct children.
/// Depth 0 is a file directly inside the directory.
#[derive(Debug)]
pub struct DirNameExpr {
    dir: String,
    op: CompareOp,
    depth: i64,
    case_insensitive: bool,
}

impl DirNameExpr {
    /// Depth of `file_dir` below `self.dir`, or `None` if it's not below it.
    fn depth_of(&self, file_dir: &str) -> Option<i64> {
        let rest = if self.dir.is_empty() {
            file_dir
        } else if file_dir == self.dir {
            ""
        } else {
            file_dir
                .strip_prefix(self.dir.as_str())?
                .strip_prefix('/')?
        };
        if rest.is_empty() {
            Some(0)
        } else {
            Some(rest.split('/').count() as i64)
        }
    }
}

impl QueryExpr for DirNameExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        let Some(dir) = file.dir_name() else {
            return EvaluateResult::Indeterminate;
        };
        let dir = dir.replace('\\', "/");
        let dir = if self.case_insensitive {
            dir.to_lowercase()
        } else {
            dir
        };
        match self.depth_of(&dir) {
            Some(depth) => self.op.matches(depth, self.depth).into(),
            None => EvaluateResult::False,
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
    let case_insensitive = case_insensitive || !ctx.case_sensitive;

    let dir = expect_str(term_name, &args[0], "directory")?
        .trim_end_matches('/')
        .to_string();
    let dir = if case_insensitive {
        dir.to_lowercase()
    } else {
        dir
    };

    let (op, depth) = match args.get(1) {
        None => (CompareOp::Ge, 0),
        Some(Value::Array(clause)) if clause.len() == 3 => {
            if clause[0].as_str() != Some("depth") {
                return Err(WatchqueryError::parse(format!(
                    "\"{term_name}\": expected [\"depth\", op, n]"
                )));
            }
            let op = CompareOp::parse(term_name, expect_str(term_name, &clause[1], "operator")?)?;
            let depth = expect_integer(term_name, &clause[2], "depth")?;
            (op, depth)
        }
        Some(_) => {
            return Err(WatchqueryError::parse(format!(
                "\"{term_name}\": expected [\"depth\", op, n]"
            )));
        }
    };

    Ok(Box::new(DirNameExpr {
        dir,
        op,
        depth,
        case_insensitive,
    }))
}

pub fn parse_dirname(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    parse(ctx, term, "dirname", false)
}

pub fn parse_idirname(ctx: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    parse(ctx, term, "idirname", true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::terms::test_support::{StubFile, build, ctx, try_build};

    fn eval(src: &str, name: &str) -> EvaluateResult {
        build(src).evaluate(&ctx(), &mut StubFile::unknown(name))
    }

    #[test]
    fn matches_everything_below() {
        assert_eq!(eval(r#"["dirname", "src"]"#, "src/a.rs"), EvaluateResult::True);
        assert_eq!(eval(r#"["dirname", "src"]"#, "src/x/y/a.rs"), EvaluateResult::True);
        assert_eq!(eval(r#"["dirname", "src"]"#, "srcx/a.rs"), EvaluateResult::False);
        assert_eq!(eval(r#"["dirname", "src"]"#, "a.rs"), EvaluateResult::False);
    }

    #[test]
    fn depth_constraints() {
        let direct = r#"["dirname", "src", ["depth", "eq", 0]]"#;
        assert_eq!(eval(direct, "src/a.rs"), EvaluateResult::True);
        assert_eq!(eval(direct, "src/x/a.rs"), EvaluateResult::False);

        let nested = r#"["dirname", "", ["depth", "ge", 2]]"#;
        assert_eq!(eval(nested, "a/b/c.rs"), EvaluateResult::True);
        assert_eq!(eval(nested, "a/c.rs"), EvaluateResult::False);
    }

    #[test]
    fn idirname_ignores_case() {
        assert_eq!(eval(r#"["idirname", "SRC"]"#, "src/a.rs"), EvaluateResult::True);
        assert_eq!(eval(r#"["dirname", "SRC"]"#, "src/a.rs"), EvaluateResult::False);
    }

    #[test]
    fn malformed_depth_clause() {
        assert!(try_build(r#"["dirname", "src", ["level", "eq", 0]]"#).is_err());
        assert!(try_build(r#"["dirname", "src", "deep"]"#).is_err());
    }
}
