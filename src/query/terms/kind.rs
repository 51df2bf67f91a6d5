// src/query/terms/kind.rs

//! `["type", "f"]`: match on entry kind.
//!
//! `f` regular file, `d` directory, `l` symlink; `o` or any of `b`, `c`,
//! `p`, `s` (block/char devices, fifos, sockets) match any special entry.

use toml::Value;

use crate::errors::{Result, WatchqueryError};
use crate::file::{FileKind, FileState};
use crate::query::parse::{expect_args, expect_str};
use crate::query::{EvaluateResult, QueryBuildContext, QueryContext, QueryExpr};

#[derive(Debug)]
pub struct TypeExpr {
    kind: FileKind,
}

impl QueryExpr for TypeExpr {
    fn evaluate(&self, _: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        match file.stat() {
            Some(info) => (info.kind == self.kind).into(),
            None => EvaluateResult::Indeterminate,
        }
    }
}

pub fn parse_type(_: &QueryBuildContext<'_>, term: &Value) -> Result<Box<dyn QueryExpr>> {
    let args = expect_args(term, 1, 1)?;
    let raw = expect_str("type", &args[0], "type code")?;
    let kind = match raw {
        "f" => FileKind::File,
        "d" => FileKind::Dir,
        "l" => FileKind::Symlink,
        "o" | "b" | "c" | "p" | "s" => FileKind::Other,
        other => {
            return Err(WatchqueryError::parse(format!(
                "\"type\": invalid type code {other:?}"
            )));
        }
    };
    Ok(Box::new(TypeExpr { kind }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::terms::test_support::{StubFile, build, ctx, try_build};

    #[test]
    fn matches_kind() {
        let dirs = build(r#"["type", "d"]"#);
        let mut dir = StubFile::with_kind("d", FileKind::Dir, 0);
        let mut file = StubFile::file("f", 1);
        assert_eq!(dirs.evaluate(&ctx(), &mut dir), EvaluateResult::True);
        assert_eq!(dirs.evaluate(&ctx(), &mut file), EvaluateResult::False);
    }

    #[test]
    fn unknown_stat_is_indeterminate() {
        let files = build(r#"["type", "f"]"#);
        let mut file = StubFile::unknown("x");
        assert_eq!(files.evaluate(&ctx(), &mut file), EvaluateResult::Indeterminate);
    }

    #[test]
    fn rejects_bad_codes() {
        assert!(try_build(r#"["type", "z"]"#).is_err());
        assert!(try_build(r#"["type", 1]"#).is_err());
        assert!(try_build(r#""type""#).is_err());
    }
}
