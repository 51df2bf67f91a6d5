// src/query/terms/mod.rs

//! Builtin expression terms.

pub mod boolean;
pub mod dirname;
pub mod exists;
pub mod kind;
pub mod name;
pub mod pattern;
pub mod since;
pub mod size;
pub mod suffix;

use std::borrow::Cow;

use crate::errors::{Result, WatchqueryError};
use crate::file::FileState;
use crate::query::TermRegistry;

/// Register every builtin term, in a fixed order. Fails if `registry`
/// already holds one of their names.
pub fn register_builtin_terms(registry: &mut TermRegistry) -> Result<()> {
    let builtins: &[(&str, crate::query::TermParser)] = &[
        ("true", boolean::parse_true),
        ("false", boolean::parse_false),
        ("allof", boolean::parse_allof),
        ("anyof", boolean::parse_anyof),
        ("not", boolean::parse_not),
        ("exists", exists::parse_exists),
        ("empty", exists::parse_empty),
        ("type", kind::parse_type),
        ("size", size::parse_size),
        ("suffix", suffix::parse_suffix),
        ("name", name::parse_name),
        ("iname", name::parse_iname),
        ("match", pattern::parse_match),
        ("imatch", pattern::parse_imatch),
        ("pcre", pattern::parse_pcre),
        ("ipcre", pattern::parse_ipcre),
        ("dirname", dirname::parse_dirname),
        ("idirname", dirname::parse_idirname),
        ("since", since::parse_since),
    ];

    for (name, parser) in builtins {
        registry.register(name, *parser)?;
    }
    Ok(())
}

/// Which part of the path a name-matching term looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    Basename,
    /// The full path relative to the root, `/`-separated.
    Wholename,
}

impl NameScope {
    pub fn parse(term_name: &str, raw: Option<&str>) -> Result<Self> {
        match raw {
            None | Some("basename") => Ok(NameScope::Basename),
            Some("wholename") => Ok(NameScope::Wholename),
            Some(other) => Err(WatchqueryError::parse(format!(
                "\"{term_name}\": invalid scope {other:?} (expected \"basename\" or \"wholename\")"
            ))),
        }
    }

    /// The text a name term matches against. `None` for names that aren't
    /// valid UTF-8, which no pattern can be said to match or not match.
    pub fn subject<'a>(&self, file: &'a dyn FileState) -> Option<Cow<'a, str>> {
        match self {
            NameScope::Basename => file.base_name().map(Cow::Borrowed),
            NameScope::Wholename => wholename(file),
        }
    }
}

pub(crate) fn wholename(file: &dyn FileState) -> Option<Cow<'_, str>> {
    let name = file.name().to_str()?;
    if name.contains('\\') {
        Some(Cow::Owned(name.replace('\\', "/")))
    } else {
        Some(Cow::Borrowed(name))
    }
}

/// Comparison operators shared by `size` and `dirname`'s depth clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn parse(term_name: &str, raw: &str) -> Result<Self> {
        match raw {
            "eq" => Ok(CompareOp::Eq),
            "ne" => Ok(CompareOp::Ne),
            "gt" => Ok(CompareOp::Gt),
            "ge" => Ok(CompareOp::Ge),
            "lt" => Ok(CompareOp::Lt),
            "le" => Ok(CompareOp::Le),
            other => Err(WatchqueryError::parse(format!(
                "\"{term_name}\": invalid operator {other:?}"
            ))),
        }
    }

    pub fn matches(&self, left: i64, right: i64) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
        }
    }
}


#[cfg(all(test, unix))]
mod tests {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    use std::path::PathBuf;

    use super::test_support::{StubFile, build, ctx};
    use crate::query::EvaluateResult;

    fn raw(name: &[u8]) -> StubFile {
        let mut file = StubFile::file("placeholder", 1);
        file.name = PathBuf::from(OsStr::from_bytes(name));
        file
    }

    #[test]
    fn non_utf8_base_name_is_indeterminate() {
        let mut file = raw(b"src/\xffbad.rs");
        for src in [
            r#"["name", "bad.rs"]"#,
            r#"["suffix", "rs"]"#,
            r#"["match", "*.rs"]"#,
            r#"["pcre", "rs$"]"#,
        ] {
            assert_eq!(
                build(src).evaluate(&ctx(), &mut file),
                EvaluateResult::Indeterminate,
                "{src}"
            );
        }
        // The directory part is still readable.
        assert_eq!(
            build(r#"["dirname", "src"]"#).evaluate(&ctx(), &mut file),
            EvaluateResult::True
        );
    }

    #[test]
    fn non_utf8_directory_is_indeterminate() {
        let mut file = raw(b"d\xff/lib.rs");
        assert_eq!(
            build(r#"["dirname", "d"]"#).evaluate(&ctx(), &mut file),
            EvaluateResult::Indeterminate
        );
        assert_eq!(
            build(r#"["match", "**/*.rs", "wholename"]"#).evaluate(&ctx(), &mut file),
            EvaluateResult::Indeterminate
        );
        assert_eq!(
            build(r#"["name", "lib.rs"]"#).evaluate(&ctx(), &mut file),
            EvaluateResult::True
        );
    }

    #[test]
    fn unknown_name_stays_unknown_under_not() {
        let mut file = raw(b"\xff.rs");
        assert_eq!(
            build(r#"["not", ["suffix", "rs"]]"#).evaluate(&ctx(), &mut file),
            EvaluateResult::Indeterminate
        );
    }
}
