// src/query/parse.rs

//! Expression term decoding.
//!
//! A term is either a bare name (`"exists"`) or an array whose first element
//! is the name (`["not", "empty"]`, `["size", "gt", 100]`). The registered
//! parser receives the whole term and pulls its own arguments out of it.

use toml::Value;

use crate::errors::{Result, WatchqueryError};
use crate::query::{QueryExpr, TermRegistry};

/// Parse-time context handed to every term parser.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuildContext<'a> {
    pub registry: &'a TermRegistry,
    pub case_sensitive: bool,
}

impl<'a> QueryBuildContext<'a> {
    pub fn new(registry: &'a TermRegistry, case_sensitive: bool) -> Self {
        Self {
            registry,
            case_sensitive,
        }
    }

    /// Parse one term (and, through composite parsers, its subtree).
    pub fn parse(&self, term: &Value) -> Result<Box<dyn QueryExpr>> {
        let name = term_name(term)?;
        let parser = self
            .registry
            .lookup(name)
            .ok_or_else(|| WatchqueryError::UnknownTerm(name.to_string()))?;
        parser(self, term)
    }
}

/// The name of a term.
pub fn term_name(term: &Value) -> Result<&str> {
    match term {
        Value::String(name) => Ok(name),
        Value::Array(items) => match items.first() {
            Some(Value::String(name)) => Ok(name),
            Some(other) => Err(WatchqueryError::parse(format!(
                "term name must be a string, got {}",
                other.type_str()
            ))),
            None => Err(WatchqueryError::parse("empty term array")),
        },
        other => Err(WatchqueryError::parse(format!(
            "expected a term name or array, got {}",
            other.type_str()
        ))),
    }
}

/// Arguments following the term name (empty for a bare name).
pub fn term_args(term: &Value) -> &[Value] {
    match term {
        Value::Array(items) if !items.is_empty() => &items[1..],
        _ => &[],
    }
}

/// Arguments of a term that must have between `min` and `max` of them.
pub fn expect_args<'v>(term: &'v Value, min: usize, max: usize) -> Result<&'v [Value]> {
    let args = term_args(term);
    let name = term_name(term)?;
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(WatchqueryError::parse(format!(
            "\"{name}\" expects {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(args)
}

pub fn expect_str<'v>(term_name: &str, value: &'v Value, what: &str) -> Result<&'v str> {
    value.as_str().ok_or_else(|| {
        WatchqueryError::parse(format!(
            "\"{term_name}\": {what} must be a string, got {}",
            value.type_str()
        ))
    })
}

pub fn expect_integer(term_name: &str, value: &Value, what: &str) -> Result<i64> {
    value.as_integer().ok_or_else(|| {
        WatchqueryError::parse(format!(
            "\"{term_name}\": {what} must be an integer, got {}",
            value.type_str()
        ))
    })
}

/// A string or an array of strings.
pub fn expect_str_list(term_name: &str, value: &Value, what: &str) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| expect_str(term_name, item, what).map(str::to_string))
            .collect(),
        other => Err(WatchqueryError::parse(format!(
            "\"{term_name}\": {what} must be a string or array of strings, got {}",
            other.type_str()
        ))),
    }
}
