// src/query/registry.rs

//! Name → constructor mapping for expression terms.
//!
//! The registry is filled by explicit `register` calls before any query is
//! parsed. The process-wide instance is write-once: either installed by the
//! embedder with [`install_global`] or filled with the builtin terms on first
//! use of [`global`].

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::errors::{Result, WatchqueryError};
use crate::query::{QueryBuildContext, QueryExpr};

/// Builds a node from the whole term value (including its name).
pub type TermParser = fn(&QueryBuildContext<'_>, &toml::Value) -> Result<Box<dyn QueryExpr>>;

#[derive(Default)]
pub struct TermRegistry {
    parsers: BTreeMap<String, TermParser>,
}

impl std::fmt::Debug for TermRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermRegistry")
            .field("terms", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TermRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every builtin term.
    pub fn with_builtin_terms() -> Self {
        let mut registry = Self::new();
        crate::query::terms::register_builtin_terms(&mut registry)
            .expect("builtin term names are distinct");
        registry
    }

    /// Add a term. Registering the same name twice is an error.
    pub fn register(&mut self, name: &str, parser: TermParser) -> Result<()> {
        if self.parsers.contains_key(name) {
            return Err(WatchqueryError::DuplicateTerm(name.to_string()));
        }
        debug!(term = name, "registered expression term");
        self.parsers.insert(name.to_string(), parser);
        Ok(())
    }

    /// Exact-name lookup.
    pub fn lookup(&self, name: &str) -> Option<TermParser> {
        self.parsers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(|s| s.as_str())
    }
}

static GLOBAL: OnceLock<TermRegistry> = OnceLock::new();

/// Install the process-wide registry. Fails if one is already in place.
pub fn install_global(registry: TermRegistry) -> Result<()> {
    GLOBAL.set(registry).map_err(|_| {
        WatchqueryError::ConfigError("the global term registry is already installed".to_string())
    })
}

/// The process-wide registry, defaulting to the builtin terms.
pub fn global() -> &'static TermRegistry {
    GLOBAL.get_or_init(TermRegistry::with_builtin_terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::terms::boolean::ConstExpr;

    fn parse_true(_: &QueryBuildContext<'_>, _: &toml::Value) -> Result<Box<dyn QueryExpr>> {
        Ok(Box::new(ConstExpr(true)))
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = TermRegistry::new();
        registry.register("always", parse_true).unwrap();
        let err = registry.register("always", parse_true).unwrap_err();
        assert!(matches!(err, WatchqueryError::DuplicateTerm(name) if name == "always"));
    }

    #[test]
    fn lookup_is_exact() {
        let registry = TermRegistry::with_builtin_terms();
        assert!(registry.lookup("exists").is_some());
        assert!(registry.lookup("Exists").is_none());
        assert!(registry.lookup("exist").is_none());
    }

    #[test]
    fn every_builtin_is_registered() {
        let registry = TermRegistry::with_builtin_terms();
        assert_eq!(registry.names().count(), 19);
        assert!(registry.contains("idirname"));
        assert!(registry.contains("since"));
    }

    #[test]
    fn builtins_refuse_to_shadow_existing_terms() {
        let mut registry = TermRegistry::new();
        registry.register("name", parse_true).unwrap();
        let err = crate::query::terms::register_builtin_terms(&mut registry).unwrap_err();
        assert!(matches!(err, WatchqueryError::DuplicateTerm(name) if name == "name"));
    }

    #[test]
    fn global_holds_builtins() {
        assert!(global().contains("empty"));
        assert!(global().contains("allof"));
    }
}
