// src/query/mod.rs

//! Predicate trees over file state.
//!
//! This module is responsible for:
//! - The tri-valued [`EvaluateResult`] and its propagation rules.
//! - The [`QueryExpr`] trait every predicate node implements.
//! - Building trees from a TOML expression via the [`TermRegistry`].
//! - Running a query over a set of candidate files ([`exec`]).
//!
//! It does **not** know where candidate files come from; see
//! [`crate::root`] for that.

pub mod exec;
pub mod parse;
pub mod registry;
pub mod terms;

use std::fmt::Debug;
use std::sync::Arc;

use crate::clock::{ClockPosition, ClockValue, RootClock};
use crate::errors::Result;
use crate::file::FileState;
use crate::types::IndeterminatePolicy;

pub use exec::{QueryResult, execute};
pub use parse::QueryBuildContext;
pub use registry::{TermParser, TermRegistry};

/// Outcome of evaluating a predicate against one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluateResult {
    True,
    False,
    /// Not enough is known about the file to decide.
    Indeterminate,
}

impl EvaluateResult {
    pub fn and(self, other: EvaluateResult) -> EvaluateResult {
        use EvaluateResult::*;
        match (self, other) {
            (False, _) | (_, False) => False,
            (Indeterminate, _) | (_, Indeterminate) => Indeterminate,
            (True, True) => True,
        }
    }

    pub fn or(self, other: EvaluateResult) -> EvaluateResult {
        use EvaluateResult::*;
        match (self, other) {
            (True, _) | (_, True) => True,
            (Indeterminate, _) | (_, Indeterminate) => Indeterminate,
            (False, False) => False,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> EvaluateResult {
        match self {
            EvaluateResult::True => EvaluateResult::False,
            EvaluateResult::False => EvaluateResult::True,
            EvaluateResult::Indeterminate => EvaluateResult::Indeterminate,
        }
    }

    pub fn is_true(self) -> bool {
        self == EvaluateResult::True
    }

    pub fn is_indeterminate(self) -> bool {
        self == EvaluateResult::Indeterminate
    }
}

impl From<bool> for EvaluateResult {
    fn from(value: bool) -> Self {
        if value {
            EvaluateResult::True
        } else {
            EvaluateResult::False
        }
    }
}

/// An unknown input maps to `Indeterminate`.
impl From<Option<bool>> for EvaluateResult {
    fn from(value: Option<bool>) -> Self {
        value.map_or(EvaluateResult::Indeterminate, EvaluateResult::from)
    }
}

/// One node of a predicate tree.
///
/// Nodes are built once per query and then evaluated once per candidate,
/// possibly from several threads at a time, so they hold no mutable state.
pub trait QueryExpr: Send + Sync + Debug {
    fn evaluate(&self, ctx: &QueryContext, file: &mut dyn FileState) -> EvaluateResult;
}

/// Per-execution state handed to every node.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub root_number: u32,
    /// Clock at the start of the execution.
    pub clock_at_start: ClockValue,
    pub since: Option<ClockPosition>,
    pub case_sensitive: bool,
}

impl QueryContext {
    /// True if the query has no usable cursor for this root.
    pub fn is_fresh_instance(&self) -> bool {
        self.since
            .map(|pos| pos.is_fresh_instance_for(self.root_number))
            .unwrap_or(true)
    }
}

/// Query-level options that are not part of the expression.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub since: Option<ClockPosition>,
    pub case_sensitive: bool,
    pub indeterminate: IndeterminatePolicy,
    /// Evaluate candidates across rayon's worker pool.
    pub parallel: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            since: None,
            case_sensitive: true,
            indeterminate: IndeterminatePolicy::Include,
            parallel: false,
        }
    }
}

/// A parsed, ready-to-run query. Clones share the expression tree.
#[derive(Debug, Clone)]
pub struct Query {
    pub expr: Arc<dyn QueryExpr>,
    pub options: QueryOptions,
}

impl Query {
    /// Build a query from an expression term. Fails without producing a
    /// partial tree if any term is unknown or malformed.
    pub fn build(
        registry: &TermRegistry,
        expression: &toml::Value,
        options: QueryOptions,
    ) -> Result<Self> {
        let ctx = QueryBuildContext::new(registry, options.case_sensitive);
        let expr = Arc::from(ctx.parse(expression)?);
        Ok(Self { expr, options })
    }

    /// Evaluation context for one execution against `clock`'s root.
    pub fn context(&self, clock: &RootClock) -> QueryContext {
        self.context_as_of(clock, clock.current())
    }

    /// Like [`context`](Self::context), for candidates known to be current
    /// as of `clock_at_start` rather than as of now.
    pub fn context_as_of(&self, clock: &RootClock, clock_at_start: ClockValue) -> QueryContext {
        QueryContext {
            root_number: clock.root_number(),
            clock_at_start,
            since: self.options.since,
            case_sensitive: self.options.case_sensitive,
        }
    }

    pub fn evaluate(&self, ctx: &QueryContext, file: &mut dyn FileState) -> EvaluateResult {
        self.expr.evaluate(ctx, file)
    }
}
