//! Error types for differentiation, evaluation and Jacobian assembly.

use std::fmt;

/// Failure of the symbolic differentiation primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// The operator has no symbolic derivative rule.
    #[error("operator `{op}` is not differentiable")]
    NotDifferentiable {
        /// Printable operator name.
        op: &'static str,
    },
}

/// Failure of numeric evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// A symbol occurring in the expression has no value in the environment.
    #[error("symbol `{0}` has no value")]
    UnboundSymbol(String),
    /// Undefined functions (`f(x)`) have no numeric interpretation.
    #[error("undefined function `{0}` cannot be evaluated")]
    UndefinedFunction(String),
    /// The result is NaN or infinite.
    #[error("evaluation produced a non-finite value ({value})")]
    NonFinite {
        /// The offending value.
        value: f64,
    },
    /// Evaluating an unevaluated derivative required differentiation, which failed.
    #[error(transparent)]
    Diff(#[from] DiffError),
}

/// Where in the pipeline a differentiation call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSite {
    /// Definition `i` of the extracted subexpression list.
    Definition(usize),
    /// Row `i` of the reduced expression vector.
    ReducedRow(usize),
    /// Row `i` of the input expression vector (direct path, no extraction).
    Row(usize),
}

impl fmt::Display for DiffSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffSite::Definition(i) => write!(f, "subexpression definition {}", i),
            DiffSite::ReducedRow(i) => write!(f, "reduced expression row {}", i),
            DiffSite::Row(i) => write!(f, "expression row {}", i),
        }
    }
}

/// Errors returned by Jacobian computation.
///
/// No partial results are ever returned alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JacobianError {
    /// The variable vector names the same symbol twice.
    #[error("variable {index} duplicates variable {first}")]
    DuplicateVariable {
        /// Position of the repeated entry.
        index: usize,
        /// Position of its first occurrence.
        first: usize,
    },
    /// A variable vector entry is not a symbol leaf.
    #[error("variable {index} is not a symbol")]
    NonSymbolVariable {
        /// Position of the offending entry.
        index: usize,
    },
    /// The extractor produced a definition referencing itself or a later symbol.
    #[error(
        "subexpression definition {definition} references subexpression {symbol_index}, \
         which is not defined before it"
    )]
    ExtractorContract {
        /// Index of the offending definition.
        definition: usize,
        /// Index of the referenced symbol.
        symbol_index: usize,
    },
    /// The extractor returned a reduced vector of the wrong length.
    #[error("extractor returned {found} reduced expressions for {expected} inputs")]
    ReducedLength {
        /// Number of input expressions.
        expected: usize,
        /// Number of reduced expressions returned.
        found: usize,
    },
    /// The differentiation primitive failed.
    #[error("differentiation failed in {site}")]
    Differentiation {
        /// Which definition or row triggered the failure.
        site: DiffSite,
        /// Underlying failure, unmodified.
        #[source]
        source: DiffError,
    },
}

impl JacobianError {
    pub(crate) fn diff(site: DiffSite) -> impl FnOnce(DiffError) -> JacobianError {
        move |source| JacobianError::Differentiation { site, source }
    }
}
