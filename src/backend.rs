//! The symbolic primitives the Jacobian pipeline is written against.
//!
//! [`ExprBackend`] is the seam between the algorithm and the expression
//! representation. [`ExprGraph`] is the provided implementation; tests wrap it
//! to inject failures or count calls.

use crate::error::DiffError;
use crate::expr::{ExprGraph, ExprId, Node, Substitution, SymbolId};

/// Symbolic operations required by the Jacobian pipeline.
pub trait ExprBackend {
    /// The node behind `expr`.
    fn node(&self, expr: ExprId) -> &Node;

    /// Rebuild the operator of `expr` over new children.
    fn rebuild(&mut self, expr: ExprId, children: &[ExprId]) -> ExprId;

    /// Leaf expression of `symbol`.
    fn symbol_expr(&self, symbol: SymbolId) -> ExprId;

    /// A symbol distinct from all existing ones.
    fn fresh_symbol(&mut self, name: &str) -> SymbolId;

    /// `d expr / d var`.
    fn diff(&mut self, expr: ExprId, var: SymbolId) -> Result<ExprId, DiffError>;

    /// Sorted free symbols of `expr`.
    fn free_symbols(&self, expr: ExprId) -> &[SymbolId];

    /// Simultaneous single-pass substitution.
    fn substitute(&mut self, expr: ExprId, map: &Substitution) -> ExprId;

    /// Substitution over several roots.
    fn substitute_all(&mut self, exprs: &[ExprId], map: &Substitution) -> Vec<ExprId> {
        exprs.iter().map(|&e| self.substitute(e, map)).collect()
    }

    /// Canonical sum.
    fn add_many(&mut self, terms: &[ExprId]) -> ExprId;

    fn add(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.add_many(&[a, b])
    }

    /// Canonical product.
    fn mul(&mut self, a: ExprId, b: ExprId) -> ExprId;

    /// Exact structural zero test.
    fn is_zero(&self, expr: ExprId) -> bool;

    /// The exact zero.
    fn zero(&self) -> ExprId {
        ExprId::ZERO
    }

    /// Whether an unevaluated derivative occurs in `expr`.
    fn contains_derivative(&self, expr: ExprId) -> bool;

    /// The symbol behind `expr`, if `expr` is a symbol leaf.
    fn symbol_of(&self, expr: ExprId) -> Option<SymbolId> {
        match self.node(expr) {
            Node::Symbol(s) => Some(*s),
            _ => None,
        }
    }
}

impl ExprBackend for ExprGraph {
    #[inline]
    fn node(&self, expr: ExprId) -> &Node {
        ExprGraph::node(self, expr)
    }

    fn rebuild(&mut self, expr: ExprId, children: &[ExprId]) -> ExprId {
        ExprGraph::rebuild(self, expr, children)
    }

    #[inline]
    fn symbol_expr(&self, symbol: SymbolId) -> ExprId {
        ExprGraph::symbol_expr(self, symbol)
    }

    fn fresh_symbol(&mut self, name: &str) -> SymbolId {
        ExprGraph::fresh_symbol(self, name)
    }

    fn diff(&mut self, expr: ExprId, var: SymbolId) -> Result<ExprId, DiffError> {
        ExprGraph::diff(self, expr, var)
    }

    #[inline]
    fn free_symbols(&self, expr: ExprId) -> &[SymbolId] {
        ExprGraph::free_symbols(self, expr)
    }

    fn substitute(&mut self, expr: ExprId, map: &Substitution) -> ExprId {
        ExprGraph::substitute(self, expr, map)
    }

    fn substitute_all(&mut self, exprs: &[ExprId], map: &Substitution) -> Vec<ExprId> {
        ExprGraph::substitute_all(self, exprs, map)
    }

    fn add_many(&mut self, terms: &[ExprId]) -> ExprId {
        ExprGraph::add_many(self, terms)
    }

    fn mul(&mut self, a: ExprId, b: ExprId) -> ExprId {
        ExprGraph::mul(self, a, b)
    }

    #[inline]
    fn is_zero(&self, expr: ExprId) -> bool {
        ExprGraph::is_zero(self, expr)
    }

    #[inline]
    fn contains_derivative(&self, expr: ExprId) -> bool {
        ExprGraph::contains_derivative(self, expr)
    }

    fn symbol_of(&self, expr: ExprId) -> Option<SymbolId> {
        ExprGraph::symbol_of(self, expr)
    }
}
