use crate::error::JacobianError;
use crate::expr::{ExprGraph, ExprId};
use crate::jacobian::{self, ForwardJacobian, JacobianConfig};
use crate::sparse::SparseMatrix;

/// Sparse Jacobian of `exprs` with respect to the symbols `wrt`.
///
/// Shared subexpressions are extracted first and differentiated once; the
/// result is expressed over the original symbols only.
///
/// ```
/// use symjac::{jacobian, ExprGraph};
///
/// let mut g = ExprGraph::new();
/// let x = g.symbol("x");
/// let y = g.symbol("y");
/// let xy = g.mul(x, y);
/// let yy = g.mul(y, y);
/// let f = g.add(xy, yy);
///
/// let j = jacobian(&mut g, &[f], &[x, y]).unwrap();
/// assert_eq!(j.get(0, 0), Some(y));
/// assert_eq!(g.display(j.get(0, 1).unwrap()).to_string(), "x + 2*y");
/// ```
pub fn jacobian(
    graph: &mut ExprGraph,
    exprs: &[ExprId],
    wrt: &[ExprId],
) -> Result<SparseMatrix, JacobianError> {
    ForwardJacobian::new().compute(graph, exprs, wrt)
}

/// [`jacobian`] with explicit configuration.
pub fn jacobian_with(
    graph: &mut ExprGraph,
    exprs: &[ExprId],
    wrt: &[ExprId],
    config: &JacobianConfig,
) -> Result<SparseMatrix, JacobianError> {
    ForwardJacobian::with_config(config.clone()).compute(graph, exprs, wrt)
}

/// Jacobian by direct differentiation of every entry, without extraction.
pub fn naive_jacobian(
    graph: &mut ExprGraph,
    exprs: &[ExprId],
    wrt: &[ExprId],
) -> Result<SparseMatrix, JacobianError> {
    jacobian::naive_jacobian(graph, exprs, wrt)
}
