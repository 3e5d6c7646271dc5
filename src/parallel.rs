//! Concurrent evaluation of independent Jacobian problems.
//!
//! The accumulation loop is strictly sequential (row `i` needs rows `< i`), so
//! parallelism is across problems. Each problem owns its graph; nothing is
//! shared between threads.

use rayon::prelude::*;

use crate::error::JacobianError;
use crate::expr::{ExprGraph, ExprId};
use crate::jacobian::{ForwardJacobian, JacobianConfig};
use crate::sparse::SparseMatrix;

/// One self-contained Jacobian computation.
#[derive(Clone, Debug)]
pub struct JacobianProblem {
    /// Graph owning every expression below; the run may grow it.
    pub graph: ExprGraph,
    /// Rows of the Jacobian.
    pub exprs: Vec<ExprId>,
    /// Symbol leaves giving the columns.
    pub wrt: Vec<ExprId>,
}

impl JacobianProblem {
    pub fn new(graph: ExprGraph, exprs: Vec<ExprId>, wrt: Vec<ExprId>) -> Self {
        JacobianProblem { graph, exprs, wrt }
    }
}

/// Compute every problem's Jacobian in parallel.
///
/// Results are in input order. Each problem's graph grows with the nodes its
/// computation creates, so the returned entries can be read from it.
pub fn jacobian_batch_par(
    problems: &mut [JacobianProblem],
    config: &JacobianConfig,
) -> Vec<Result<SparseMatrix, JacobianError>> {
    problems
        .par_iter_mut()
        .map(|p| {
            ForwardJacobian::with_config(config.clone()).compute(&mut p.graph, &p.exprs, &p.wrt)
        })
        .collect()
}
