//! Sparse forward-mode Jacobian over an extracted subexpression graph.
//!
//! Pipeline for `compute(exprs, wrt)`:
//!
//! 1. validate `wrt` (distinct symbol leaves);
//! 2. extract common subexpressions: definitions `x_0..x_{L-1}` plus reduced rows;
//! 3. restore derivative operands that extraction hid behind definition symbols;
//! 4. accumulate the cumulative block `C` (one row per definition);
//! 5. assemble `J = f1 + f2 * C` in symbol space;
//! 6. back-substitute definition symbols into the entries of `J`.
//!
//! The expanded expressions are never differentiated; only definitions and
//! reduced rows are, each once per relevant variable.

use log::debug;
use rustc_hash::FxHashMap;

use crate::accumulate::{accumulate, partial_row, symbol_indices};
use crate::assemble::assemble;
use crate::backend::ExprBackend;
use crate::backsub::{back_substitute, back_substitution_map};
use crate::cse::{CseExtractor, StructuralCse};
use crate::error::{DiffSite, JacobianError};
use crate::expr::{ExprId, SymbolId};
use crate::sanitize::sanitize_derivatives;
use crate::sparse::{SparseMatrix, SparseRow};

/// Switches for [`ForwardJacobian`].
///
/// Pruning and extraction trade work, not results. Skipping sanitization is
/// only sound for inputs without unevaluated derivatives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JacobianConfig {
    /// Restore derivative operands before differentiating. Only turn this off
    /// for inputs known to contain no unevaluated derivatives.
    pub sanitize_derivatives: bool,
    /// Only differentiate with respect to symbols free in each expression.
    pub prune_free_symbols: bool,
    /// Extract common subexpressions; when off, differentiate directly.
    pub use_cse: bool,
}

impl Default for JacobianConfig {
    fn default() -> Self {
        JacobianConfig {
            sanitize_derivatives: true,
            prune_free_symbols: true,
            use_cse: true,
        }
    }
}

/// Statistics of one computation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JacobianTrace {
    /// Number of extracted definitions.
    pub definitions: usize,
    /// Non-zeros of the cumulative block `C`.
    pub block_nnz: usize,
    /// Non-zeros of the result.
    pub jacobian_nnz: usize,
}

/// Jacobian engine parameterised over the subexpression extractor.
#[derive(Clone, Debug, Default)]
pub struct ForwardJacobian<X = StructuralCse> {
    config: JacobianConfig,
    extractor: X,
}

impl ForwardJacobian<StructuralCse> {
    /// Default configuration with the structural extractor.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: JacobianConfig) -> Self {
        ForwardJacobian {
            config,
            extractor: StructuralCse::default(),
        }
    }
}

impl<X: CseExtractor> ForwardJacobian<X> {
    /// Default configuration with a custom extractor.
    pub fn with_extractor(extractor: X) -> Self {
        ForwardJacobian {
            config: JacobianConfig::default(),
            extractor,
        }
    }

    pub fn config(&self) -> &JacobianConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut JacobianConfig {
        &mut self.config
    }

    pub fn extractor(&self) -> &X {
        &self.extractor
    }

    /// Jacobian of `exprs` with respect to `wrt`, shape `(exprs.len(), wrt.len())`.
    pub fn compute<B: ExprBackend>(
        &mut self,
        backend: &mut B,
        exprs: &[ExprId],
        wrt: &[ExprId],
    ) -> Result<SparseMatrix, JacobianError> {
        self.compute_traced(backend, exprs, wrt).map(|(j, _)| j)
    }

    /// [`compute`](Self::compute), also returning pipeline statistics.
    pub fn compute_traced<B: ExprBackend>(
        &mut self,
        backend: &mut B,
        exprs: &[ExprId],
        wrt: &[ExprId],
    ) -> Result<(SparseMatrix, JacobianTrace), JacobianError> {
        let wrt = validate_variables(backend, wrt)?;
        let prune = self.config.prune_free_symbols;

        if !self.config.use_cse {
            let rows = direct_rows(backend, exprs, &wrt, prune)?;
            let jac = SparseMatrix::from_rows(rows, wrt.len());
            let trace = JacobianTrace {
                jacobian_nnz: jac.nnz(),
                ..JacobianTrace::default()
            };
            debug!("jacobian: {}x{} direct, {} non-zeros", exprs.len(), wrt.len(), trace.jacobian_nnz);
            return Ok((jac, trace));
        }

        let mut cse = self.extractor.extract(backend, exprs);
        if cse.reduced.len() != exprs.len() {
            return Err(JacobianError::ReducedLength {
                expected: exprs.len(),
                found: cse.reduced.len(),
            });
        }
        let index = symbol_indices(backend, &cse)?;

        let needs_sanitize = self.config.sanitize_derivatives
            && !cse.is_empty()
            && cse
                .definitions
                .iter()
                .map(|&(_, d)| d)
                .chain(cse.reduced.iter().copied())
                .any(|e| backend.contains_derivative(e));
        if needs_sanitize {
            cse = sanitize_derivatives(backend, &cse, &index);
        }

        let acc = accumulate(backend, &cse.definitions, &index, &wrt, prune)?;
        let block_nnz: usize = acc.block.as_slice().iter().map(|r| r.len()).sum();

        let symbols = cse.symbols();
        let mut rows = assemble(
            backend,
            &cse.reduced,
            &symbols,
            &index,
            acc.block.as_slice(),
            &wrt,
            prune,
        )?;

        let map = back_substitution_map(backend, &cse.definitions, &acc.locals);
        back_substitute(backend, &mut rows, &map);

        let jac = SparseMatrix::from_rows(rows, wrt.len());
        let trace = JacobianTrace {
            definitions: cse.definitions.len(),
            block_nnz,
            jacobian_nnz: jac.nnz(),
        };
        debug!(
            "jacobian: {}x{}, {} definitions, C has {} non-zeros, J has {}",
            exprs.len(),
            wrt.len(),
            trace.definitions,
            trace.block_nnz,
            trace.jacobian_nnz
        );
        Ok((jac, trace))
    }
}

/// Check that `wrt` holds distinct symbol leaves.
pub fn validate_variables<B: ExprBackend>(
    backend: &B,
    wrt: &[ExprId],
) -> Result<Vec<SymbolId>, JacobianError> {
    let mut first_seen: FxHashMap<SymbolId, usize> = FxHashMap::default();
    let mut symbols = Vec::with_capacity(wrt.len());
    for (index, &v) in wrt.iter().enumerate() {
        let sym = backend
            .symbol_of(v)
            .ok_or(JacobianError::NonSymbolVariable { index })?;
        if let Some(&first) = first_seen.get(&sym) {
            return Err(JacobianError::DuplicateVariable { index, first });
        }
        first_seen.insert(sym, index);
        symbols.push(sym);
    }
    Ok(symbols)
}

fn direct_rows<B: ExprBackend>(
    backend: &mut B,
    exprs: &[ExprId],
    wrt: &[SymbolId],
    prune: bool,
) -> Result<Vec<SparseRow>, JacobianError> {
    let mut rows = Vec::with_capacity(exprs.len());
    for (i, &expr) in exprs.iter().enumerate() {
        let candidates: Vec<(usize, SymbolId)> = wrt
            .iter()
            .enumerate()
            .filter(|&(_, s)| !prune || backend.free_symbols(expr).binary_search(s).is_ok())
            .map(|(j, &s)| (j, s))
            .collect();
        rows.push(partial_row(backend, expr, candidates, DiffSite::Row(i))?);
    }
    Ok(rows)
}

/// Reference Jacobian: differentiate every expression directly, without
/// subexpression extraction.
pub fn naive_jacobian<B: ExprBackend>(
    backend: &mut B,
    exprs: &[ExprId],
    wrt: &[ExprId],
) -> Result<SparseMatrix, JacobianError> {
    let wrt = validate_variables(backend, wrt)?;
    let rows = direct_rows(backend, exprs, &wrt, true)?;
    Ok(SparseMatrix::from_rows(rows, wrt.len()))
}
