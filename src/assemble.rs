//! Symbol-space Jacobian of the reduced expression vector.
//!
//! `J = f1 + f2 * C`, where `f1` holds the direct partials of each reduced
//! row with respect to the variables and `f2` its partials with respect to the
//! definition symbols it references.

use rustc_hash::FxHashMap;

use crate::accumulate::partial_row;
use crate::backend::ExprBackend;
use crate::error::{DiffSite, JacobianError};
use crate::expr::{ExprId, SymbolId};
use crate::sparse::{add_rows, row_times, SparseRow};

/// Assemble one sparse row per reduced expression.
///
/// `definitions` are the definition symbols in order and `block` their
/// cumulative rows. With no definitions this is just `f1`.
pub fn assemble<B: ExprBackend>(
    backend: &mut B,
    reduced: &[ExprId],
    definitions: &[SymbolId],
    symbol_index: &FxHashMap<SymbolId, usize>,
    block: &[SparseRow],
    wrt: &[SymbolId],
    prune: bool,
) -> Result<Vec<SparseRow>, JacobianError> {
    let mut rows = Vec::with_capacity(reduced.len());
    for (i, &expr) in reduced.iter().enumerate() {
        let site = DiffSite::ReducedRow(i);
        let free = backend.free_symbols(expr).to_vec();

        let direct: Vec<(usize, SymbolId)> = wrt
            .iter()
            .enumerate()
            .filter(|&(_, s)| !prune || free.binary_search(s).is_ok())
            .map(|(j, &s)| (j, s))
            .collect();
        let f1 = partial_row(backend, expr, direct, site)?;

        let through: Vec<(usize, SymbolId)> = if prune {
            let mut ks: Vec<(usize, SymbolId)> = free
                .iter()
                .filter_map(|s| symbol_index.get(s).map(|&k| (k, *s)))
                .collect();
            ks.sort_unstable();
            ks
        } else {
            definitions.iter().copied().enumerate().collect()
        };
        let f2 = partial_row(backend, expr, through, site)?;

        let row = if f2.is_empty() {
            f1
        } else {
            let chained = row_times(backend, &f2, block);
            add_rows(backend, &f1, &chained)
        };
        rows.push(row);
    }
    Ok(rows)
}
