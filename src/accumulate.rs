//! Forward accumulation of the cumulative Jacobian block.
//!
//! Row `i` of the block is `d(definition_i) / d(wrt)` with every definition
//! symbol resolved through the chain rule:
//!
//! ```text
//! C[i] = A[i] + B[i] * C[0..i]
//! A[i][j] = d def_i / d wrt_j
//! B[i][k] = d def_i / d sym_k,   k < i
//! ```
//!
//! Rows are finalised once, in order, and never revisited.

use log::trace;
use rustc_hash::FxHashMap;

use crate::backend::ExprBackend;
use crate::cse::CseOutput;
use crate::error::{DiffSite, JacobianError};
use crate::expr::{ExprId, SymbolId};
use crate::sparse::{add_rows, row_times, SparseRow, SparseRows};

/// Output of [`accumulate`].
#[derive(Clone, Debug)]
pub struct Accumulated {
    /// The cumulative block `C`, one row per definition.
    pub block: SparseRows,
    /// Per definition, the sorted indices of the definition symbols it
    /// references directly.
    pub locals: Vec<Vec<usize>>,
}

/// Map each definition symbol to its position, rejecting extractor output in
/// which a definition references its own or a later symbol, or a symbol is
/// defined twice.
pub fn symbol_indices<B: ExprBackend>(
    backend: &B,
    cse: &CseOutput,
) -> Result<FxHashMap<SymbolId, usize>, JacobianError> {
    let mut index = FxHashMap::default();
    for (i, &(sym, _)) in cse.definitions.iter().enumerate() {
        if let Some(&k) = index.get(&sym) {
            return Err(JacobianError::ExtractorContract {
                definition: i,
                symbol_index: k,
            });
        }
        index.insert(sym, i);
    }
    for (i, &(_, def)) in cse.definitions.iter().enumerate() {
        local_symbols(backend, def, i, &index)?;
    }
    Ok(index)
}

/// Sorted indices of the definition symbols free in `def`, which sits at
/// position `position`.
fn local_symbols<B: ExprBackend>(
    backend: &B,
    def: ExprId,
    position: usize,
    index: &FxHashMap<SymbolId, usize>,
) -> Result<Vec<usize>, JacobianError> {
    let mut locals = Vec::new();
    for s in backend.free_symbols(def) {
        if let Some(&k) = index.get(s) {
            if k >= position {
                return Err(JacobianError::ExtractorContract {
                    definition: position,
                    symbol_index: k,
                });
            }
            locals.push(k);
        }
    }
    locals.sort_unstable();
    Ok(locals)
}

/// Differentiate `expr` with respect to each `(column, symbol)` candidate,
/// keeping non-zero results.
pub(crate) fn partial_row<B, I>(
    backend: &mut B,
    expr: ExprId,
    candidates: I,
    site: DiffSite,
) -> Result<SparseRow, JacobianError>
where
    B: ExprBackend,
    I: IntoIterator<Item = (usize, SymbolId)>,
{
    let mut row = SparseRow::new();
    for (col, sym) in candidates {
        let d = backend.diff(expr, sym).map_err(JacobianError::diff(site))?;
        if !backend.is_zero(d) {
            row.insert(col, d);
        }
    }
    Ok(row)
}

/// Build the cumulative block `C` over `definitions`.
///
/// With `prune` set, `B[i]` is only formed over the symbols that occur free
/// in `definition_i`, and `A[i]` only over the variables that do; the others
/// differentiate to zero anyway.
pub fn accumulate<B: ExprBackend>(
    backend: &mut B,
    definitions: &[(SymbolId, ExprId)],
    symbol_index: &FxHashMap<SymbolId, usize>,
    wrt: &[SymbolId],
    prune: bool,
) -> Result<Accumulated, JacobianError> {
    let mut block = SparseRows::with_capacity(definitions.len());
    let mut all_locals = Vec::with_capacity(definitions.len());

    for (i, &(_, def)) in definitions.iter().enumerate() {
        let site = DiffSite::Definition(i);
        let locals = local_symbols(backend, def, i, symbol_index)?;

        let direct: Vec<(usize, SymbolId)> = wrt
            .iter()
            .enumerate()
            .filter(|&(_, s)| !prune || backend.free_symbols(def).binary_search(s).is_ok())
            .map(|(j, &s)| (j, s))
            .collect();
        let a = partial_row(backend, def, direct, site)?;
        let direct_count = a.len();

        let chained: Vec<(usize, SymbolId)> = if prune {
            locals.iter().map(|&k| (k, definitions[k].0)).collect()
        } else {
            definitions[..i].iter().enumerate().map(|(k, &(s, _))| (k, s)).collect()
        };
        let b = partial_row(backend, def, chained, site)?;

        let row = if b.is_empty() {
            a
        } else {
            let through = row_times(backend, &b, block.as_slice());
            add_rows(backend, &through, &a)
        };
        trace!(
            "accumulate: row {} has {} direct, {} chained, {} cumulative entries",
            i,
            direct_count,
            b.len(),
            row.len()
        );
        block.push_row(row);
        all_locals.push(locals);
    }

    Ok(Accumulated {
        block,
        locals: all_locals,
    })
}
