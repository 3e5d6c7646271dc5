//! Expression-valued sparse matrices.
//!
//! Rows are ordered maps from column to entry. An absent key is an exact zero
//! and no stored entry is ever the zero node: every constructor and operation
//! here filters zeros, including sums that cancel.

use std::collections::BTreeMap;

use crate::backend::ExprBackend;
use crate::error::EvalError;
use crate::expr::{Env, ExprGraph, ExprId};

/// One sparse row: column index to non-zero entry.
pub type SparseRow = BTreeMap<usize, ExprId>;

/// Sparse matrix of expressions with explicit dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseMatrix {
    nrows: usize,
    ncols: usize,
    rows: Vec<SparseRow>,
}

impl SparseMatrix {
    /// All-zero matrix of the given shape.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        SparseMatrix {
            nrows,
            ncols,
            rows: vec![SparseRow::new(); nrows],
        }
    }

    pub(crate) fn from_rows(rows: Vec<SparseRow>, ncols: usize) -> Self {
        debug_assert!(rows
            .iter()
            .all(|r| r.keys().all(|&c| c < ncols) && !r.values().any(|&v| v == ExprId::ZERO)));
        SparseMatrix {
            nrows: rows.len(),
            ncols,
            rows,
        }
    }

    /// Number of rows, one per expression.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns, one per variable.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// `(nrows, ncols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    /// Entry at `(row, col)`, `None` for a zero.
    pub fn get(&self, row: usize, col: usize) -> Option<ExprId> {
        self.rows.get(row).and_then(|r| r.get(&col).copied())
    }

    /// Store `value` at `(row, col)`, removing the entry if `value` is zero.
    /// Returns the previous entry.
    ///
    /// # Panics
    ///
    /// Panics if `(row, col)` is out of bounds.
    pub fn insert(&mut self, row: usize, col: usize, value: ExprId) -> Option<ExprId> {
        assert!(
            row < self.nrows && col < self.ncols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        if value == ExprId::ZERO {
            self.rows[row].remove(&col)
        } else {
            self.rows[row].insert(col, value)
        }
    }

    /// Stored entries of one row.
    pub fn row(&self, row: usize) -> &SparseRow {
        &self.rows[row]
    }

    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    /// Row-major iterator over `(row, col, entry)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, ExprId)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, r)| r.iter().map(move |(&j, &e)| (i, j, e)))
    }

    /// Dictionary-of-keys view.
    pub fn to_dok(&self) -> BTreeMap<(usize, usize), ExprId> {
        self.iter().map(|(i, j, e)| ((i, j), e)).collect()
    }

    /// Dense rows with zeros filled in.
    pub fn to_dense(&self) -> Vec<Vec<ExprId>> {
        self.rows
            .iter()
            .map(|r| {
                let mut dense = vec![ExprId::ZERO; self.ncols];
                for (&j, &e) in r {
                    dense[j] = e;
                }
                dense
            })
            .collect()
    }

    /// Evaluate every entry numerically. Absent entries are `0.0`.
    pub fn evaluate(&self, graph: &mut ExprGraph, env: &Env) -> Result<Vec<Vec<f64>>, EvalError> {
        let mut out = vec![vec![0.0; self.ncols]; self.nrows];
        for (i, j, e) in self.iter() {
            out[i][j] = graph.evaluate(e, env)?;
        }
        Ok(out)
    }
}

/// Append-only row store. Rows are finalised once, in order.
#[derive(Clone, Debug, Default)]
pub struct SparseRows {
    rows: Vec<SparseRow>,
}

impl SparseRows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SparseRows {
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Append the next row; returns its index.
    pub fn push_row(&mut self, row: SparseRow) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows pushed so far.
    pub fn as_slice(&self) -> &[SparseRow] {
        &self.rows
    }

    /// Freeze into a matrix with `ncols` columns.
    pub fn finish(self, ncols: usize) -> SparseMatrix {
        SparseMatrix::from_rows(self.rows, ncols)
    }
}

/// Sum collected terms per column, dropping columns that cancel.
fn collect_terms<B: ExprBackend>(backend: &mut B, acc: BTreeMap<usize, Vec<ExprId>>) -> SparseRow {
    let mut out = SparseRow::new();
    for (col, terms) in acc {
        let sum = if terms.len() == 1 {
            terms[0]
        } else {
            backend.add_many(&terms)
        };
        if !backend.is_zero(sum) {
            out.insert(col, sum);
        }
    }
    out
}

/// `row * block`, where `row` is indexed by rows of `block`.
///
/// Only the non-zeros of `row` and of the block rows they select are visited.
pub fn row_times<B: ExprBackend>(backend: &mut B, row: &SparseRow, block: &[SparseRow]) -> SparseRow {
    let mut acc: BTreeMap<usize, Vec<ExprId>> = BTreeMap::new();
    for (&k, &coef) in row {
        for (&j, &entry) in &block[k] {
            let term = backend.mul(coef, entry);
            if !backend.is_zero(term) {
                acc.entry(j).or_default().push(term);
            }
        }
    }
    collect_terms(backend, acc)
}

/// Elementwise `a + b`.
pub fn add_rows<B: ExprBackend>(backend: &mut B, a: &SparseRow, b: &SparseRow) -> SparseRow {
    let mut acc: BTreeMap<usize, Vec<ExprId>> = BTreeMap::new();
    for (&j, &e) in a.iter().chain(b.iter()) {
        acc.entry(j).or_default().push(e);
    }
    collect_terms(backend, acc)
}
