#![allow(dead_code)]

use approx::assert_relative_eq;
use symjac::{Env, ExprGraph, ExprId, SparseMatrix, SymbolKind};

pub const TOL: f64 = 1e-10;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ─── Planar chain ──────────────────────────────────────────────────────────
// n links with joint angles q_i. theta_k = q_0 + ... + q_k is the absolute
// angle of link k; the tip of link k sits at (sum sin theta_i, sum cos theta_i).
// sin(theta_i) and cos(theta_i) are shared by every later tip.

pub struct Chain {
    pub exprs: Vec<ExprId>,
    pub wrt: Vec<ExprId>,
}

pub fn planar_chain(g: &mut ExprGraph, n: usize) -> Chain {
    let wrt: Vec<ExprId> = (0..n).map(|i| g.symbol(&format!("q{}", i))).collect();
    let mut exprs = Vec::with_capacity(2 * n + 1);
    let mut theta = ExprId::ZERO;
    let mut px = ExprId::ZERO;
    let mut py = ExprId::ZERO;
    for &q in &wrt {
        theta = g.add(theta, q);
        let s = g.sin(theta);
        let c = g.cos(theta);
        px = g.add(px, s);
        py = g.add(py, c);
        exprs.push(px);
        exprs.push(py);
    }
    let px2 = g.powi(px, 2);
    let py2 = g.powi(py, 2);
    exprs.push(g.add(px2, py2));
    Chain { exprs, wrt }
}

/// Deterministic evaluation point in (0.1, 1).
pub fn point(g: &ExprGraph, vars: &[ExprId]) -> Env {
    g.bind(
        vars.iter()
            .enumerate()
            .map(|(i, &v)| (v, 0.1 + ((i as f64) * 0.37).fract() * 0.8)),
    )
}

pub fn assert_numerically_equal(g: &mut ExprGraph, a: &SparseMatrix, b: &SparseMatrix, env: &Env) {
    assert_eq!(a.shape(), b.shape());
    let da = a.evaluate(g, env).unwrap();
    let db = b.evaluate(g, env).unwrap();
    for (row_a, row_b) in da.iter().zip(db.iter()) {
        for (x, y) in row_a.iter().zip(row_b.iter()) {
            assert_relative_eq!(x, y, epsilon = TOL, max_relative = TOL);
        }
    }
}

/// No entry is the zero node and no entry mentions an extracted symbol.
pub fn assert_clean(g: &ExprGraph, m: &SparseMatrix) {
    for (i, j, e) in m.iter() {
        assert_ne!(e, ExprId::ZERO, "stored zero at ({}, {})", i, j);
        for &s in g.free_symbols(e) {
            assert_eq!(
                g.symbol_kind(s),
                SymbolKind::User,
                "entry ({}, {}) = {} mentions {}",
                i,
                j,
                g.display(e),
                g.symbol_name(s)
            );
        }
    }
}
