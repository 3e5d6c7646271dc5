use symjac::{ExprGraph, ExprId};

// ─── Planar chain ──────────────────────────────────────────────────────────
// n links, joint angles q_i, tip coordinates of every link plus the squared
// distance of the last tip. sin/cos of each absolute angle are shared by all
// later tips.

pub fn planar_chain(g: &mut ExprGraph, n: usize) -> (Vec<ExprId>, Vec<ExprId>) {
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
    (exprs, wrt)
}

// ─── Nested products ───────────────────────────────────────────────────────
// e_0 = q_0, e_k = sin(e_{k-1}) * q_k + e_{k-1}^2. Expanded size grows
// exponentially in n; the DAG grows linearly.

pub fn nested_products(g: &mut ExprGraph, n: usize) -> (Vec<ExprId>, Vec<ExprId>) {
    let wrt: Vec<ExprId> = (0..n).map(|i| g.symbol(&format!("q{}", i))).collect();
    let mut exprs = Vec::with_capacity(n);
    let mut e = wrt[0];
    exprs.push(e);
    for &q in &wrt[1..] {
        let s = g.sin(e);
        let sq = g.mul(s, q);
        let e2 = g.powi(e, 2);
        e = g.add(sq, e2);
        exprs.push(e);
    }
    (exprs, wrt)
}
