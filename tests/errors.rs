use symjac::{
    jacobian, naive_jacobian, CseExtractor, CseOutput, DiffError, DiffSite, ExprBackend, ExprGraph,
    ExprId, ForwardJacobian, JacobianError, Node, Substitution, SymbolId,
};

/// Delegates to an [`ExprGraph`], counting differentiation calls.
struct Counting {
    graph: ExprGraph,
    diffs: usize,
}

impl ExprBackend for Counting {
    fn node(&self, expr: ExprId) -> &Node {
        self.graph.node(expr)
    }
    fn rebuild(&mut self, expr: ExprId, children: &[ExprId]) -> ExprId {
        self.graph.rebuild(expr, children)
    }
    fn symbol_expr(&self, symbol: SymbolId) -> ExprId {
        self.graph.symbol_expr(symbol)
    }
    fn fresh_symbol(&mut self, name: &str) -> SymbolId {
        self.graph.fresh_symbol(name)
    }
    fn diff(&mut self, expr: ExprId, var: SymbolId) -> Result<ExprId, DiffError> {
        self.diffs += 1;
        self.graph.diff(expr, var)
    }
    fn free_symbols(&self, expr: ExprId) -> &[SymbolId] {
        self.graph.free_symbols(expr)
    }
    fn substitute(&mut self, expr: ExprId, map: &Substitution) -> ExprId {
        self.graph.substitute(expr, map)
    }
    fn add_many(&mut self, terms: &[ExprId]) -> ExprId {
        self.graph.add_many(terms)
    }
    fn mul(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.graph.mul(a, b)
    }
    fn is_zero(&self, expr: ExprId) -> bool {
        self.graph.is_zero(expr)
    }
    fn contains_derivative(&self, expr: ExprId) -> bool {
        self.graph.contains_derivative(expr)
    }
}

// ── 1. duplicate_variable ──────────────────────────────────────────

#[test]
fn duplicate_variable() {
    let mut graph = ExprGraph::new();
    let x = graph.symbol("x");
    let y = graph.symbol("y");
    let f = graph.mul(x, y);
    let mut b = Counting { graph, diffs: 0 };

    let err = ForwardJacobian::new()
        .compute(&mut b, &[f], &[x, y, x])
        .unwrap_err();
    assert_eq!(err, JacobianError::DuplicateVariable { index: 2, first: 0 });
    assert_eq!(b.diffs, 0);
}

// ── 2. non_symbol_variable ─────────────────────────────────────────

#[test]
fn non_symbol_variable() {
    let mut graph = ExprGraph::new();
    let x = graph.symbol("x");
    let y = graph.symbol("y");
    let xy = graph.mul(x, y);
    let mut b = Counting { graph, diffs: 0 };

    let err = ForwardJacobian::new()
        .compute(&mut b, &[xy], &[x, xy])
        .unwrap_err();
    assert_eq!(err, JacobianError::NonSymbolVariable { index: 1 });
    assert_eq!(b.diffs, 0);

    let mut g = ExprGraph::new();
    let two = g.int(2);
    assert_eq!(
        naive_jacobian(&mut g, &[two], &[two]),
        Err(JacobianError::NonSymbolVariable { index: 0 })
    );
}

// ── 3. failure_in_definition ───────────────────────────────────────

#[test]
fn failure_in_definition() {
    // sign(x*y) is shared, so it becomes definition 0
    let mut g = ExprGraph::new();
    let x = g.symbol("x");
    let y = g.symbol("y");
    let xy = g.mul(x, y);
    let sg = g.sign(xy);
    let two = g.int(2);
    let e0 = g.mul(sg, two);
    let e1 = g.add(sg, ExprId::ONE);

    let err = jacobian(&mut g, &[e0, e1], &[x, y]).unwrap_err();
    assert_eq!(
        err,
        JacobianError::Differentiation {
            site: DiffSite::Definition(0),
            source: DiffError::NotDifferentiable { op: "sign" },
        }
    );
    assert_eq!(
        err.to_string(),
        "differentiation failed in subexpression definition 0"
    );
    assert!(std::error::Error::source(&err).is_some());
}

// ── 4. failure_in_reduced_row ──────────────────────────────────────

#[test]
fn failure_in_reduced_row() {
    // x*y is shared; sign(x) appears once and stays in reduced row 0
    let mut g = ExprGraph::new();
    let x = g.symbol("x");
    let y = g.symbol("y");
    let xy = g.mul(x, y);
    let sg = g.sign(x);
    let sn = g.sin(xy);
    let e0 = g.add(sg, sn);
    let e1 = g.cos(xy);

    let err = jacobian(&mut g, &[e0, e1], &[x, y]).unwrap_err();
    assert_eq!(
        err,
        JacobianError::Differentiation {
            site: DiffSite::ReducedRow(0),
            source: DiffError::NotDifferentiable { op: "sign" },
        }
    );
}

// ── 5. failure_on_direct_path ──────────────────────────────────────

#[test]
fn failure_on_direct_path() {
    let mut g = ExprGraph::new();
    let x = g.symbol("x");
    let sg = g.sign(x);
    let err = naive_jacobian(&mut g, &[x, sg], &[x]).unwrap_err();
    assert!(matches!(
        err,
        JacobianError::Differentiation {
            site: DiffSite::Row(1),
            ..
        }
    ));
}

// ── 6. extractor_contract_violations ───────────────────────────────

/// Emits a definition that references its own or a later symbol.
struct Broken {
    self_reference: bool,
}

impl CseExtractor for Broken {
    fn extract<B: ExprBackend>(&mut self, backend: &mut B, exprs: &[ExprId]) -> CseOutput {
        let t0 = backend.fresh_symbol("t0");
        let t1 = backend.fresh_symbol("t1");
        let e0 = backend.symbol_expr(t0);
        let e1 = backend.symbol_expr(t1);
        let (d0, d1) = if self.self_reference {
            let d1 = backend.add(e1, e0);
            (exprs[0], d1)
        } else {
            (e1, exprs[0])
        };
        CseOutput {
            definitions: vec![(t0, d0), (t1, d1)],
            reduced: vec![e1; exprs.len()],
        }
    }
}

#[test]
fn extractor_contract_violations() {
    let mut g = ExprGraph::new();
    let x = g.symbol("x");
    let y = g.symbol("y");
    let f = g.add(x, y);

    let err = ForwardJacobian::with_extractor(Broken {
        self_reference: false,
    })
    .compute(&mut g, &[f], &[x, y])
    .unwrap_err();
    assert_eq!(
        err,
        JacobianError::ExtractorContract {
            definition: 0,
            symbol_index: 1
        }
    );

    let err = ForwardJacobian::with_extractor(Broken {
        self_reference: true,
    })
    .compute(&mut g, &[f], &[x, y])
    .unwrap_err();
    assert_eq!(
        err,
        JacobianError::ExtractorContract {
            definition: 1,
            symbol_index: 1
        }
    );
}

// ── 7. reduced_length_mismatch ─────────────────────────────────────

struct DropsRows;

impl CseExtractor for DropsRows {
    fn extract<B: ExprBackend>(&mut self, _backend: &mut B, exprs: &[ExprId]) -> CseOutput {
        CseOutput {
            definitions: Vec::new(),
            reduced: exprs[1..].to_vec(),
        }
    }
}

#[test]
fn reduced_length_mismatch() {
    let mut g = ExprGraph::new();
    let x = g.symbol("x");
    let y = g.symbol("y");
    let err = ForwardJacobian::with_extractor(DropsRows)
        .compute(&mut g, &[x, y], &[x, y])
        .unwrap_err();
    assert_eq!(
        err,
        JacobianError::ReducedLength {
            expected: 2,
            found: 1
        }
    );
}
