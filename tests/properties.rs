use approx::assert_relative_eq;
use proptest::prelude::*;
use symjac::{jacobian, naive_jacobian, ExprGraph, ExprId, JacobianConfig, SymbolKind};

/// Expression shape generated by proptest, built into a graph afterwards.
#[derive(Clone, Debug)]
enum Shape {
    Var(usize),
    Const(i64),
    Add(Box<Shape>, Box<Shape>),
    Mul(Box<Shape>, Box<Shape>),
    Sin(Box<Shape>),
    Cos(Box<Shape>),
    Square(Box<Shape>),
    /// Unevaluated derivative with respect to variable `i`.
    Diff(Box<Shape>, usize),
}

const NVARS: usize = 3;

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (0..NVARS).prop_map(Shape::Var),
        (-1i64..3).prop_map(Shape::Const),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Shape::Add(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Shape::Mul(Box::new(a), Box::new(b))),
            inner.clone().prop_map(|a| Shape::Sin(Box::new(a))),
            inner.clone().prop_map(|a| Shape::Cos(Box::new(a))),
            inner.clone().prop_map(|a| Shape::Square(Box::new(a))),
            (inner, 0..NVARS).prop_map(|(a, i)| Shape::Diff(Box::new(a), i)),
        ]
    })
}

fn build(g: &mut ExprGraph, vars: &[ExprId], s: &Shape) -> ExprId {
    match s {
        Shape::Var(i) => vars[*i],
        Shape::Const(c) => g.int(*c),
        Shape::Add(a, b) => {
            let (a, b) = (build(g, vars, a), build(g, vars, b));
            g.add(a, b)
        }
        Shape::Mul(a, b) => {
            let (a, b) = (build(g, vars, a), build(g, vars, b));
            g.mul(a, b)
        }
        Shape::Sin(a) => {
            let a = build(g, vars, a);
            g.sin(a)
        }
        Shape::Cos(a) => {
            let a = build(g, vars, a);
            g.cos(a)
        }
        Shape::Square(a) => {
            let a = build(g, vars, a);
            g.powi(a, 2)
        }
        Shape::Diff(a, i) => {
            let a = build(g, vars, a);
            let v = g.symbol_of(vars[*i]).unwrap();
            g.derivative(a, &[v])
        }
    }
}

/// Rows that share the generated pieces:
/// [a, b, a*b, sin(a) + b, cos(a*b), Derivative(sin(a*b), v0) + a*b].
fn rows(g: &mut ExprGraph, vars: &[ExprId], a: ExprId, b: ExprId) -> Vec<ExprId> {
    let ab = g.mul(a, b);
    let sa = g.sin(a);
    let sab = g.add(sa, b);
    let cab = g.cos(ab);
    let sinab = g.sin(ab);
    let v0 = g.symbol_of(vars[0]).unwrap();
    let d = g.derivative(sinab, &[v0]);
    let dab = g.add(d, ab);
    vec![a, b, ab, sab, cab, dab]
}

/// No stored zero and no extracted symbol anywhere, derivative operands
/// included.
fn is_clean(g: &ExprGraph, m: &symjac::SparseMatrix) -> bool {
    m.iter().all(|(_, _, e)| {
        e != ExprId::ZERO
            && g
                .free_symbols(e)
                .iter()
                .all(|&s| g.symbol_kind(s) == SymbolKind::User)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn forward_matches_naive(
        sa in shape(),
        sb in shape(),
        values in prop::collection::vec(0.1f64..1.0, NVARS),
    ) {
        let mut g = ExprGraph::new();
        let vars: Vec<ExprId> = (0..NVARS).map(|i| g.symbol(&format!("v{}", i))).collect();
        let a = build(&mut g, &vars, &sa);
        let b = build(&mut g, &vars, &sb);
        let exprs = rows(&mut g, &vars, a, b);

        let j = jacobian(&mut g, &exprs, &vars).unwrap();
        let naive = naive_jacobian(&mut g, &exprs, &vars).unwrap();
        prop_assert_eq!(j.shape(), (exprs.len(), NVARS));

        prop_assert!(is_clean(&g, &j));

        let env = g.bind(vars.iter().copied().zip(values.iter().copied()));
        let dj = j.evaluate(&mut g, &env).unwrap();
        let dn = naive.evaluate(&mut g, &env).unwrap();
        for (rj, rn) in dj.iter().zip(dn.iter()) {
            for (x, y) in rj.iter().zip(rn.iter()) {
                assert_relative_eq!(x, y, epsilon = 1e-8, max_relative = 1e-8);
            }
        }
    }

    #[test]
    fn pruning_is_pure_optimisation(sa in shape(), sb in shape()) {
        let mut g = ExprGraph::new();
        let vars: Vec<ExprId> = (0..NVARS).map(|i| g.symbol(&format!("v{}", i))).collect();
        let a = build(&mut g, &vars, &sa);
        let b = build(&mut g, &vars, &sb);
        let exprs = rows(&mut g, &vars, a, b);

        let pruned = jacobian(&mut g, &exprs, &vars).unwrap();
        let config = JacobianConfig { prune_free_symbols: false, ..JacobianConfig::default() };
        let unpruned = symjac::jacobian_with(&mut g, &exprs, &vars, &config).unwrap();
        prop_assert_eq!(pruned, unpruned);
    }

    #[test]
    fn undefined_function_under_derivative(sa in shape(), sb in shape()) {
        // f(a*b) inside a derivative while a*b is also a row of its own
        let mut g = ExprGraph::new();
        let vars: Vec<ExprId> = (0..NVARS).map(|i| g.symbol(&format!("v{}", i))).collect();
        let a = build(&mut g, &vars, &sa);
        let b = build(&mut g, &vars, &sb);
        let ab = g.mul(a, b);
        let f = g.apply("f", &[ab]);
        let v1 = g.symbol_of(vars[1]).unwrap();
        let d = g.derivative(f, &[v1]);
        let fa = g.apply("f", &[a]);
        let exprs = vec![g.add(d, ab), fa, ab];

        let j = jacobian(&mut g, &exprs, &vars).unwrap();
        prop_assert!(is_clean(&g, &j));

        let config = JacobianConfig { prune_free_symbols: false, ..JacobianConfig::default() };
        let unpruned = symjac::jacobian_with(&mut g, &exprs, &vars, &config).unwrap();
        prop_assert_eq!(j, unpruned);
    }
}
