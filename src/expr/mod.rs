//! Hash-consed expression DAG.
//!
//! Every node is interned: structurally identical nodes share one [`ExprId`],
//! so shared subtrees are stored once and identity comparison is structural
//! comparison. Constructors canonicalise sums and products (flattening,
//! constant folding, collection of like terms and like bases, operand
//! sorting), so equal canonical forms get equal ids.
//!
//! Each node records, at interning time, its sorted free-symbol set and
//! whether an unevaluated [`Node::Derivative`] occurs beneath it.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rustc_hash::{FxHashMap, FxHashSet};

// Each submodule adds impl blocks to ExprGraph.
mod diff;
mod display;
mod eval;
mod subs;

#[cfg(feature = "serde")]
mod serde_support;

pub use self::display::ExprDisplay;
pub use self::eval::Env;
pub use self::subs::Substitution;

/// Largest integer exponent folded into a constant or distributed over a product.
const MAX_FOLDED_EXPONENT: u32 = 1024;

/// Identity of an interned node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExprId(pub(crate) u32);

impl ExprId {
    /// The constant `0`.
    pub const ZERO: ExprId = ExprId(0);
    /// The constant `1`.
    pub const ONE: ExprId = ExprId(1);
    /// The constant `-1`.
    pub const NEG_ONE: ExprId = ExprId(2);

    /// Position of the node in its graph.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a symbol (variable leaf).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Position of the symbol in its graph's symbol table.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of an undefined function name (`f` in `f(x, y)`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionId(pub(crate) u32);

/// Where a symbol came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolKind {
    /// Created by name through [`ExprGraph::symbol`].
    User,
    /// Created fresh by a subexpression extractor.
    Cse,
}

/// Elementary functions with known derivatives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Abs,
    /// Piecewise constant; has no symbolic derivative.
    Sign,
}

impl Func {
    /// Printable name.
    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Abs => "abs",
            Func::Sign => "sign",
        }
    }
}

/// A node of the expression DAG.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    /// Variable leaf.
    Symbol(SymbolId),
    /// Exact rational constant.
    Const(BigRational),
    /// Sum. Canonical: flat, at most one constant (first), other terms sorted.
    Add(Box<[ExprId]>),
    /// Product. Canonical: flat, at most one coefficient (first), distinct
    /// bases sorted.
    Mul(Box<[ExprId]>),
    /// `[base, exponent]`.
    Pow([ExprId; 2]),
    /// Elementary function application.
    Call(Func, ExprId),
    /// Undefined function `f(args)`, or its partial derivative with respect to
    /// the argument positions in `partials` (sorted, with repetition).
    Apply {
        func: FunctionId,
        partials: Box<[u32]>,
        args: Box<[ExprId]>,
    },
    /// Unevaluated derivative of the operand with respect to the listed
    /// symbols (sorted, with repetition).
    Derivative(ExprId, Box<[SymbolId]>),
}

impl Node {
    /// Child nodes in operand order.
    pub fn children(&self) -> &[ExprId] {
        match self {
            Node::Symbol(_) | Node::Const(_) => &[],
            Node::Add(terms) => terms,
            Node::Mul(factors) => factors,
            Node::Pow(pair) => pair,
            Node::Call(_, arg) => std::slice::from_ref(arg),
            Node::Apply { args, .. } => args,
            Node::Derivative(operand, _) => std::slice::from_ref(operand),
        }
    }

    /// True for symbols and constants.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Symbol(_) | Node::Const(_))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct NodeMeta {
    pub(crate) free: Box<[SymbolId]>,
    pub(crate) has_derivative: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct SymbolInfo {
    pub(crate) name: String,
    pub(crate) kind: SymbolKind,
    pub(crate) expr: ExprId,
}

/// Arena of interned expression nodes.
#[derive(Clone, Debug)]
pub struct ExprGraph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) meta: Vec<NodeMeta>,
    pub(crate) interned: FxHashMap<Node, ExprId>,
    pub(crate) symbols: Vec<SymbolInfo>,
    pub(crate) symbol_names: FxHashMap<String, SymbolId>,
    pub(crate) functions: Vec<String>,
    pub(crate) function_names: FxHashMap<String, FunctionId>,
}

impl Default for ExprGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprGraph {
    /// Create a graph holding only the constants `0`, `1` and `-1`.
    pub fn new() -> Self {
        let mut graph = ExprGraph {
            nodes: Vec::new(),
            meta: Vec::new(),
            interned: FxHashMap::default(),
            symbols: Vec::new(),
            symbol_names: FxHashMap::default(),
            functions: Vec::new(),
            function_names: FxHashMap::default(),
        };
        graph.seed_constants();
        graph
    }

    pub(crate) fn seed_constants(&mut self) {
        let zero = self.intern(Node::Const(BigRational::zero()));
        let one = self.intern(Node::Const(BigRational::one()));
        let neg_one = self.intern(Node::Const(-BigRational::one()));
        debug_assert_eq!(zero, ExprId::ZERO);
        debug_assert_eq!(one, ExprId::ONE);
        debug_assert_eq!(neg_one, ExprId::NEG_ONE);
    }

    /// Number of interned nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node behind `expr`.
    #[inline]
    pub fn node(&self, expr: ExprId) -> &Node {
        &self.nodes[expr.index()]
    }

    /// Sorted free symbols of `expr`. For a [`Node::Derivative`] this includes
    /// the differentiation variables.
    #[inline]
    pub fn free_symbols(&self, expr: ExprId) -> &[SymbolId] {
        &self.meta[expr.index()].free
    }

    /// Whether `symbol` occurs free in `expr`.
    #[inline]
    pub fn depends_on(&self, expr: ExprId, symbol: SymbolId) -> bool {
        self.free_symbols(expr).binary_search(&symbol).is_ok()
    }

    /// Whether an unevaluated derivative occurs in `expr`.
    #[inline]
    pub fn contains_derivative(&self, expr: ExprId) -> bool {
        self.meta[expr.index()].has_derivative
    }

    /// Exact zero test. Zero is interned once, so this is an id comparison.
    #[inline]
    pub fn is_zero(&self, expr: ExprId) -> bool {
        expr == ExprId::ZERO
    }

    pub fn as_const(&self, expr: ExprId) -> Option<&BigRational> {
        match self.node(expr) {
            Node::Const(c) => Some(c),
            _ => None,
        }
    }

    /// The symbol behind `expr`, if `expr` is a symbol leaf.
    pub fn symbol_of(&self, expr: ExprId) -> Option<SymbolId> {
        match self.node(expr) {
            Node::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    // ── Symbols and functions ──

    /// Intern a user symbol by name.
    pub fn symbol(&mut self, name: &str) -> ExprId {
        if let Some(&s) = self.symbol_names.get(name) {
            return self.symbols[s.index()].expr;
        }
        let s = self.push_symbol(name.to_string(), SymbolKind::User);
        self.symbol_names.insert(name.to_string(), s);
        self.symbols[s.index()].expr
    }

    /// Create a new symbol that is distinct from every existing one, whatever
    /// its name.
    pub fn fresh_symbol(&mut self, name: &str) -> SymbolId {
        self.push_symbol(name.to_string(), SymbolKind::Cse)
    }

    fn push_symbol(&mut self, name: String, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        let expr = self.intern(Node::Symbol(id));
        self.symbols.push(SymbolInfo { name, kind, expr });
        id
    }

    /// Look up a user symbol by name.
    pub fn lookup_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbol_names.get(name).copied()
    }

    /// The leaf node of `symbol`.
    #[inline]
    pub fn symbol_expr(&self, symbol: SymbolId) -> ExprId {
        self.symbols[symbol.index()].expr
    }

    pub fn symbol_name(&self, symbol: SymbolId) -> &str {
        &self.symbols[symbol.index()].name
    }

    pub fn symbol_kind(&self, symbol: SymbolId) -> SymbolKind {
        self.symbols[symbol.index()].kind
    }

    /// Intern an undefined function name.
    pub fn function(&mut self, name: &str) -> FunctionId {
        if let Some(&f) = self.function_names.get(name) {
            return f;
        }
        let f = FunctionId(self.functions.len() as u32);
        self.functions.push(name.to_string());
        self.function_names.insert(name.to_string(), f);
        f
    }

    pub fn function_name(&self, func: FunctionId) -> &str {
        &self.functions[func.0 as usize]
    }

    // ── Interning ──

    pub(crate) fn intern(&mut self, node: Node) -> ExprId {
        if let Some(&id) = self.interned.get(&node) {
            return id;
        }
        let meta = self.compute_meta(&node);
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node.clone());
        self.meta.push(meta);
        self.interned.insert(node, id);
        id
    }

    pub(crate) fn compute_meta(&self, node: &Node) -> NodeMeta {
        if let Node::Symbol(s) = node {
            return NodeMeta {
                free: Box::new([*s]),
                has_derivative: false,
            };
        }
        let mut free: Vec<SymbolId> = Vec::new();
        let mut has_derivative = false;
        for child in node.children() {
            let m = &self.meta[child.index()];
            free = union_sorted(&free, &m.free);
            has_derivative |= m.has_derivative;
        }
        if let Node::Derivative(_, vars) = node {
            let mut vars = vars.to_vec();
            vars.dedup();
            free = union_sorted(&free, &vars);
            has_derivative = true;
        }
        NodeMeta {
            free: free.into_boxed_slice(),
            has_derivative,
        }
    }

    // ── Constants ──

    /// Intern an exact rational constant.
    pub fn constant(&mut self, value: BigRational) -> ExprId {
        self.intern(Node::Const(value))
    }

    /// The integer constant `value`.
    pub fn int(&mut self, value: i64) -> ExprId {
        self.constant(BigRational::from_integer(BigInt::from(value)))
    }

    /// The constant `numer / denom`.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    pub fn rational(&mut self, numer: i64, denom: i64) -> ExprId {
        self.constant(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    // ── Sums ──

    /// Canonical `a + b`.
    pub fn add(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.add_many(&[a, b])
    }

    pub fn sub(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let nb = self.neg(b);
        self.add_many(&[a, nb])
    }

    pub fn neg(&mut self, a: ExprId) -> ExprId {
        self.mul_many(&[ExprId::NEG_ONE, a])
    }

    /// Canonical sum of `terms`.
    pub fn add_many(&mut self, terms: &[ExprId]) -> ExprId {
        let mut constant = BigRational::zero();
        let mut order: Vec<ExprId> = Vec::new();
        let mut coeffs: FxHashMap<ExprId, BigRational> = FxHashMap::default();
        let mut stack: Vec<ExprId> = terms.to_vec();

        while let Some(t) = stack.pop() {
            match self.node(t) {
                Node::Const(c) => {
                    constant = &constant + c;
                    continue;
                }
                Node::Add(children) => {
                    stack.extend_from_slice(children);
                    continue;
                }
                _ => {}
            }
            let (c, rest) = self.split_coefficient(t);
            match coeffs.get_mut(&rest) {
                Some(acc) => *acc = &*acc + &c,
                None => {
                    order.push(rest);
                    coeffs.insert(rest, c);
                }
            }
        }

        let mut out: Vec<ExprId> = Vec::with_capacity(order.len() + 1);
        let mut renormalize = false;
        for rest in order {
            let Some(c) = coeffs.remove(&rest) else {
                continue;
            };
            if c.is_zero() {
                continue;
            }
            let term = self.scale(c, rest);
            renormalize |= matches!(self.node(term), Node::Add(_));
            out.push(term);
        }

        // A unit coefficient on a parenthesised sum re-exposes that sum.
        if renormalize {
            let c = self.constant(constant);
            out.push(c);
            return self.add_many(&out);
        }

        out.sort_unstable();
        let has_constant = !constant.is_zero();
        match (out.len(), has_constant) {
            (0, _) => self.constant(constant),
            (1, false) => out[0],
            _ => {
                let mut children = Vec::with_capacity(out.len() + 1);
                if has_constant {
                    children.push(self.constant(constant));
                }
                children.extend(out);
                self.intern(Node::Add(children.into_boxed_slice()))
            }
        }
    }

    /// Split a term into `(coefficient, rest)`.
    fn split_coefficient(&mut self, term: ExprId) -> (BigRational, ExprId) {
        if let Node::Mul(factors) = self.node(term) {
            if let Node::Const(c) = self.node(factors[0]) {
                let c = c.clone();
                let rest = factors[1..].to_vec();
                let rest = if rest.len() == 1 {
                    rest[0]
                } else {
                    self.intern(Node::Mul(rest.into_boxed_slice()))
                };
                return (c, rest);
            }
        }
        (BigRational::one(), term)
    }

    /// `c * rest` where `rest` carries no coefficient.
    fn scale(&mut self, c: BigRational, rest: ExprId) -> ExprId {
        if c.is_one() {
            return rest;
        }
        let coeff = self.constant(c);
        let mut children = vec![coeff];
        match self.node(rest) {
            Node::Mul(factors) => children.extend_from_slice(factors),
            _ => children.push(rest),
        }
        self.intern(Node::Mul(children.into_boxed_slice()))
    }

    // ── Products ──

    pub fn mul(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.mul_many(&[a, b])
    }

    pub fn div(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let inv = self.pow(b, ExprId::NEG_ONE);
        self.mul_many(&[a, inv])
    }

    /// Canonical product of `factors`.
    pub fn mul_many(&mut self, factors: &[ExprId]) -> ExprId {
        let mut coeff = BigRational::one();
        let mut order: Vec<ExprId> = Vec::new();
        let mut exponents: FxHashMap<ExprId, Vec<ExprId>> = FxHashMap::default();
        let mut stack: Vec<ExprId> = factors.to_vec();

        while let Some(f) = stack.pop() {
            let (base, exp) = match self.node(f) {
                Node::Const(c) => {
                    coeff = &coeff * c;
                    continue;
                }
                Node::Mul(children) => {
                    stack.extend_from_slice(children);
                    continue;
                }
                Node::Pow([b, e]) => (*b, *e),
                _ => (f, ExprId::ONE),
            };
            exponents
                .entry(base)
                .or_insert_with(|| {
                    order.push(base);
                    Vec::new()
                })
                .push(exp);
        }

        if coeff.is_zero() {
            return ExprId::ZERO;
        }

        let mut out: Vec<ExprId> = Vec::with_capacity(order.len() + 1);
        let mut renormalize = false;
        for base in order {
            let Some(exps) = exponents.remove(&base) else {
                continue;
            };
            let exp = if exps.len() == 1 {
                exps[0]
            } else {
                self.add_many(&exps)
            };
            let factor = self.pow(base, exp);
            match self.node(factor) {
                Node::Const(c) => coeff = &coeff * c,
                Node::Mul(_) => {
                    renormalize = true;
                    out.push(factor);
                }
                _ => out.push(factor),
            }
        }

        if coeff.is_zero() {
            return ExprId::ZERO;
        }
        // Distributed powers re-expose products.
        if renormalize {
            let c = self.constant(coeff);
            out.push(c);
            return self.mul_many(&out);
        }

        out.sort_unstable();
        let has_coeff = !coeff.is_one();
        match (out.len(), has_coeff) {
            (0, _) => self.constant(coeff),
            (1, false) => out[0],
            _ => {
                let mut children = Vec::with_capacity(out.len() + 1);
                if has_coeff {
                    children.push(self.constant(coeff));
                }
                children.extend(out);
                self.intern(Node::Mul(children.into_boxed_slice()))
            }
        }
    }

    // ── Powers ──

    /// Canonical `base ^ exp`.
    ///
    /// Integer exponents fold constant bases, collapse nested powers and
    /// distribute over products.
    pub fn pow(&mut self, base: ExprId, exp: ExprId) -> ExprId {
        if exp == ExprId::ZERO {
            return ExprId::ONE;
        }
        if exp == ExprId::ONE || base == ExprId::ONE {
            return base;
        }
        let Some(e) = self.as_const(exp).cloned() else {
            return self.intern(Node::Pow([base, exp]));
        };
        if base == ExprId::ZERO && e.is_positive() {
            return ExprId::ZERO;
        }
        let folded = if e.is_integer() {
            e.to_integer()
                .to_i32()
                .filter(|n| n.unsigned_abs() <= MAX_FOLDED_EXPONENT)
        } else {
            None
        };
        if let Some(n) = folded {
            if let Some(b) = self.as_const(base) {
                if b.is_zero() && n < 0 {
                    return self.intern(Node::Pow([base, exp]));
                }
                let value = b.pow(n);
                return self.constant(value);
            }
            match self.node(base) {
                Node::Pow([b, inner]) => {
                    let (b, inner) = (*b, *inner);
                    let e2 = self.mul(inner, exp);
                    return self.pow(b, e2);
                }
                Node::Mul(factors) => {
                    let factors = factors.to_vec();
                    let powered: Vec<ExprId> = factors.iter().map(|&f| self.pow(f, exp)).collect();
                    return self.mul_many(&powered);
                }
                _ => {}
            }
        }
        self.intern(Node::Pow([base, exp]))
    }

    pub fn powi(&mut self, base: ExprId, exp: i64) -> ExprId {
        let e = self.int(exp);
        self.pow(base, e)
    }

    pub fn sqrt(&mut self, a: ExprId) -> ExprId {
        let half = self.rational(1, 2);
        self.pow(a, half)
    }

    // ── Functions ──

    /// Apply an elementary function, folding it at the constants where the
    /// result is rational.
    pub fn call(&mut self, func: Func, arg: ExprId) -> ExprId {
        if let Some(c) = self.as_const(arg) {
            let folded = match func {
                Func::Sin | Func::Tan if c.is_zero() => Some(BigRational::zero()),
                Func::Cos | Func::Exp if c.is_zero() => Some(BigRational::one()),
                Func::Ln if c.is_one() => Some(BigRational::zero()),
                Func::Abs => Some(c.abs()),
                Func::Sign => Some(c.signum()),
                _ => None,
            };
            if let Some(value) = folded {
                return self.constant(value);
            }
        }
        self.intern(Node::Call(func, arg))
    }

    pub fn sin(&mut self, a: ExprId) -> ExprId {
        self.call(Func::Sin, a)
    }

    pub fn cos(&mut self, a: ExprId) -> ExprId {
        self.call(Func::Cos, a)
    }

    pub fn tan(&mut self, a: ExprId) -> ExprId {
        self.call(Func::Tan, a)
    }

    pub fn exp(&mut self, a: ExprId) -> ExprId {
        self.call(Func::Exp, a)
    }

    pub fn ln(&mut self, a: ExprId) -> ExprId {
        self.call(Func::Ln, a)
    }

    pub fn abs(&mut self, a: ExprId) -> ExprId {
        self.call(Func::Abs, a)
    }

    pub fn sign(&mut self, a: ExprId) -> ExprId {
        self.call(Func::Sign, a)
    }

    /// Undefined function `name(args)`.
    pub fn apply(&mut self, name: &str, args: &[ExprId]) -> ExprId {
        let func = self.function(name);
        self.intern(Node::Apply {
            func,
            partials: Box::new([]),
            args: args.into(),
        })
    }

    /// Unevaluated derivative of `expr` with respect to `vars`.
    ///
    /// Never evaluated on construction. Nested derivative operators merge
    /// into one node with the combined (sorted) variable list.
    pub fn derivative(&mut self, expr: ExprId, vars: &[SymbolId]) -> ExprId {
        if vars.is_empty() {
            return expr;
        }
        let (operand, mut all) = match self.node(expr) {
            Node::Derivative(op, vs) => (*op, vs.to_vec()),
            _ => (expr, Vec::new()),
        };
        all.extend_from_slice(vars);
        all.sort_unstable();
        self.intern(Node::Derivative(operand, all.into_boxed_slice()))
    }

    /// Reconstruct the operator of `expr` over new children, canonicalising
    /// the result.
    pub fn rebuild(&mut self, expr: ExprId, children: &[ExprId]) -> ExprId {
        if children == self.node(expr).children() {
            return expr;
        }
        match self.node(expr).clone() {
            Node::Symbol(_) | Node::Const(_) => expr,
            Node::Add(_) => self.add_many(children),
            Node::Mul(_) => self.mul_many(children),
            Node::Pow(_) => self.pow(children[0], children[1]),
            Node::Call(func, _) => self.call(func, children[0]),
            Node::Apply { func, partials, .. } => self.intern(Node::Apply {
                func,
                partials,
                args: children.into(),
            }),
            Node::Derivative(_, vars) => self.derivative(children[0], &vars),
        }
    }
}

/// How [`ExprGraph::topo_order`] treats a node it reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Walk {
    /// Leave the node out and do not look below it.
    Skip,
    /// Include the node but not its children.
    Stop,
    /// Include the node and continue into its children.
    Enter,
}

impl ExprGraph {
    /// Nodes reachable from `roots`, children before parents.
    ///
    /// A node is always interned after its children, so ascending id order is
    /// a topological order. The walk uses an explicit stack, so depth is
    /// bounded only by memory.
    pub(crate) fn topo_order<F>(&self, roots: &[ExprId], mut classify: F) -> Vec<ExprId>
    where
        F: FnMut(ExprId, &Node) -> Walk,
    {
        let mut seen: FxHashSet<ExprId> = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack: Vec<ExprId> = roots.to_vec();
        while let Some(e) = stack.pop() {
            if !seen.insert(e) {
                continue;
            }
            let node = self.node(e);
            match classify(e, node) {
                Walk::Skip => {}
                Walk::Stop => order.push(e),
                Walk::Enter => {
                    order.push(e);
                    stack.extend(node.children().iter().filter(|c| !seen.contains(*c)));
                }
            }
        }
        order.sort_unstable();
        order
    }
}

/// Merge two sorted, duplicate-free symbol lists.
fn union_sorted(a: &[SymbolId], b: &[SymbolId]) -> Vec<SymbolId> {
    use std::cmp::Ordering;

    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
