//! Common-subexpression extraction.
//!
//! An extractor factors an expression vector into an ordered list of named
//! definitions plus a reduced vector referencing them. Downstream stages rely
//! on one contract: definition `i` may reference only original symbols and the
//! symbols of definitions `0..i`.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::backend::ExprBackend;
use crate::expr::{ExprId, SymbolId};

/// Result of subexpression extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CseOutput {
    /// `(symbol, definition)` pairs in topological order.
    pub definitions: Vec<(SymbolId, ExprId)>,
    /// The input vector rewritten over the definition symbols.
    pub reduced: Vec<ExprId>,
}

impl CseOutput {
    /// True when no subexpression was named.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definition symbols in order.
    pub fn symbols(&self) -> Vec<SymbolId> {
        self.definitions.iter().map(|&(s, _)| s).collect()
    }
}

/// Factors repeated subexpressions out of an expression vector.
pub trait CseExtractor {
    /// Extract shared subexpressions from `exprs`, creating fresh symbols in
    /// `backend` for each definition.
    fn extract<B: ExprBackend>(&mut self, backend: &mut B, exprs: &[ExprId]) -> CseOutput;
}

/// Extractor naming every non-leaf node reachable along more than one path.
///
/// Fresh symbols are named `{prefix}{n}` with `n` counting from zero per call.
/// Names are cosmetic; each call creates new symbol identities.
#[derive(Clone, Debug)]
pub struct StructuralCse {
    /// Name stem for extracted symbols; definition `k` is named `{prefix}{k}`.
    pub prefix: String,
}

impl Default for StructuralCse {
    fn default() -> Self {
        StructuralCse {
            prefix: "x".to_string(),
        }
    }
}

impl StructuralCse {
    /// Extractor naming its symbols `x0`, `x1`, ...
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor naming its symbols `{prefix}0`, `{prefix}1`, ...
    ///
    /// Names need not be unique; extracted symbols are always fresh.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        StructuralCse {
            prefix: prefix.into(),
        }
    }
}

impl CseExtractor for StructuralCse {
    fn extract<B: ExprBackend>(&mut self, backend: &mut B, exprs: &[ExprId]) -> CseOutput {
        let repeated = find_repeated(backend, exprs);
        if repeated.is_empty() {
            return CseOutput {
                definitions: Vec::new(),
                reduced: exprs.to_vec(),
            };
        }

        let mut memo: FxHashMap<ExprId, ExprId> = FxHashMap::default();
        let mut definitions: Vec<(SymbolId, ExprId)> = Vec::new();
        let mut reduced = Vec::with_capacity(exprs.len());

        for &root in exprs {
            // Iterative post-order: (node, children already scheduled)
            let mut stack: Vec<(ExprId, bool)> = vec![(root, false)];
            while let Some((e, expanded)) = stack.pop() {
                if memo.contains_key(&e) {
                    continue;
                }
                let node = backend.node(e);
                if node.is_leaf() {
                    memo.insert(e, e);
                    continue;
                }
                if !expanded {
                    stack.push((e, true));
                    for &c in node.children().iter().rev() {
                        if !memo.contains_key(&c) {
                            stack.push((c, false));
                        }
                    }
                    continue;
                }
                let children: Vec<ExprId> = node.children().iter().map(|c| memo[c]).collect();
                let rebuilt = backend.rebuild(e, &children);
                let out = if repeated.contains(&e) && !backend.node(rebuilt).is_leaf() {
                    let name = format!("{}{}", self.prefix, definitions.len());
                    let sym = backend.fresh_symbol(&name);
                    definitions.push((sym, rebuilt));
                    backend.symbol_expr(sym)
                } else {
                    rebuilt
                };
                memo.insert(e, out);
            }
            reduced.push(memo[&root]);
        }

        debug!(
            "cse: {} expressions, {} repeated nodes, {} definitions",
            exprs.len(),
            repeated.len(),
            definitions.len()
        );
        CseOutput {
            definitions,
            reduced,
        }
    }
}

/// Non-leaf nodes reached more than once from `roots`. Subtrees below a node
/// already seen are not walked again.
fn find_repeated<B: ExprBackend>(backend: &B, roots: &[ExprId]) -> FxHashSet<ExprId> {
    let mut seen = FxHashSet::default();
    let mut repeated = FxHashSet::default();
    let mut stack: Vec<ExprId> = roots.to_vec();
    while let Some(e) = stack.pop() {
        let node = backend.node(e);
        if node.is_leaf() {
            continue;
        }
        if !seen.insert(e) {
            repeated.insert(e);
            continue;
        }
        stack.extend_from_slice(node.children());
    }
    repeated
}
