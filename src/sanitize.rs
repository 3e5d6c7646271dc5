//! Restoring derivative operands after subexpression extraction.
//!
//! An unevaluated derivative `Derivative(f(x0), x)` is meaningless once `x0`
//! hides `x + y`: differentiating it again would treat `x0` as independent of
//! `x`. This pass rewrites every derivative operand back to its pre-extraction
//! form, leaving all other structure (and sharing) untouched.

use log::debug;
use rustc_hash::FxHashMap;

use crate::backend::ExprBackend;
use crate::cse::CseOutput;
use crate::expr::{ExprId, Node, Substitution, SymbolId};

/// Rewrite `cse` so no derivative operand has a definition symbol free in it.
///
/// `symbol_index` maps each definition symbol to its position; definitions are
/// processed in that order so every replacement uses an already sanitized
/// definition. Nodes without a derivative beneath them are returned as is.
pub fn sanitize_derivatives<B: ExprBackend>(
    backend: &mut B,
    cse: &CseOutput,
    symbol_index: &FxHashMap<SymbolId, usize>,
) -> CseOutput {
    let mut pass = Sanitizer {
        symbol_index,
        definitions: Vec::with_capacity(cse.definitions.len()),
        memo: FxHashMap::default(),
        restored: 0,
    };

    let mut definitions = Vec::with_capacity(cse.definitions.len());
    for &(sym, def) in &cse.definitions {
        let clean = pass.visit(backend, def);
        pass.definitions.push(clean);
        definitions.push((sym, clean));
    }
    let reduced = cse
        .reduced
        .iter()
        .map(|&e| pass.visit(backend, e))
        .collect();

    if pass.restored > 0 {
        debug!("sanitize: restored {} derivative operands", pass.restored);
    }
    CseOutput {
        definitions,
        reduced,
    }
}

struct Sanitizer<'a> {
    symbol_index: &'a FxHashMap<SymbolId, usize>,
    /// Sanitized definitions, filled in order.
    definitions: Vec<ExprId>,
    memo: FxHashMap<ExprId, ExprId>,
    restored: usize,
}

impl Sanitizer<'_> {
    fn visit<B: ExprBackend>(&mut self, backend: &mut B, root: ExprId) -> ExprId {
        // Iterative post-order: (node, children already scheduled)
        let mut stack: Vec<(ExprId, bool)> = vec![(root, false)];
        while let Some((e, expanded)) = stack.pop() {
            if self.memo.contains_key(&e) || !backend.contains_derivative(e) {
                continue;
            }
            let node = backend.node(e);
            let result = if let Node::Derivative(operand, _) = node {
                let operand = *operand;
                let restored = self.restore(backend, operand);
                if restored != operand {
                    self.restored += 1;
                }
                backend.rebuild(e, &[restored])
            } else if !expanded {
                stack.push((e, true));
                for &c in node.children().iter().rev() {
                    if !self.memo.contains_key(&c) && backend.contains_derivative(c) {
                        stack.push((c, false));
                    }
                }
                continue;
            } else {
                let clean: Vec<ExprId> = node
                    .children()
                    .iter()
                    .map(|c| self.memo.get(c).copied().unwrap_or(*c))
                    .collect();
                backend.rebuild(e, &clean)
            };
            self.memo.insert(e, result);
        }
        self.memo.get(&root).copied().unwrap_or(root)
    }

    /// Substitute definition symbols into `operand` until none remain free.
    ///
    /// Each round replaces symbol `k` by a definition that references only
    /// symbols below `k`, so the largest referenced index strictly decreases.
    fn restore<B: ExprBackend>(&self, backend: &mut B, mut operand: ExprId) -> ExprId {
        loop {
            let map: Substitution = backend
                .free_symbols(operand)
                .iter()
                .filter_map(|s| {
                    let k = *self.symbol_index.get(s)?;
                    let def = *self.definitions.get(k)?;
                    Some((backend.symbol_expr(*s), def))
                })
                .collect();
            if map.is_empty() {
                return operand;
            }
            operand = backend.substitute(operand, &map);
        }
    }
}
