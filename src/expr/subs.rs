//! Simultaneous substitution.

use rustc_hash::FxHashMap;

use super::{ExprGraph, ExprId, Node, SymbolId, Walk};

/// Node-to-node replacement map.
pub type Substitution = FxHashMap<ExprId, ExprId>;

impl ExprGraph {
    /// Replace every occurrence of a key of `map` in `expr` by its value.
    ///
    /// Replacement is simultaneous and single-pass: values are not themselves
    /// rewritten. Rebuilt nodes are canonicalised.
    ///
    /// The variable list of a derivative operator is renamed where a variable
    /// maps to a symbol. A variable mapped to anything else stays as it is
    /// while its occurrences in the operand are replaced, so the resulting
    /// derivative is taken with respect to a symbol that may no longer occur.
    /// Callers substituting non-symbols for derivative variables must resolve
    /// those derivatives first.
    pub fn substitute(&mut self, expr: ExprId, map: &Substitution) -> ExprId {
        self.substitute_all(&[expr], map)[0]
    }

    /// [`substitute`](Self::substitute) over several roots with one shared memo.
    pub fn substitute_all(&mut self, exprs: &[ExprId], map: &Substitution) -> Vec<ExprId> {
        if map.is_empty() {
            return exprs.to_vec();
        }
        let symbol_keys = self.symbol_keys(map);
        let order = self.topo_order(exprs, |e, _| {
            if map.contains_key(&e) {
                Walk::Stop
            } else if symbol_keys
                .as_deref()
                .map_or(false, |keys| self.untouched(e, keys))
            {
                Walk::Skip
            } else {
                Walk::Enter
            }
        });

        // Nodes missing from the memo are left as they are.
        let mut memo: FxHashMap<ExprId, ExprId> = FxHashMap::default();
        for e in order {
            let out = match map.get(&e) {
                Some(&r) => r,
                None => self.subs_node(e, map, &memo),
            };
            memo.insert(e, out);
        }
        exprs
            .iter()
            .map(|e| memo.get(e).copied().unwrap_or(*e))
            .collect()
    }

    /// Sorted key symbols, when every key is a symbol leaf.
    fn symbol_keys(&self, map: &Substitution) -> Option<Vec<SymbolId>> {
        let mut keys = map
            .keys()
            .map(|&k| self.symbol_of(k))
            .collect::<Option<Vec<_>>>()?;
        keys.sort_unstable();
        Some(keys)
    }

    /// No key symbol is free in `expr`.
    fn untouched(&self, expr: ExprId, keys: &[SymbolId]) -> bool {
        self.free_symbols(expr)
            .iter()
            .all(|s| keys.binary_search(s).is_err())
    }

    fn subs_node(&mut self, expr: ExprId, map: &Substitution, memo: &FxHashMap<ExprId, ExprId>) -> ExprId {
        let node = self.node(expr);
        if node.is_leaf() {
            return expr;
        }
        let replaced: Vec<ExprId> = node
            .children()
            .iter()
            .map(|c| memo.get(c).copied().unwrap_or(*c))
            .collect();

        match node {
            Node::Derivative(_, vars) => {
                let renamed: Vec<SymbolId> = vars
                    .iter()
                    .map(|&v| {
                        map.get(&self.symbol_expr(v))
                            .and_then(|&r| self.symbol_of(r))
                            .unwrap_or(v)
                    })
                    .collect();
                self.derivative(replaced[0], &renamed)
            }
            _ => self.rebuild(expr, &replaced),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simultaneous_not_recursive() {
        // {x -> y, y -> x} swaps rather than collapsing
        let mut g = ExprGraph::new();
        let x = g.symbol("x");
        let y = g.symbol("y");
        let two = g.int(2);
        let two_y = g.mul(two, y);
        let f = g.add(x, two_y);

        let map: Substitution = [(x, y), (y, x)].into_iter().collect();
        let swapped = g.substitute(f, &map);
        let two_x = g.mul(two, x);
        assert_eq!(swapped, g.add(y, two_x));
    }

    #[test]
    fn replacement_canonicalises() {
        let mut g = ExprGraph::new();
        let x = g.symbol("x");
        let y = g.symbol("y");
        let f = g.sub(x, y);
        let map: Substitution = [(y, x)].into_iter().collect();
        assert_eq!(g.substitute(f, &map), ExprId::ZERO);
    }

    #[test]
    fn subexpression_keys() {
        let mut g = ExprGraph::new();
        let x = g.symbol("x");
        let y = g.symbol("y");
        let z = g.symbol("z");
        let s = g.add(x, y);
        let f = g.sin(s);
        let map: Substitution = [(s, z)].into_iter().collect();
        assert_eq!(g.substitute(f, &map), g.sin(z));
    }

    #[test]
    fn derivative_variables_renamed() {
        let mut g = ExprGraph::new();
        let x = g.symbol("x");
        let t = g.symbol("t");
        let xs = g.symbol_of(x).unwrap();
        let ts = g.symbol_of(t).unwrap();
        let f = g.apply("f", &[x]);
        let d = g.derivative(f, &[xs]);

        let map: Substitution = [(x, t)].into_iter().collect();
        let out = g.substitute(d, &map);
        let ft = g.apply("f", &[t]);
        assert_eq!(out, g.derivative(ft, &[ts]));
    }

    #[test]
    fn derivative_variable_mapped_to_expression_is_kept() {
        let mut g = ExprGraph::new();
        let x = g.symbol("x");
        let y = g.symbol("y");
        let xs = g.symbol_of(x).unwrap();
        let f = g.apply("f", &[x]);
        let d = g.derivative(f, &[xs]);

        let two_y = {
            let two = g.int(2);
            g.mul(two, y)
        };
        let map: Substitution = [(x, two_y)].into_iter().collect();
        let out = g.substitute(d, &map);
        let f2y = g.apply("f", &[two_y]);
        assert_eq!(out, g.derivative(f2y, &[xs]));
    }

    #[test]
    fn deep_chain_substitutes_without_recursion() {
        let mut g = ExprGraph::new();
        let x = g.symbol("x");
        let y = g.symbol("y");
        let z = g.symbol("z");
        let mut e = x;
        let mut expected = z;
        for _ in 0..20_000 {
            let s = g.sin(e);
            e = g.add(s, y);
            let sz = g.sin(expected);
            expected = g.add(sz, y);
        }
        let map: Substitution = [(x, z)].into_iter().collect();
        assert_eq!(g.substitute(e, &map), expected);
    }
}
