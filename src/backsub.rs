//! Back-substitution of definition symbols into Jacobian entries.

use log::debug;

use crate::backend::ExprBackend;
use crate::expr::{ExprId, Substitution, SymbolId};
use crate::sparse::SparseRow;

/// Map every definition symbol to its definition expressed over the original
/// symbols only.
///
/// Definitions are resolved in order. Definition `i` only has its own
/// `locals[i]` replaced, each by an already resolved earlier definition, so
/// every definition is substituted into exactly once.
pub fn back_substitution_map<B: ExprBackend>(
    backend: &mut B,
    definitions: &[(SymbolId, ExprId)],
    locals: &[Vec<usize>],
) -> Substitution {
    let mut resolved: Vec<ExprId> = Vec::with_capacity(definitions.len());
    let mut map = Substitution::default();
    for (i, &(sym, def)) in definitions.iter().enumerate() {
        let local_map: Substitution = locals[i]
            .iter()
            .map(|&k| (backend.symbol_expr(definitions[k].0), resolved[k]))
            .collect();
        let full = backend.substitute(def, &local_map);
        resolved.push(full);
        map.insert(backend.symbol_expr(sym), full);
    }
    map
}

/// Apply `map` once to every entry of `rows`, dropping entries that become zero.
pub fn back_substitute<B: ExprBackend>(backend: &mut B, rows: &mut [SparseRow], map: &Substitution) {
    if map.is_empty() {
        return;
    }
    let entries: Vec<ExprId> = rows.iter().flat_map(|r| r.values().copied()).collect();
    let replaced = backend.substitute_all(&entries, map);
    let mut next = replaced.into_iter();
    let mut dropped = 0usize;
    for row in rows.iter_mut() {
        row.retain(|_, entry| {
            // values() and retain() both visit in column order
            if let Some(e) = next.next() {
                *entry = e;
            }
            if backend.is_zero(*entry) {
                dropped += 1;
                false
            } else {
                true
            }
        });
    }
    debug!(
        "back-substitution: {} entries rewritten, {} cancelled",
        entries.len(),
        dropped
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulate::symbol_indices;
    use crate::cse::{CseExtractor, StructuralCse};
    use crate::expr::ExprGraph;

    fn locals_of(g: &ExprGraph, definitions: &[(SymbolId, ExprId)]) -> Vec<Vec<usize>> {
        definitions
            .iter()
            .map(|&(_, def)| {
                let mut ks: Vec<usize> = g
                    .free_symbols(def)
                    .iter()
                    .filter_map(|s| definitions.iter().position(|&(d, _)| d == *s))
                    .collect();
                ks.sort_unstable();
                ks
            })
            .collect()
    }

    #[test]
    fn map_is_fully_resolved_and_idempotent() {
        let mut g = ExprGraph::new();
        let x = g.symbol("x");
        let y = g.symbol("y");
        let z = g.symbol("z");
        let s = g.add(x, y);
        let sn = g.sin(s);
        let a = g.mul(sn, s);
        let b = g.add(sn, z);
        let c = g.cos(sn);
        let cse = StructuralCse::new().extract(&mut g, &[a, b, c]);
        symbol_indices(&g, &cse).unwrap();

        let locals = locals_of(&g, &cse.definitions);
        let map = back_substitution_map(&mut g, &cse.definitions, &locals);

        for &(sym, _) in &cse.definitions {
            let full = map[&g.symbol_expr(sym)];
            for s in g.free_symbols(full) {
                assert!(cse.definitions.iter().all(|&(d, _)| d != *s));
            }
            assert_eq!(g.substitute(full, &map), full);
        }

        let once = g.substitute_all(&cse.reduced, &map);
        assert_eq!(once, vec![a, b, c]);
        let twice = g.substitute_all(&once, &map);
        assert_eq!(once, twice);
    }

    #[test]
    fn cancelled_entries_are_dropped() {
        let mut g = ExprGraph::new();
        let x = g.symbol("x");
        let t = g.fresh_symbol("t0");
        let te = g.symbol_expr(t);
        let entry = g.sub(te, x);
        let mut rows = vec![SparseRow::from([(0, entry), (1, te)])];
        let map: Substitution = [(te, x)].into_iter().collect();
        back_substitute(&mut g, &mut rows, &map);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0].get(&1), Some(&x));
    }
}
