//! Symbolic differentiation.

use rustc_hash::FxHashMap;

use super::{ExprGraph, ExprId, Func, Node, SymbolId, Walk};
use crate::error::DiffError;

impl ExprGraph {
    /// Differentiate `expr` with respect to `var`.
    ///
    /// The result lives in the same graph. Derivatives of shared subexpressions
    /// are computed once per call, and any node whose free-symbol set excludes
    /// `var` differentiates to zero without being visited. Nodes are processed
    /// children first in one sweep, so nesting depth does not consume stack.
    ///
    /// Undefined functions produce partial-derivative applications; unevaluated
    /// derivative operators extend their variable list.
    pub fn diff(&mut self, expr: ExprId, var: SymbolId) -> Result<ExprId, DiffError> {
        let order = self.topo_order(&[expr], |e, node| {
            if !self.depends_on(e, var) {
                Walk::Skip
            } else if matches!(node, Node::Derivative(..)) {
                // the operand is never differentiated here
                Walk::Stop
            } else {
                Walk::Enter
            }
        });

        let mut memo: FxHashMap<ExprId, ExprId> = FxHashMap::default();
        for e in order {
            let d = self.diff_node(e, var, &memo)?;
            memo.insert(e, d);
        }
        Ok(memo.get(&expr).copied().unwrap_or(ExprId::ZERO))
    }

    /// Derivative of one node, given the derivatives of its children in `memo`.
    /// Children absent from `memo` do not depend on `var`.
    fn diff_node(
        &mut self,
        expr: ExprId,
        var: SymbolId,
        memo: &FxHashMap<ExprId, ExprId>,
    ) -> Result<ExprId, DiffError> {
        let d = |c: ExprId| memo.get(&c).copied().unwrap_or(ExprId::ZERO);

        let result = match self.node(expr).clone() {
            // reached only when it is `var` itself
            Node::Symbol(_) => ExprId::ONE,
            Node::Const(_) => ExprId::ZERO,

            Node::Add(terms) => {
                let parts: Vec<ExprId> = terms.iter().map(|&t| d(t)).collect();
                self.add_many(&parts)
            }

            Node::Mul(factors) => {
                // d(a*b*c) = da*b*c + a*db*c + a*b*dc
                let mut parts = Vec::with_capacity(factors.len());
                for (i, &f) in factors.iter().enumerate() {
                    let df = d(f);
                    if df == ExprId::ZERO {
                        continue;
                    }
                    let mut term: Vec<ExprId> = factors
                        .iter()
                        .enumerate()
                        .filter(|&(k, _)| k != i)
                        .map(|(_, &g)| g)
                        .collect();
                    term.push(df);
                    parts.push(self.mul_many(&term));
                }
                self.add_many(&parts)
            }

            Node::Pow([base, exp]) => {
                let dbase = d(base);
                if !self.depends_on(exp, var) {
                    // d(b^e) = e * b^(e-1) * db
                    let e_minus_one = self.add(exp, ExprId::NEG_ONE);
                    let lowered = self.pow(base, e_minus_one);
                    self.mul_many(&[exp, lowered, dbase])
                } else {
                    // d(b^e) = b^e * (de * ln b + e * db / b)
                    let ln_b = self.ln(base);
                    let from_exp = self.mul(d(exp), ln_b);
                    let inv_b = self.pow(base, ExprId::NEG_ONE);
                    let from_base = self.mul_many(&[exp, dbase, inv_b]);
                    let inner = self.add(from_exp, from_base);
                    self.mul(expr, inner)
                }
            }

            Node::Call(func, arg) => {
                let outer = match func {
                    Func::Sin => self.cos(arg),
                    Func::Cos => {
                        let s = self.sin(arg);
                        self.neg(s)
                    }
                    Func::Tan => {
                        let sq = self.powi(expr, 2);
                        self.add(ExprId::ONE, sq)
                    }
                    Func::Exp => expr,
                    Func::Ln => self.pow(arg, ExprId::NEG_ONE),
                    Func::Abs => self.sign(arg),
                    Func::Sign => {
                        return Err(DiffError::NotDifferentiable { op: func.name() });
                    }
                };
                self.mul(outer, d(arg))
            }

            Node::Apply {
                func,
                partials,
                args,
            } => {
                // d f(u1..un) = sum_i f_{,i}(u) * dui
                let mut parts = Vec::with_capacity(args.len());
                for (i, &a) in args.iter().enumerate() {
                    let da = d(a);
                    if da == ExprId::ZERO {
                        continue;
                    }
                    let mut p = partials.to_vec();
                    p.push(i as u32);
                    p.sort_unstable();
                    let partial = self.intern(Node::Apply {
                        func,
                        partials: p.into_boxed_slice(),
                        args: args.clone(),
                    });
                    parts.push(self.mul(partial, da));
                }
                self.add_many(&parts)
            }

            Node::Derivative(operand, _) => {
                if self.depends_on(operand, var) {
                    self.derivative(expr, &[var])
                } else {
                    ExprId::ZERO
                }
            }
        };
        Ok(result)
    }
}
