//! Numeric evaluation at a point.

use num_traits::ToPrimitive;
use rustc_hash::FxHashMap;

use super::{ExprGraph, ExprId, Func, Node, SymbolId, Walk};
use crate::error::EvalError;

/// Symbol values for [`ExprGraph::evaluate`].
pub type Env = FxHashMap<SymbolId, f64>;

impl ExprGraph {
    /// Build an [`Env`] from `(symbol expression, value)` pairs. Entries whose
    /// expression is not a symbol leaf are ignored.
    pub fn bind<I>(&self, values: I) -> Env
    where
        I: IntoIterator<Item = (ExprId, f64)>,
    {
        values
            .into_iter()
            .filter_map(|(e, v)| self.symbol_of(e).map(|s| (s, v)))
            .collect()
    }

    /// Evaluate `expr` in `f64` arithmetic.
    ///
    /// Unevaluated derivatives are differentiated first, which may grow the
    /// graph. Undefined functions have no value and are reported as errors.
    pub fn evaluate(&mut self, expr: ExprId, env: &Env) -> Result<f64, EvalError> {
        let mut memo = FxHashMap::default();
        let value = self.eval_memo(expr, env, &mut memo)?;
        if !value.is_finite() {
            return Err(EvalError::NonFinite { value });
        }
        Ok(value)
    }

    /// Evaluate every node below `expr` not yet in `memo`, children first.
    fn eval_memo(
        &mut self,
        expr: ExprId,
        env: &Env,
        memo: &mut FxHashMap<ExprId, f64>,
    ) -> Result<f64, EvalError> {
        let order = self.topo_order(&[expr], |e, node| {
            if memo.contains_key(&e) {
                Walk::Skip
            } else if matches!(node, Node::Apply { .. } | Node::Derivative(..)) {
                Walk::Stop
            } else {
                Walk::Enter
            }
        });
        for e in order {
            let value = match self.node(e) {
                Node::Derivative(operand, vars) => {
                    let mut d = *operand;
                    for s in vars.to_vec() {
                        d = self.diff(d, s)?;
                    }
                    self.eval_memo(d, env, memo)?
                }
                _ => self.eval_node(e, env, memo)?,
            };
            memo.insert(e, value);
        }
        Ok(memo.get(&expr).copied().unwrap_or(f64::NAN))
    }

    /// Value of one node from the values of its children.
    fn eval_node(
        &self,
        expr: ExprId,
        env: &Env,
        memo: &FxHashMap<ExprId, f64>,
    ) -> Result<f64, EvalError> {
        let v = |c: &ExprId| memo.get(c).copied().unwrap_or(f64::NAN);

        let value = match self.node(expr) {
            Node::Symbol(s) => match env.get(s) {
                Some(&v) => v,
                None => return Err(EvalError::UnboundSymbol(self.symbol_name(*s).to_string())),
            },
            Node::Const(c) => c.to_f64().unwrap_or(f64::NAN),
            Node::Add(terms) => terms.iter().map(v).sum(),
            Node::Mul(factors) => factors.iter().map(v).product(),
            Node::Pow([base, exp]) => {
                let b = v(base);
                let small_int = self
                    .as_const(*exp)
                    .filter(|c| c.is_integer())
                    .and_then(|c| c.to_integer().to_i32());
                match small_int {
                    Some(n) => b.powi(n),
                    None => b.powf(v(exp)),
                }
            }
            Node::Call(func, arg) => {
                let a = v(arg);
                match func {
                    Func::Sin => a.sin(),
                    Func::Cos => a.cos(),
                    Func::Tan => a.tan(),
                    Func::Exp => a.exp(),
                    Func::Ln => a.ln(),
                    Func::Abs => a.abs(),
                    Func::Sign => {
                        if a > 0.0 {
                            1.0
                        } else if a < 0.0 {
                            -1.0
                        } else {
                            0.0
                        }
                    }
                }
            }
            Node::Apply { func, .. } => {
                return Err(EvalError::UndefinedFunction(
                    self.function_name(*func).to_string(),
                ));
            }
            // resolved by the caller
            Node::Derivative(..) => f64::NAN,
        };
        Ok(value)
    }
}
