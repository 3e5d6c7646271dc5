//! Infix printing.

use std::fmt;

use num_traits::Signed;

use super::{ExprGraph, ExprId, Node};

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_POW: u8 = 3;

/// Borrowing printer returned by [`ExprGraph::display`].
pub struct ExprDisplay<'a> {
    graph: &'a ExprGraph,
    expr: ExprId,
}

impl ExprGraph {
    /// Printable form of `expr`, e.g. `2*x + sin(x*y)`.
    pub fn display(&self, expr: ExprId) -> ExprDisplay<'_> {
        ExprDisplay { graph: self, expr }
    }
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Expr(self.expr, 0)];
        while let Some(piece) = stack.pop() {
            match piece {
                Piece::Text(text) => f.write_str(text)?,
                Piece::Owned(text) => f.write_str(&text)?,
                Piece::Expr(expr, prec) => {
                    let parts = self.expand(expr, prec);
                    stack.extend(parts.into_iter().rev());
                }
            }
        }
        Ok(())
    }
}

/// Pending output: a subexpression at its context precedence, or text.
enum Piece<'a> {
    Expr(ExprId, u8),
    Text(&'a str),
    Owned(String),
}

impl<'a> ExprDisplay<'a> {
    /// One level of `expr`, in output order.
    fn expand(&self, expr: ExprId, prec: u8) -> Vec<Piece<'a>> {
        let g = self.graph;
        let mut out = Vec::new();
        match g.node(expr) {
            Node::Symbol(s) => out.push(Piece::Text(g.symbol_name(*s))),
            Node::Const(c) => {
                let wrap = prec > PREC_ADD && (c.is_negative() || !c.is_integer());
                out.push(Piece::Owned(if wrap {
                    format!("({})", c)
                } else {
                    c.to_string()
                }));
            }
            Node::Add(terms) => {
                let paren = prec > PREC_ADD;
                open(&mut out, paren);
                for (i, &t) in terms.iter().enumerate() {
                    if i > 0 {
                        out.push(Piece::Text(" + "));
                    }
                    out.push(Piece::Expr(t, PREC_ADD));
                }
                close(&mut out, paren);
            }
            Node::Mul(factors) => {
                let paren = prec > PREC_MUL;
                open(&mut out, paren);
                let mut rest: &[ExprId] = factors;
                if factors.len() > 1 && factors[0] == ExprId::NEG_ONE {
                    out.push(Piece::Text("-"));
                    rest = &factors[1..];
                }
                for (i, &t) in rest.iter().enumerate() {
                    if i > 0 {
                        out.push(Piece::Text("*"));
                    }
                    out.push(Piece::Expr(t, PREC_MUL));
                }
                close(&mut out, paren);
            }
            Node::Pow([base, exp]) => {
                let paren = prec >= PREC_POW;
                open(&mut out, paren);
                out.push(Piece::Expr(*base, PREC_POW));
                out.push(Piece::Text("**"));
                out.push(Piece::Expr(*exp, PREC_POW));
                close(&mut out, paren);
            }
            Node::Call(func, arg) => {
                out.push(Piece::Text(func.name()));
                out.push(Piece::Text("("));
                out.push(Piece::Expr(*arg, 0));
                out.push(Piece::Text(")"));
            }
            Node::Apply {
                func,
                partials,
                args,
            } => {
                if partials.is_empty() {
                    out.push(Piece::Text(g.function_name(*func)));
                } else {
                    let idx: Vec<String> = partials.iter().map(|p| p.to_string()).collect();
                    out.push(Piece::Owned(format!(
                        "D[{}]({})",
                        idx.join(","),
                        g.function_name(*func)
                    )));
                }
                out.push(Piece::Text("("));
                for (i, &a) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(Piece::Text(", "));
                    }
                    out.push(Piece::Expr(a, 0));
                }
                out.push(Piece::Text(")"));
            }
            Node::Derivative(operand, vars) => {
                out.push(Piece::Text("Derivative("));
                out.push(Piece::Expr(*operand, 0));
                for &v in vars.iter() {
                    out.push(Piece::Text(", "));
                    out.push(Piece::Text(g.symbol_name(v)));
                }
                out.push(Piece::Text(")"));
            }
        }
        out
    }
}

fn open(out: &mut Vec<Piece<'_>>, paren: bool) {
    if paren {
        out.push(Piece::Text("("));
    }
}

fn close(out: &mut Vec<Piece<'_>>, paren: bool) {
    if paren {
        out.push(Piece::Text(")"));
    }
}
