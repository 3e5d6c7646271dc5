pub mod accumulate;
pub mod api;
pub mod assemble;
pub mod backend;
pub mod backsub;
pub mod cse;
pub mod error;
pub mod expr;
pub mod jacobian;
pub mod sanitize;
pub mod sparse;

#[cfg(feature = "parallel")]
pub mod parallel;

pub use api::{jacobian, jacobian_with, naive_jacobian};
pub use backend::ExprBackend;
pub use cse::{CseExtractor, CseOutput, StructuralCse};
pub use error::{DiffError, DiffSite, EvalError, JacobianError};
pub use expr::{Env, ExprGraph, ExprId, Func, FunctionId, Node, Substitution, SymbolId, SymbolKind};
pub use jacobian::{ForwardJacobian, JacobianConfig, JacobianTrace};
pub use sparse::{SparseMatrix, SparseRow, SparseRows};

#[cfg(feature = "parallel")]
pub use parallel::{jacobian_batch_par, JacobianProblem};
