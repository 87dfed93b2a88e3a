//! Runtime for gendsl scripts
//!
//! Values, environments and the per-evaluation context, plus the procedure contract and
//! the tree-walking evaluator that ties them together. Operands are never evaluated
//! before a procedure runs; the procedure receives them as [`Expr`] handles.

pub mod context;
pub mod env;
pub(crate) mod eval;
pub mod expr;
pub mod procedure;
pub mod value;

pub use context::{EvalCtx, ScopeId, DEFAULT_MAX_DEPTH, MAX_DEPTH_CEILING};
pub use env::Environment;
pub use expr::{Expr, ExprKind};
pub use procedure::{check_nargs, Arity, Options, Procedure, ProcedureFn};
pub use value::{SelectError, Selector, UserData, Value, ValueType};
