//! gendsl: an engine for small Lisp-style DSLs.
//!
//! A host compiles a script once with [`ParseContext::compile`], binds the procedures and
//! values its language needs in an [`Environment`], and evaluates the script with an
//! [`EvalCtx`]. Procedures receive their operands unevaluated, as [`Expr`] handles, which
//! lets plain host functions implement conditionals, scoped bindings and loops.
//!
//! ```
//! use gendsl::{eval_str, Arity, Environment, Procedure, Value};
//!
//! let env = Environment::new().with_procedure(
//!     "PLUS",
//!     Procedure::with_arity(Arity::OneOrMore, |ctx, args, _| {
//!         let mut sum = 0;
//!         for arg in args {
//!             sum += i64::try_from(arg.eval(ctx)?)?;
//!         }
//!         Ok(Value::Int(sum))
//!     }),
//! );
//! assert_eq!(eval_str("(PLUS 1 2 (PLUS 3 4))", env).unwrap(), Value::Int(10));
//! ```

pub mod cli;
pub mod diagnostics;
pub mod engine;
pub mod runtime;
pub mod syntax;

pub use crate::diagnostics::{ArityMismatch, DslError, ErrorContext, ErrorKind};
pub use crate::engine::{eval_str, eval_str_with_data, ParseContext};
pub use crate::runtime::{
    check_nargs, Arity, Environment, EvalCtx, Expr, ExprKind, Options, Procedure, ScopeId,
    SelectError, Selector, UserData, Value, ValueType,
};
pub use crate::syntax::{LineCol, Location, Rule, Span};
