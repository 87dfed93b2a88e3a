//! Procedures and the arity guard.
//!
//! A procedure is the host side of an operator: it is called with the evaluation
//! context, its operands as unevaluated [`Expr`]s and the eagerly evaluated `#:key value`
//! options. It decides which operands to evaluate, how often and under which environment.

use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use crate::diagnostics::{ArityMismatch, DslError};
use crate::runtime::{EvalCtx, Expr, Value};

/// Named options of one call, keyed by option identifier.
pub type Options = BTreeMap<String, Value>;

/// Signature shared by every procedure body.
pub type ProcedureFn =
    dyn Fn(&mut EvalCtx, &[Expr], &Options) -> Result<Value, DslError> + Send + Sync;

#[derive(Clone)]
pub struct Procedure {
    func: Arc<ProcedureFn>,
}

impl Procedure {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut EvalCtx, &[Expr], &Options) -> Result<Value, DslError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// A procedure whose body only runs when the operand count satisfies `arity`.
    pub fn with_arity<F>(arity: Arity, func: F) -> Self
    where
        F: Fn(&mut EvalCtx, &[Expr], &Options) -> Result<Value, DslError> + Send + Sync + 'static,
    {
        check_nargs(arity, func)
    }

    pub fn call(
        &self,
        ctx: &mut EvalCtx,
        args: &[Expr],
        options: &Options,
    ) -> Result<Value, DslError> {
        (self.func)(ctx, args, options)
    }

    pub fn ptr_eq(&self, other: &Procedure) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Procedure({:p})", Arc::as_ptr(&self.func))
    }
}

/// How many operands a procedure accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Exact(usize),
    OneOrMore,
    ZeroOrOne,
    Any,
}

impl Arity {
    pub fn check(&self, got: usize) -> Result<(), ArityMismatch> {
        match *self {
            Arity::Exact(expected) if got != expected => {
                Err(ArityMismatch::Exact { expected, got })
            }
            Arity::OneOrMore if got < 1 => Err(ArityMismatch::OneOrMore { got }),
            Arity::ZeroOrOne if got > 1 => Err(ArityMismatch::ZeroOrOne { got }),
            _ => Ok(()),
        }
    }
}

/// Parses `"n"`, `"+"`, `"?"`, `"*"` or `""` (surrounding blanks ignored).
impl FromStr for Arity {
    type Err = DslError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        match pattern.trim() {
            "+" => Ok(Arity::OneOrMore),
            "?" => Ok(Arity::ZeroOrOne),
            "*" | "" => Ok(Arity::Any),
            n => n.parse().map(Arity::Exact).map_err(|_| DslError::InvalidArity {
                pattern: pattern.to_string(),
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::OneOrMore => f.write_str("+"),
            Arity::ZeroOrOne => f.write_str("?"),
            Arity::Any => f.write_str("*"),
        }
    }
}

/// Wraps `func` in a guard that rejects operand counts not allowed by `arity`.
pub fn check_nargs<F>(arity: Arity, func: F) -> Procedure
where
    F: Fn(&mut EvalCtx, &[Expr], &Options) -> Result<Value, DslError> + Send + Sync + 'static,
{
    if arity == Arity::Any {
        return Procedure::new(func);
    }
    Procedure::new(move |ctx, args, options| {
        arity.check(args.len())?;
        func(ctx, args, options)
    })
}
