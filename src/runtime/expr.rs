//! Deferred operands.

use std::{fmt, sync::Arc};

use crate::diagnostics::DslError;
use crate::engine::Program;
use crate::runtime::{eval, Environment, EvalCtx, ScopeId, Value};
use crate::syntax::{NodeId, Rule, Span};

/// The syntactic shape of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Literal,
    Identifier,
    Expression,
}

/// An unevaluated operand bound to the scope it appeared in.
///
/// An `Expr` may be evaluated any number of times; each evaluation walks the subtree
/// again. It must only be evaluated with the [`EvalCtx`] it was created under.
#[derive(Clone)]
pub struct Expr {
    program: Arc<Program>,
    node: NodeId,
    scope: ScopeId,
    ctx_id: u64,
    /// Keeps the defining scope from being released while this handle lives.
    _pin: Arc<()>,
}

impl Expr {
    /// An operand defined in the active scope of `ctx`.
    pub(crate) fn new(program: Arc<Program>, node: NodeId, ctx: &EvalCtx) -> Self {
        let scope = ctx.current_scope();
        Self {
            program,
            node,
            scope,
            ctx_id: ctx.id(),
            _pin: ctx.pin(scope),
        }
    }

    /// Evaluates the operand in its defining scope.
    pub fn eval(&self, ctx: &mut EvalCtx) -> Result<Value, DslError> {
        self.eval_in(ctx, self.scope)
    }

    /// Evaluates the operand with `env` layered over its defining scope: identifiers are
    /// looked up in `env` first, then through the defining scope chain. The layered scope
    /// is discarded once the evaluation returns.
    pub fn eval_with_env(&self, ctx: &mut EvalCtx, env: Environment) -> Result<Value, DslError> {
        self.check_owner(ctx);
        ctx.with_child_of(self.scope, env, |ctx, scope| self.eval_in(ctx, scope))
    }

    /// Evaluates the operand with `scope` active, e.g. one made by [`EvalCtx::derive`].
    pub fn eval_in(&self, ctx: &mut EvalCtx, scope: ScopeId) -> Result<Value, DslError> {
        self.check_owner(ctx);
        let previous = ctx.switch_to(scope);
        let result = eval::eval_node(&self.program, ctx, self.node);
        ctx.switch_to(previous);
        result
    }

    pub fn kind(&self) -> ExprKind {
        match self.program.tree.rule(self.node) {
            Rule::Expression => ExprKind::Expression,
            Rule::Identifier | Rule::IdentifierAttr => ExprKind::Identifier,
            _ => ExprKind::Literal,
        }
    }

    /// Source text of the operand without surrounding blanks.
    pub fn text(&self) -> &str {
        let span = self.span();
        &self.program.text()[span.start..span.end]
    }

    pub fn span(&self) -> Span {
        self.program.trimmed_span(self.node)
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    fn check_owner(&self, ctx: &EvalCtx) {
        assert_eq!(
            self.ctx_id,
            ctx.id(),
            "expr `{}` evaluated with a context it was not created under",
            self.text()
        );
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expr")
            .field("kind", &self.kind())
            .field("text", &self.text())
            .field("scope", &self.scope)
            .finish()
    }
}
