//! Compilation and evaluation entry points.
//!
//! [`ParseContext::compile`] matches a script and builds its syntax tree once; the result
//! is immutable and can be evaluated any number of times, from any number of threads, as
//! long as every evaluation brings its own [`EvalCtx`].

use std::{any::Any, io, sync::Arc};

use tracing::debug;

use crate::diagnostics::{to_error_source, DslError, SourceArc};
use crate::runtime::{eval, Environment, EvalCtx, Value};
use crate::syntax::{match_script, NodeId, Span, SyntaxTree, TreeDump};

/// A compiled script: its source and syntax tree.
#[derive(Debug)]
pub(crate) struct Program {
    pub(crate) source: SourceArc,
    pub(crate) tree: SyntaxTree,
}

impl Program {
    pub(crate) fn text(&self) -> &str {
        self.source.inner().as_str()
    }

    pub(crate) fn trimmed_span(&self, node: NodeId) -> Span {
        self.tree.significant_span(node).trimmed(self.text())
    }

    pub(crate) fn trimmed_text(&self, node: NodeId) -> &str {
        let span = self.trimmed_span(node);
        &self.text()[span.start..span.end]
    }
}

/// A compiled script, ready to be evaluated.
#[derive(Debug, Clone)]
pub struct ParseContext {
    program: Arc<Program>,
}

impl ParseContext {
    pub fn compile(text: impl Into<String>) -> Result<Self, DslError> {
        Self::compile_named("script", text)
    }

    /// Like [`compile`](Self::compile); `name` labels the source in rendered diagnostics.
    pub fn compile_named(name: &str, text: impl Into<String>) -> Result<Self, DslError> {
        let source = to_error_source(name, text);
        let tokens = match_script(source.inner())
            .map_err(|failure| DslError::syntax(&source, failure.rule, failure.span))?;
        let tree = SyntaxTree::build(&tokens);
        debug!(script = name, bytes = source.inner().len(), nodes = tree.len(), "script compiled");
        Ok(Self {
            program: Arc::new(Program { source, tree }),
        })
    }

    /// Evaluates the script in the active scope of `ctx`.
    pub fn eval(&self, ctx: &mut EvalCtx) -> Result<Value, DslError> {
        let Some(root) = self.program.tree.root() else {
            panic!("compiled script without a root node");
        };
        let result = eval::eval_node(&self.program, ctx, root);
        debug!(ok = result.is_ok(), scopes = ctx.scope_count(), "script evaluated");
        result
    }

    pub fn source(&self) -> &str {
        self.program.text()
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.program.tree
    }

    /// The indented `Rule "text"` listing of the syntax tree.
    pub fn syntax_tree_string(&self) -> String {
        self.program.tree.to_pretty_string(self.source())
    }

    pub fn write_syntax_tree<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.program.tree.write_to(self.source(), out)
    }

    pub fn tree_dump(&self) -> Option<TreeDump> {
        let root = self.program.tree.root()?;
        Some(self.program.tree.dump(root, self.source()))
    }
}

/// Compiles and evaluates `text` once against `env`.
pub fn eval_str(text: &str, env: Environment) -> Result<Value, DslError> {
    ParseContext::compile(text)?.eval(&mut EvalCtx::new(env))
}

/// Like [`eval_str`], with `data` reachable by procedures through [`EvalCtx::user_data`].
pub fn eval_str_with_data<T: Any + Send + Sync>(
    text: &str,
    env: Environment,
    data: T,
) -> Result<Value, DslError> {
    ParseContext::compile(text)?.eval(&mut EvalCtx::with_user_data(env, data))
}
