//! Diagnostics for gendsl.
//!
//! Every failure produced by the engine, whether while compiling a script or while
//! evaluating it, is a [`DslError`]. Errors that point into a script carry the script as a
//! `miette` source together with the byte span of the offending region, so a
//! [`miette::Report`] renders them with the source excerpt underlined. The Display form is
//! the plain one-line message (`evaluate error (line 1 symbol 2 - line 1 symbol 9): ...`).
//!
//! Procedure bodies do not know where they are being called from. They report failures
//! through [`DslError::custom`] or [`DslError::wrap`] (or the [`dsl_error!`](crate::dsl_error)
//! macro), and the dispatcher attaches the interval of the enclosing expression.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::syntax::{Location, Rule, Span};

pub type SourceArc = Arc<NamedSource<String>>;
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`DslError`], convenient for matching in tests and hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The script does not match the grammar.
    Syntax,
    /// An identifier is absent from the whole scope chain.
    UnboundedIdentifier,
    /// A failure located at an expression during evaluation.
    Evaluate,
    /// Wrong number of operands, reported by the arity guard.
    Arity,
    /// A failure raised by a procedure body that has not been located yet.
    Procedure,
    /// Misuse of the host API.
    Host,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::UnboundedIdentifier => "unbounded-identifier",
            ErrorKind::Evaluate => "evaluate",
            ErrorKind::Arity => "arity",
            ErrorKind::Procedure => "procedure",
            ErrorKind::Host => "host",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source and help attached to a located error.
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub source: Option<SourceArc>,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: &SourceArc, span: Span) -> Self {
        Self {
            source: Some(Arc::clone(source)),
            span: Some(span),
            help: None,
        }
    }
}

/// An operand count rejected by an arity guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArityMismatch {
    #[error("expecting {expected} argument(s), but got {got}")]
    Exact { expected: usize, got: usize },
    #[error("expecting one or more argument, but got {got}")]
    OneOrMore { got: usize },
    #[error("expecting one or no argument, but got {got}")]
    ZeroOrOne { got: usize },
}

#[derive(Debug, Error)]
pub enum DslError {
    #[error("parse error near {rule} ({location}): {snippet:?}")]
    Syntax {
        rule: Rule,
        span: Span,
        location: Location,
        snippet: String,
        ctx: ErrorContext,
    },
    #[error("unbounded identifier ({location}): {id}")]
    UnboundedIdentifier {
        id: String,
        span: Span,
        location: Location,
        ctx: ErrorContext,
    },
    #[error("evaluate error ({location}): {message}")]
    Evaluate {
        message: String,
        span: Span,
        location: Location,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxError>,
    },
    #[error(transparent)]
    Arity(#[from] ArityMismatch),
    #[error("{message}")]
    Procedure {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("cannot bind {id}: no value given")]
    EmptyBinding { id: String },
    #[error("invalid arity pattern {pattern:?}, expecting a number, \"+\", \"?\", \"*\" or \"\"")]
    InvalidArity { pattern: String },
}

impl DslError {
    pub(crate) fn syntax(source: &SourceArc, rule: Rule, span: Span) -> Self {
        let text = source.inner().as_str();
        DslError::Syntax {
            rule,
            span,
            location: Location::of(text, span),
            snippet: text[span.start..span.end].to_string(),
            ctx: ErrorContext::with_source_and_span(source, span),
        }
    }

    pub(crate) fn unbounded(source: &SourceArc, id: impl Into<String>, span: Span) -> Self {
        DslError::UnboundedIdentifier {
            id: id.into(),
            span,
            location: Location::of(source.inner(), span),
            ctx: ErrorContext::with_source_and_span(source, span),
        }
    }

    pub(crate) fn evaluate(source: &SourceArc, span: Span, message: impl Into<String>) -> Self {
        DslError::Evaluate {
            message: message.into(),
            span,
            location: Location::of(source.inner(), span),
            ctx: ErrorContext::with_source_and_span(source, span),
            source: None,
        }
    }

    /// Anchors a procedure failure at `span`. Every other error, including arity
    /// mismatches, is returned unchanged.
    pub(crate) fn locate(self, source: &SourceArc, span: Span) -> Self {
        match self {
            DslError::Procedure { message, source: cause } => DslError::Evaluate {
                message,
                span,
                location: Location::of(source.inner(), span),
                ctx: ErrorContext::with_source_and_span(source, span),
                source: cause,
            },
            located => located,
        }
    }

    /// A procedure failure with a plain message.
    pub fn custom(message: impl Into<String>) -> Self {
        DslError::Procedure {
            message: message.into(),
            source: None,
        }
    }

    /// A procedure failure caused by a host error, which stays reachable through `source()`.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DslError::Procedure {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        if let Some(ctx) = self.ctx_mut() {
            ctx.help = Some(help.into());
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DslError::Syntax { .. } => ErrorKind::Syntax,
            DslError::UnboundedIdentifier { .. } => ErrorKind::UnboundedIdentifier,
            DslError::Evaluate { .. } => ErrorKind::Evaluate,
            DslError::Arity(_) => ErrorKind::Arity,
            DslError::Procedure { .. } => ErrorKind::Procedure,
            DslError::EmptyBinding { .. } | DslError::InvalidArity { .. } => ErrorKind::Host,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            DslError::Syntax { span, .. }
            | DslError::UnboundedIdentifier { span, .. }
            | DslError::Evaluate { span, .. } => Some(*span),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            DslError::Syntax { location, .. }
            | DslError::UnboundedIdentifier { location, .. }
            | DslError::Evaluate { location, .. } => Some(*location),
            _ => None,
        }
    }

    /// The bare cause, without the position prefix of the Display form.
    pub fn message(&self) -> String {
        match self {
            DslError::Evaluate { message, .. } | DslError::Procedure { message, .. } => {
                message.clone()
            }
            DslError::UnboundedIdentifier { id, .. } => id.clone(),
            other => other.to_string(),
        }
    }

    fn ctx(&self) -> Option<&ErrorContext> {
        match self {
            DslError::Syntax { ctx, .. }
            | DslError::UnboundedIdentifier { ctx, .. }
            | DslError::Evaluate { ctx, .. } => Some(ctx),
            _ => None,
        }
    }

    fn ctx_mut(&mut self) -> Option<&mut ErrorContext> {
        match self {
            DslError::Syntax { ctx, .. }
            | DslError::UnboundedIdentifier { ctx, .. }
            | DslError::Evaluate { ctx, .. } => Some(ctx),
            _ => None,
        }
    }
}

impl Diagnostic for DslError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("gendsl::{}", self.kind())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.ctx()
            .and_then(|ctx| ctx.help.as_ref())
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx()
            .and_then(|ctx| ctx.source.as_ref())
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.ctx()?.span?;
        let text = match self {
            DslError::Syntax { rule, .. } => format!("matched up to this {rule}"),
            DslError::UnboundedIdentifier { .. } => "not bound in any enclosing scope".to_string(),
            DslError::Evaluate { message, .. } => message.clone(),
            _ => return None,
        };
        let len = span.len().max(1);
        Some(Box::new(std::iter::once(LabeledSpan::new(
            Some(text),
            span.start,
            len,
        ))))
    }
}

/// Converts a script into the shared named source attached to located errors.
pub fn to_error_source(name: impl AsRef<str>, source: impl Into<String>) -> SourceArc {
    Arc::new(NamedSource::new(name, source.into()))
}

/// Builds a positionless procedure failure from a format string.
///
/// `dsl_error!("expecting {} but got {}", want, got)` is shorthand for
/// `DslError::custom(format!(...))`.
#[macro_export]
macro_rules! dsl_error {
    ($($arg:tt)*) => {
        $crate::DslError::custom(format!($($arg)*))
    };
}
