//! Tree-walking evaluation.
//!
//! Each grammar rule that can be evaluated maps to one node interpreter. Rules without an
//! interpreter never reach evaluation in a well-formed tree; meeting one is a bug in the
//! engine and panics.

use std::sync::Arc;

use tracing::trace;

use crate::diagnostics::DslError;
use crate::engine::Program;
use crate::runtime::{EvalCtx, Expr, Options, SelectError, Value};
use crate::syntax::{
    literal::{self, Integer},
    NodeId, Rule,
};

type NodeFn = fn(&Arc<Program>, &mut EvalCtx, NodeId) -> Result<Value, DslError>;

fn interpreter(rule: Rule) -> Option<NodeFn> {
    let interpret: NodeFn = match rule {
        Rule::Script | Rule::Value => eval_first_significant_child,
        Rule::Literal => eval_child,
        Rule::Expression => eval_expression,
        Rule::Identifier => eval_identifier,
        Rule::IdentifierAttr => eval_identifier_attr,
        Rule::NilLiteral => eval_nil,
        Rule::BoolLiteral => eval_bool,
        Rule::IntegerLiteral => eval_integer,
        Rule::FloatLiteral => eval_float,
        Rule::StringLiteral => eval_string,
        Rule::LongStringLiteral => eval_long_string,
        _ => return None,
    };
    Some(interpret)
}

pub(crate) fn eval_node(
    program: &Arc<Program>,
    ctx: &mut EvalCtx,
    node: NodeId,
) -> Result<Value, DslError> {
    let rule = program.tree.rule(node);
    match interpreter(rule) {
        Some(interpret) => interpret(program, ctx, node),
        None => panic!("no interpreter registered for rule {rule}"),
    }
}

fn eval_first_significant_child(
    program: &Arc<Program>,
    ctx: &mut EvalCtx,
    node: NodeId,
) -> Result<Value, DslError> {
    match program.tree.first_significant_child(node) {
        Some(child) => eval_node(program, ctx, child),
        None => panic!("{} node without content", program.tree.rule(node)),
    }
}

fn eval_child(program: &Arc<Program>, ctx: &mut EvalCtx, node: NodeId) -> Result<Value, DslError> {
    match program.tree.node(node).first_child {
        Some(child) => eval_node(program, ctx, child),
        None => panic!("{} node without child", program.tree.rule(node)),
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

fn eval_expression(
    program: &Arc<Program>,
    ctx: &mut EvalCtx,
    node: NodeId,
) -> Result<Value, DslError> {
    if !ctx.enter() {
        let span = program.trimmed_span(node);
        return Err(DslError::evaluate(
            &program.source,
            span,
            format!("recursion limit exceeded (max depth {})", ctx.max_depth()),
        ));
    }
    let result = apply(program, ctx, node);
    ctx.exit();
    result
}

/// Resolves the operator, evaluates the options, wraps the operands and calls the procedure.
fn apply(program: &Arc<Program>, ctx: &mut EvalCtx, node: NodeId) -> Result<Value, DslError> {
    let tree = &program.tree;
    let span = program.trimmed_span(node);

    let mut children = tree.children(node).skip_while(|c| tree.rule(*c) != Rule::Operator);
    let Some(operator) = children.next() else {
        panic!("expression without operator at {span:?}");
    };
    let Some(id_node) = tree.node(operator).first_child else {
        panic!("operator without identifier at {span:?}");
    };
    let id = program.trimmed_text(id_node);

    let procedure = match ctx.lookup(id) {
        Some(Value::Procedure(procedure)) => procedure.clone(),
        Some(other) => {
            return Err(DslError::evaluate(
                &program.source,
                span,
                format!("<{id}> is not a procedure, but {}", other.type_name()),
            ))
        }
        None => {
            return Err(DslError::unbounded(
                &program.source,
                id,
                program.trimmed_span(id_node),
            ))
        }
    };

    let mut args = Vec::new();
    let mut options = Options::new();
    for child in children {
        match tree.rule(child) {
            Rule::OptionList => eval_options(program, ctx, child, &mut options)?,
            Rule::Value => {
                let Some(operand) = tree.first_significant_child(child) else {
                    panic!("operand without content at {span:?}");
                };
                args.push(Expr::new(Arc::clone(program), operand, ctx));
            }
            Rule::RPar | Rule::Spacing => {}
            other => panic!("unexpected {other} inside expression at {span:?}"),
        }
    }

    trace!(
        operator = id,
        operands = args.len(),
        options = options.len(),
        "calling procedure"
    );
    procedure
        .call(ctx, &args, &options)
        .map_err(|err| err.locate(&program.source, span))
}

/// Options are evaluated eagerly, in the scope of the expression. A repeated key keeps
/// the last value.
fn eval_options(
    program: &Arc<Program>,
    ctx: &mut EvalCtx,
    list: NodeId,
    options: &mut Options,
) -> Result<(), DslError> {
    let tree = &program.tree;
    for option in tree.children(list) {
        let mut parts = tree
            .children(option)
            .filter(|c| tree.rule(*c) != Rule::Spacing);
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            panic!("malformed option {:?}", program.trimmed_text(option));
        };
        let value = eval_node(program, ctx, value)?;
        options.insert(program.trimmed_text(key).to_string(), value);
    }
    Ok(())
}

// ============================================================================
// IDENTIFIERS
// ============================================================================

fn eval_identifier(
    program: &Arc<Program>,
    ctx: &mut EvalCtx,
    node: NodeId,
) -> Result<Value, DslError> {
    let id = program.trimmed_text(node);
    ctx.lookup(id).cloned().ok_or_else(|| {
        DslError::unbounded(&program.source, id, program.trimmed_span(node))
    })
}

fn eval_identifier_attr(
    program: &Arc<Program>,
    ctx: &mut EvalCtx,
    node: NodeId,
) -> Result<Value, DslError> {
    let tree = &program.tree;
    let mut parts = tree.children(node);
    let Some(base) = parts.next() else {
        panic!("attribute access without base identifier");
    };
    let mut value = eval_identifier(program, ctx, base)?;

    for attribute in parts {
        let Some(segment) = tree.node(attribute).first_child else {
            panic!("attribute without identifier");
        };
        let key = program.trimmed_text(segment);
        value = match value.select(key) {
            Ok(selected) => selected,
            Err(SelectError::NotIndexable) => {
                return Err(DslError::evaluate(
                    &program.source,
                    program.trimmed_span(attribute),
                    format!(
                        "index({key}) not found: value(type={}) is not indexable",
                        value.type_name()
                    ),
                ))
            }
            Err(SelectError::NotFound) => {
                return Err(DslError::evaluate(
                    &program.source,
                    program.trimmed_span(attribute),
                    format!("index({key}) not found for value(type={})", value.type_name()),
                ))
            }
        };
    }
    Ok(value)
}

// ============================================================================
// LITERALS
// ============================================================================

fn eval_nil(_: &Arc<Program>, _: &mut EvalCtx, _: NodeId) -> Result<Value, DslError> {
    Ok(Value::Nil)
}

fn eval_bool(program: &Arc<Program>, _: &mut EvalCtx, node: NodeId) -> Result<Value, DslError> {
    Ok(Value::Bool(program.trimmed_text(node) == "#t"))
}

fn eval_integer(program: &Arc<Program>, _: &mut EvalCtx, node: NodeId) -> Result<Value, DslError> {
    let text = program.trimmed_text(node);
    match literal::parse_integer(text) {
        Ok(Integer::Int(i)) => Ok(Value::Int(i)),
        Ok(Integer::Uint(u)) => Ok(Value::Uint(u)),
        Err(err) => Err(DslError::evaluate(
            &program.source,
            program.trimmed_span(node),
            format!("invalid literal {text:?}: {err}"),
        )),
    }
}

fn eval_float(program: &Arc<Program>, _: &mut EvalCtx, node: NodeId) -> Result<Value, DslError> {
    let text = program.trimmed_text(node);
    literal::parse_float(text).map(Value::Float).map_err(|err| {
        DslError::evaluate(
            &program.source,
            program.trimmed_span(node),
            format!("invalid float literal {text:?}: {err}"),
        )
    })
}

fn eval_string(program: &Arc<Program>, _: &mut EvalCtx, node: NodeId) -> Result<Value, DslError> {
    literal::unescape_string(program.trimmed_text(node))
        .map(Value::String)
        .map_err(|err| {
            DslError::evaluate(
                &program.source,
                program.trimmed_span(node),
                format!("invalid string literal: {err}"),
            )
        })
}

fn eval_long_string(
    program: &Arc<Program>,
    _: &mut EvalCtx,
    node: NodeId,
) -> Result<Value, DslError> {
    let text = program.tree.text(node, program.text());
    Ok(Value::String(literal::long_string_body(text).to_string()))
}
