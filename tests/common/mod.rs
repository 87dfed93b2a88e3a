//! Shared helpers for the integration tests: a small procedure library and the loader
//! for the `.dsl` script corpus.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use gendsl::{check_nargs, dsl_error, Arity, DslError, Environment, Procedure, UserData, Value};
use walkdir::WalkDir;

/// `(RETURN x)`, `(PLUS ...)`, `(DEFINE "id" value body)`, `(BLOCK ...)`, `(ARRAY ...)`,
/// `(IF cond then else)`, `(EQUAL a b)` and `(OPTIONS ...)`, which returns its options.
pub fn test_env() -> Environment {
    Environment::new()
        .with_procedure(
            "RETURN",
            check_nargs(Arity::Exact(1), |ctx, args, _| args[0].eval(ctx)),
        )
        .with_procedure("PLUS", Procedure::new(plus))
        .with_procedure(
            "DEFINE",
            check_nargs(Arity::Exact(3), |ctx, args, _| {
                let id = match args[0].eval(ctx)? {
                    Value::String(id) => id,
                    other => {
                        return Err(dsl_error!(
                            "expecting a string as id, but got {}",
                            other.type_name()
                        ))
                    }
                };
                let value = args[1].eval(ctx)?;
                args[2].eval_with_env(ctx, Environment::new().with_value(id, value))
            }),
        )
        .with_procedure(
            "BLOCK",
            Procedure::new(|ctx, args, _| {
                let mut last = Value::Nil;
                for arg in args {
                    last = arg.eval(ctx)?;
                }
                Ok(last)
            }),
        )
        .with_procedure(
            "ARRAY",
            Procedure::new(|ctx, args, _| {
                let items = args
                    .iter()
                    .map(|arg| arg.eval(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::UserData(UserData::new(items)))
            }),
        )
        .with_procedure(
            "IF",
            check_nargs(Arity::Exact(3), |ctx, args, _| {
                match args[0].eval(ctx)? {
                    Value::Bool(true) => args[1].eval(ctx),
                    Value::Bool(false) => args[2].eval(ctx),
                    other => Err(dsl_error!(
                        "condition must be bool, but got {}",
                        other.type_name()
                    )),
                }
            }),
        )
        .with_procedure(
            "EQUAL",
            check_nargs(Arity::Exact(2), |ctx, args, _| {
                Ok(Value::Bool(args[0].eval(ctx)? == args[1].eval(ctx)?))
            }),
        )
        .with_procedure(
            "OPTIONS",
            Procedure::new(|_, _, options| {
                Ok(Value::UserData(UserData::selectable(options.clone())))
            }),
        )
}

fn plus(
    ctx: &mut gendsl::EvalCtx,
    args: &[gendsl::Expr],
    _: &gendsl::Options,
) -> Result<Value, DslError> {
    let mut sum = 0i64;
    for (i, arg) in args.iter().enumerate() {
        match arg.eval(ctx)? {
            Value::Int(x) => sum += x,
            other => return Err(dsl_error!("invalid type for #{i} arg: {}", other.type_name())),
        }
    }
    Ok(Value::Int(sum))
}

/// Items of a value produced by `ARRAY`.
pub fn array_items(value: &Value) -> Vec<Value> {
    value
        .as_user_data()
        .and_then(|data| data.downcast_ref::<Vec<Value>>())
        .cloned()
        .expect("value should be an ARRAY result")
}

// ============================================================================
// SCRIPT CORPUS
// ============================================================================

/// One `.dsl` file. Its header comments state the expected outcome:
///
/// ```text
/// ; expect: int 10          (type name, then the displayed value)
/// ; error: unbounded        (substring of the error message)
/// ```
#[derive(Debug, Clone)]
pub struct ScriptCase {
    pub path: PathBuf,
    pub source: String,
    pub expectation: Expectation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    Value { type_name: String, display: String },
    Error(String),
}

pub fn load_script_cases(dir: &Path) -> Vec<ScriptCase> {
    let mut cases: Vec<ScriptCase> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "dsl")
        })
        .map(|entry| {
            let path = entry.path().to_path_buf();
            let source = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
            let expectation = parse_expectation(&source).unwrap_or_else(|| {
                panic!("{} has no `; expect:` or `; error:` header", path.display())
            });
            ScriptCase {
                path,
                source,
                expectation,
            }
        })
        .collect();
    cases.sort_by(|a, b| a.path.cmp(&b.path));
    cases
}

fn parse_expectation(source: &str) -> Option<Expectation> {
    for line in source.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("; expect:") {
            let (type_name, display) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
            return Some(Expectation::Value {
                type_name: type_name.to_string(),
                display: display.to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix("; error:") {
            return Some(Expectation::Error(rest.trim().to_string()));
        }
    }
    None
}
