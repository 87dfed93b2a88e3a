//! Two small languages built only on the public API: a line-oriented text processor in the
//! spirit of awk, and a JSON builder.

use std::{
    any::Any,
    sync::{Arc, Mutex},
};

use gendsl::{
    check_nargs, dsl_error, Arity, DslError, Environment, ErrorKind, EvalCtx, Expr, ParseContext,
    Procedure, UserData, Value,
};
use regex::Regex;
use serde_json::{json, Map as JsonMap, Value as Json};

// ============================================================================
// MINI AWK
// ============================================================================

/// Host side of an awk run: the text to scan and everything `printf` wrote.
struct AwkIo {
    input: String,
    output: Mutex<String>,
}

/// One clause of `(awk ...)`, produced by `BEGIN`, `END` and `PATTERN`.
enum Clause {
    Begin(Expr),
    End(Expr),
    Pattern { cond: Expr, then: Expr },
}

#[derive(Default)]
struct MiniAwk {
    begin: Option<Expr>,
    end: Option<Expr>,
    patterns: Vec<(Expr, Expr)>,
}

fn clause(clause: Clause) -> Value {
    Value::UserData(UserData::new(clause))
}

fn awk_clauses() -> Environment {
    Environment::new()
        .with_procedure(
            "BEGIN",
            check_nargs(Arity::Exact(1), |_, args, _| {
                Ok(clause(Clause::Begin(args[0].clone())))
            }),
        )
        .with_procedure(
            "END",
            check_nargs(Arity::Exact(1), |_, args, _| {
                Ok(clause(Clause::End(args[0].clone())))
            }),
        )
        .with_procedure(
            "PATTERN",
            check_nargs(Arity::Exact(2), |_, args, _| {
                Ok(clause(Clause::Pattern {
                    cond: args[0].clone(),
                    then: args[1].clone(),
                }))
            }),
        )
        .with_procedure("printf", Procedure::with_arity(Arity::OneOrMore, printf))
        .with_procedure(
            "match",
            check_nargs(Arity::Exact(2), |ctx, args, _| {
                let pattern = String::try_from(args[0].eval(ctx)?)?;
                let text = String::try_from(args[1].eval(ctx)?)?;
                let re = Regex::new(&pattern).map_err(DslError::wrap)?;
                Ok(Value::Bool(re.is_match(&text)))
            }),
        )
}

/// `%s`, `%d` and `%%`, with an optional `-` flag and width.
fn format_printf(format: &str, values: &[Value]) -> Result<String, DslError> {
    let mut out = String::new();
    let mut values = values.iter();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.next_if_eq(&'%').is_some() {
            out.push('%');
            continue;
        }
        let left = chars.next_if_eq(&'-').is_some();
        let mut width = 0usize;
        while let Some(digit) = chars.next_if(|c| c.is_ascii_digit()) {
            width = width * 10 + digit.to_digit(10).map_or(0, |d| d as usize);
        }
        let verb = chars.next().ok_or_else(|| dsl_error!("dangling % in format {format:?}"))?;
        if verb != 's' && verb != 'd' {
            return Err(dsl_error!("unsupported verb %{verb}"));
        }
        let value = values
            .next()
            .ok_or_else(|| dsl_error!("missing operand for %{verb}"))?;
        let text = value.to_string();
        if left {
            out.push_str(&format!("{text:<width$}"));
        } else {
            out.push_str(&format!("{text:>width$}"));
        }
    }
    Ok(out)
}

fn printf(ctx: &mut EvalCtx, args: &[Expr], _: &gendsl::Options) -> Result<Value, DslError> {
    let format = String::try_from(args[0].eval(ctx)?)?;
    let values = args[1..]
        .iter()
        .map(|arg| arg.eval(ctx))
        .collect::<Result<Vec<_>, _>>()?;
    let line = format_printf(&format, &values)?;

    let io = ctx
        .user_data::<AwkIo>()
        .ok_or_else(|| dsl_error!("awk needs its input attached"))?;
    io.output
        .lock()
        .map_err(|_| dsl_error!("output lock poisoned"))?
        .push_str(&line);
    Ok(Value::Nil)
}

fn awk(ctx: &mut EvalCtx, args: &[Expr], _: &gendsl::Options) -> Result<Value, DslError> {
    let mut program = MiniAwk::default();
    for arg in args {
        let value = arg.eval_with_env(ctx, awk_clauses())?;
        let clause = value
            .as_user_data()
            .and_then(|data| data.downcast_ref::<Clause>())
            .ok_or_else(|| dsl_error!("expecting an awk clause, but got {}", value.type_name()))?;
        match clause {
            Clause::Begin(expr) => program.begin = Some(expr.clone()),
            Clause::End(expr) => program.end = Some(expr.clone()),
            Clause::Pattern { cond, then } => program.patterns.push((cond.clone(), then.clone())),
        }
    }

    let input = ctx
        .user_data::<AwkIo>()
        .ok_or_else(|| dsl_error!("awk needs its input attached"))?
        .input
        .clone();

    if let Some(begin) = &program.begin {
        begin.eval(ctx)?;
    }
    for line in input.lines() {
        let mut fields = Environment::new().with_string("$0", line);
        for (i, field) in line.split(' ').enumerate() {
            fields.define(format!("${}", i + 1), field);
        }
        for (cond, then) in &program.patterns {
            match cond.eval_with_env(ctx, fields.clone())? {
                Value::Bool(true) => {
                    then.eval_with_env(ctx, fields.clone())?;
                }
                Value::Bool(false) => {}
                other => {
                    return Err(dsl_error!(
                        "pattern must be bool, but got {}",
                        other.type_name()
                    ))
                }
            }
        }
    }
    if let Some(end) = &program.end {
        end.eval(ctx)?;
    }
    Ok(Value::Nil)
}

fn run_awk(script: &str, input: &str) -> Result<String, DslError> {
    let io = Arc::new(AwkIo {
        input: input.to_string(),
        output: Mutex::new(String::new()),
    });
    let env = Environment::new().with_procedure("awk", Procedure::new(awk));
    let shared: Arc<dyn Any + Send + Sync> = io.clone();
    let mut ctx = EvalCtx::with_shared_user_data(env, shared);
    ParseContext::compile(script)?.eval(&mut ctx)?;

    let output = io.output.lock().unwrap().clone();
    Ok(output)
}

const LANGUAGES: &str = "
C Static 1972
C++ Static 1985
Python Dynamic 1991
Ruby Dynamic 1995
\t";

#[test]
fn awk_prints_matching_lines() {
    let script = r#"
(awk
	(BEGIN (printf "Language    FirstAppearAt\n" ))
	; languages whose name contains a C, with the year they first appeared
	(PATTERN (match ".*C.*" $1) (printf "%-8s    %s\n" $1 $3))
)
"#;
    let output = run_awk(script, LANGUAGES).unwrap();
    assert_eq!(
        output,
        "Language    FirstAppearAt\nC           1972\nC++         1985\n"
    );
}

#[test]
fn awk_end_runs_after_every_line() {
    let script = r#"
(awk
  (END (printf "done\n"))
  (PATTERN (match "Dynamic" $0) (printf "%s;" $1))
  (BEGIN (printf "start:")))
"#;
    let output = run_awk(script, LANGUAGES).unwrap();
    assert_eq!(output, "start:Python;Ruby;done\n");
}

#[test]
fn awk_fields_are_only_visible_per_line() {
    let script = r#"(awk (BEGIN (printf "%s" $1)))"#;
    let err = run_awk(script, LANGUAGES).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnboundedIdentifier);
    assert_eq!(err.message(), "$1");
}

#[test]
fn awk_clauses_are_scoped_to_awk() {
    let err = run_awk(r#"(BEGIN (printf "x"))"#, "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnboundedIdentifier);
    assert_eq!(err.message(), "BEGIN");
}

#[test]
fn awk_rejects_non_bool_patterns() {
    let err = run_awk(r#"(awk (PATTERN $1 (printf "x")))"#, "a b").unwrap_err();
    assert_eq!(err.message(), "pattern must be bool, but got string");
}

#[test]
fn awk_reports_bad_regex() {
    let err = run_awk(r#"(awk (PATTERN (match "(" $0) (printf "x")))"#, "line").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Evaluate);
    assert!(std::error::Error::source(&err).is_some());
}

// ============================================================================
// JSON BUILDER
// ============================================================================

/// `(kv key value)` result.
struct Kv {
    key: String,
    value: Json,
}

const NOW: i64 = 2024;

fn to_json(value: Value) -> Result<Json, DslError> {
    Ok(match value {
        Value::Nil => Json::Null,
        Value::Int(i) => json!(i),
        Value::Uint(u) => json!(u),
        Value::Float(f) => json!(f),
        Value::Bool(b) => json!(b),
        Value::String(s) => json!(s),
        Value::UserData(data) => data
            .downcast_ref::<Json>()
            .cloned()
            .ok_or_else(|| dsl_error!("cannot convert {} to json", data.type_name()))?,
        Value::Procedure(_) => return Err(dsl_error!("cannot convert procedure to json")),
    })
}

fn eval_kv(
    ctx: &mut EvalCtx,
    arg: &Expr,
    env: Option<Environment>,
) -> Result<(String, Json), DslError> {
    let value = match env {
        Some(env) => arg.eval_with_env(ctx, env)?,
        None => arg.eval(ctx)?,
    };
    let kv = value
        .as_user_data()
        .and_then(|data| data.downcast_ref::<Kv>())
        .ok_or_else(|| dsl_error!("expecting a kv, but got {}", value.type_name()))?;
    Ok((kv.key.clone(), kv.value.clone()))
}

fn json_ops() -> Environment {
    Environment::new()
        .with_procedure(
            "kv",
            check_nargs(Arity::Exact(2), |ctx, args, _| {
                let key = match args[0].eval(ctx)? {
                    Value::String(key) => key,
                    other => return Err(dsl_error!("key is not string, but {}", other.type_name())),
                };
                let value = to_json(args[1].eval(ctx)?)?;
                Ok(Value::UserData(UserData::new(Kv { key, value })))
            }),
        )
        .with_procedure(
            "array",
            Procedure::new(|ctx, args, _| {
                let items = args
                    .iter()
                    .map(|arg| arg.eval(ctx).and_then(to_json))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::UserData(UserData::new(Json::Array(items))))
            }),
        )
        .with_procedure(
            "dict",
            Procedure::new(|ctx, args, _| {
                let mut map = JsonMap::new();
                for arg in args {
                    let (key, value) = eval_kv(ctx, arg, None)?;
                    map.insert(key, value);
                }
                Ok(Value::UserData(UserData::new(Json::Object(map))))
            }),
        )
        .with_procedure(
            "if",
            check_nargs(Arity::Exact(3), |ctx, args, _| {
                let cond_env = Environment::new().with_int("$NOW", NOW).with_procedure(
                    "later-than",
                    check_nargs("2".parse()?, |ctx, args, _| {
                        let left = i64::try_from(args[0].eval(ctx)?)?;
                        let right = i64::try_from(args[1].eval(ctx)?)?;
                        Ok(Value::Bool(left > right))
                    }),
                );
                match args[0].eval_with_env(ctx, cond_env)? {
                    Value::Bool(true) => args[1].eval(ctx),
                    _ => args[2].eval(ctx),
                }
            }),
        )
}

/// Where `json` leaves the document it built.
type JsonSlot = Mutex<Option<Json>>;

fn json_document(ctx: &mut EvalCtx, args: &[Expr], _: &gendsl::Options) -> Result<Value, DslError> {
    let mut document = JsonMap::new();
    for arg in args {
        let (key, value) = eval_kv(ctx, arg, Some(json_ops()))?;
        document.insert(key, value);
    }
    let document = Json::Object(document);
    let text = serde_json::to_string(&document).map_err(DslError::wrap)?;
    if let Some(slot) = ctx.user_data::<JsonSlot>() {
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(document);
        }
    }
    Ok(Value::String(text))
}

fn eval_json(script: &str) -> Result<(String, Option<Json>), DslError> {
    let slot: Arc<JsonSlot> = Arc::new(Mutex::new(None));
    let shared: Arc<dyn Any + Send + Sync> = slot.clone();
    let env = Environment::new().with_procedure("json", Procedure::new(json_document));
    let mut ctx = EvalCtx::with_shared_user_data(env, shared);
    let text = String::try_from(ParseContext::compile(script)?.eval(&mut ctx)?)?;
    let document = slot.lock().unwrap().take();
    Ok((text, document))
}

#[test]
fn json_document_is_built_and_serialized() {
    let script = r#"
(json
 (if (later-than $NOW 2012)                                  ; condition
     (kv "language" (array "c" "c++" "javascript" "elixir")) ; then
     (kv "language" (array "c" "c++" "javascript")))         ; else
 (kv "typing"
     (dict
      (kv "c" "static")
      (kv "c++" "static")
      (kv "javascript" "dynamic")))
 )
"#;
    let (text, document) = eval_json(script).unwrap();
    assert_eq!(
        text,
        concat!(
            r#"{"language":["c","c++","javascript","elixir"],"#,
            r#""typing":{"c":"static","c++":"static","javascript":"dynamic"}}"#,
        )
    );
    assert_eq!(
        document,
        Some(json!({
            "language": ["c", "c++", "javascript", "elixir"],
            "typing": {"c": "static", "c++": "static", "javascript": "dynamic"},
        }))
    );
}

#[test]
fn json_scalars_and_nesting() {
    let (text, _) = eval_json(
        r#"(json (kv "n" -3) (kv "u" 7u) (kv "f" 0.5) (kv "ok" #t) (kv "none" nil)
                 (kv "nested" (array (array 1) (dict))))"#,
    )
    .unwrap();
    let parsed: Json = serde_json::from_str(&text).unwrap();
    assert_eq!(
        parsed,
        json!({"n": -3, "u": 7, "f": 0.5, "ok": true, "none": null, "nested": [[1], {}]})
    );
}

#[test]
fn json_helpers_only_exist_inside_json() {
    let err = eval_json(r#"(kv "a" 1)"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnboundedIdentifier);
    assert_eq!(err.message(), "kv");
}

#[test]
fn json_rejects_non_string_keys() {
    let err = eval_json(r#"(json (kv 1 2))"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Evaluate);
    assert_eq!(err.message(), "key is not string, but int");
}

#[test]
fn json_requires_kv_operands() {
    let err = eval_json(r#"(json (array 1))"#).unwrap_err();
    assert!(err.message().starts_with("expecting a kv, but got userdata"), "{err}");
}
