//! The gendsl command-line front-end.
//!
//! Reads one script, binds the `ECHO` procedure and prints the result. Mostly useful
//! for trying out the grammar and inspecting syntax trees.

use std::{
    fs,
    io::{self, Read},
    process,
    sync::Once,
};

use clap::Parser;
use tracing::debug;

use crate::cli::args::GendslArgs;
use crate::diagnostics::DslError;
use crate::engine::ParseContext;
use crate::runtime::{Environment, EvalCtx, Procedure, Value};

pub mod args;
pub mod output;

static TRACING_INIT: Once = Once::new();

/// Installs a `tracing` subscriber, but only when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

/// An environment with `ECHO` bound: it evaluates each operand in order, prints it on its
/// own line and returns the number of operands.
pub fn echo_env() -> Environment {
    Environment::new().with_procedure(
        "ECHO",
        Procedure::new(|ctx, args, _| {
            for arg in args {
                let value = arg.eval(ctx)?;
                println!("{value}");
            }
            Ok(Value::Int(args.len() as i64))
        }),
    )
}

/// The main entry point for the CLI.
pub fn run() {
    init_tracing();
    let args = GendslArgs::parse();
    if args.no_color {
        let _ = miette::set_hook(Box::new(|_| {
            Box::new(miette::MietteHandlerOpts::new().color(false).build())
        }));
    }

    let result = read_script(&args).and_then(|text| execute(&args, text));
    match result {
        Ok(()) => {}
        Err(CliError::Dsl(err)) => {
            output::print_error(err);
            process::exit(1);
        }
        Err(CliError::Io(err)) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
    }
}

enum CliError {
    Dsl(DslError),
    Io(io::Error),
}

impl From<DslError> for CliError {
    fn from(err: DslError) -> Self {
        CliError::Dsl(err)
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Io(err)
    }
}

fn read_script(args: &GendslArgs) -> Result<(String, String), CliError> {
    if let Some(path) = &args.file {
        let text = fs::read_to_string(path)?;
        return Ok((path.display().to_string(), text));
    }
    if let Some(script) = &args.script {
        return Ok(("<argument>".to_string(), script.clone()));
    }
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    Ok(("<stdin>".to_string(), text))
}

fn execute(args: &GendslArgs, (name, text): (String, String)) -> Result<(), CliError> {
    let script = ParseContext::compile_named(&name, text)?;
    let choice = output::color_choice(args.no_color);

    if args.json {
        output::print_json(&script)?;
        return Ok(());
    }
    if args.print_tree {
        output::print_tree(&script, choice)?;
    }

    let mut ctx = EvalCtx::new(echo_env()).with_max_depth(args.max_depth);
    let value = script.eval(&mut ctx)?;
    debug!(result = %value, "evaluation finished");
    output::print_result(&value, choice)?;
    Ok(())
}
