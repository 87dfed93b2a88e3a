//! User-facing output for the CLI: the colored tree dump, JSON, results and error reports.

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::diagnostics::DslError;
use crate::engine::ParseContext;
use crate::runtime::Value;

pub fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Prints one line per node, rule names highlighted, indented by depth.
pub fn print_tree(script: &ParseContext, choice: ColorChoice) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(choice);
    write_tree(script, &mut stdout)
}

pub fn write_tree<W: WriteColor>(script: &ParseContext, out: &mut W) -> io::Result<()> {
    let tree = script.tree();
    let source = script.source();
    let mut result = Ok(());
    tree.walk(|id, node, depth| {
        if result.is_err() {
            return;
        }
        result = (|| {
            write!(out, "{:indent$}", "", indent = depth)?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
            write!(out, "{}", node.rule)?;
            out.reset()?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(out, " {:?}", tree.text(id, source))?;
            out.reset()?;
            writeln!(out)
        })();
    });
    result
}

pub fn print_json(script: &ParseContext) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&script.tree_dump())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    println!("{json}");
    Ok(())
}

pub fn print_result(value: &Value, choice: ColorChoice) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(choice);
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    write!(stdout, "{value}")?;
    stdout.reset()?;
    writeln!(stdout)
}

/// Renders `err` as a `miette` report on stderr.
pub fn print_error(err: DslError) {
    eprintln!("{:?}", miette::Report::new(err));
}
