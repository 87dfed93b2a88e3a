//! Command-line arguments for the `gendsl` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::runtime::{DEFAULT_MAX_DEPTH, MAX_DEPTH_CEILING};

/// Evaluates a script with the `ECHO` procedure bound, or dumps its syntax tree.
#[derive(Debug, Parser)]
#[command(
    name = "gendsl",
    version,
    about = "Evaluate a gendsl script. (ECHO a b ...) prints each operand and returns their count."
)]
pub struct GendslArgs {
    /// Script text. Read from stdin when neither this nor --file is given.
    #[arg(conflicts_with = "file")]
    pub script: Option<String>,

    /// Read the script from a file.
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Print the syntax tree before evaluating.
    #[arg(short = 't', long)]
    pub print_tree: bool,

    /// Print the syntax tree as JSON and exit without evaluating.
    #[arg(long)]
    pub json: bool,

    /// Maximum nesting of expression calls, at most 1024.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_DEPTH,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new()
            .range(1..=MAX_DEPTH_CEILING as u64)
    )]
    pub max_depth: usize,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}
