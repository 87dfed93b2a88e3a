//! Syntax module for gendsl scripts
//!
//! This module owns everything that happens before evaluation: the ordered-choice
//! grammar matcher, the reduction of its flat token log into a syntax tree, literal
//! decoding and the translation of byte offsets into line/column pairs for diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod literal;
pub mod matcher;
pub mod position;
pub mod tree;

pub use matcher::{match_script, SyntaxFailure};
pub use position::{translate_positions, LineCol, Location};
pub use tree::{Node, NodeId, SyntaxTree, TreeDump};

/// Represents a span in the source code (byte offsets, half-open).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} is after end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies inside this span (equal spans contain each other).
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Shrinks the span so it excludes leading and trailing whitespace of `source`.
    pub fn trimmed(&self, source: &str) -> Span {
        let text = &source[self.start..self.end];
        let leading = text.len() - text.trim_start().len();
        let trailing = text.len() - text.trim_end().len();
        if leading + trailing >= text.len() {
            return Span::new(self.start, self.start);
        }
        Span::new(self.start + leading, self.end - trailing)
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        miette::SourceSpan::from(span.start..span.end)
    }
}

/// Grammar rules. Every token and syntax tree node is tagged with one of these.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    Script,
    Expression,
    Operator,
    Value,
    OptionList,
    Option,
    Spacing,
    Identifier,
    IdentifierAttr,
    Attribute,
    Literal,
    NilLiteral,
    BoolLiteral,
    FloatLiteral,
    Exponent,
    IntegerLiteral,
    HexNumeral,
    DecimalNumeral,
    LongStringLiteral,
    StringLiteral,
    HexByte,
    UChar,
    Escape,
    #[serde(rename = "LPAR")]
    LPar,
    #[serde(rename = "RPAR")]
    RPar,
    #[serde(rename = "EOT")]
    Eot,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Script => "Script",
            Rule::Expression => "Expression",
            Rule::Operator => "Operator",
            Rule::Value => "Value",
            Rule::OptionList => "OptionList",
            Rule::Option => "Option",
            Rule::Spacing => "Spacing",
            Rule::Identifier => "Identifier",
            Rule::IdentifierAttr => "IdentifierAttr",
            Rule::Attribute => "Attribute",
            Rule::Literal => "Literal",
            Rule::NilLiteral => "NilLiteral",
            Rule::BoolLiteral => "BoolLiteral",
            Rule::FloatLiteral => "FloatLiteral",
            Rule::Exponent => "Exponent",
            Rule::IntegerLiteral => "IntegerLiteral",
            Rule::HexNumeral => "HexNumeral",
            Rule::DecimalNumeral => "DecimalNumeral",
            Rule::LongStringLiteral => "LongStringLiteral",
            Rule::StringLiteral => "StringLiteral",
            Rule::HexByte => "HexByte",
            Rule::UChar => "UChar",
            Rule::Escape => "Escape",
            Rule::LPar => "LPAR",
            Rule::RPar => "RPAR",
            Rule::Eot => "EOT",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful, non-empty match of one rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub rule: Rule,
    pub span: Span,
}
