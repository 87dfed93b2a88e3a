//! Ordered-choice grammar matcher
//!
//! Converts script text into a flat, post-ordered log of [`Token`]s. Every grammar rule is
//! an ordinary method returning `true` on success; the combinators below restore the cursor
//! and truncate the token log whenever an alternative fails, so a failed branch never leaks
//! tokens into the result.
//!
//! The grammar (first success wins, no ambiguity recovery):
//!
//! ```text
//! Script         <- Spacing Value EOT
//! Value          <- (Expression / Literal / IdentifierAttr / Identifier) Spacing
//! Expression     <- LPAR Operator (OptionList / Value)* RPAR
//! Operator       <- Identifier
//! OptionList     <- Option+
//! Option         <- '#' ':' Identifier (Literal / IdentifierAttr / Identifier) Spacing
//! IdentifierAttr <- Identifier Attribute+
//! Attribute      <- '.' Identifier
//! Identifier     <- [A-Za-z_@$] ([A-Za-z0-9_] / '-')* Spacing
//! Literal        <- FloatLiteral / LongStringLiteral / BoolLiteral
//!                 / StringLiteral / NilLiteral / IntegerLiteral
//! Spacing        <- ([ \t\r\n]+ / ';' (![\r\n] .)* ([\r\n] / !.))*
//! LPAR           <- Spacing '(' Spacing
//! RPAR           <- Spacing ')' Spacing
//! EOT            <- !.
//! ```

use tracing::debug;

use super::{Rule, Span, Token};

/// Deepest expression nesting the matcher accepts. Each level recurses through several
/// rule frames, so this bounds native stack use on hostile input.
pub const MAX_NESTING: usize = 1024;

/// The furthest successful match reached before the script failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxFailure {
    pub rule: Rule,
    pub span: Span,
}

/// Runs the grammar over `text`, returning the token log of a complete match.
pub fn match_script(text: &str) -> Result<Vec<Token>, SyntaxFailure> {
    let mut matcher = Matcher::new(text);
    if matcher.script() {
        debug!(tokens = matcher.tokens.len(), "script matched");
        return Ok(matcher.tokens);
    }

    let failure = matcher
        .furthest
        .map(|token| SyntaxFailure {
            rule: token.rule,
            span: token.span,
        })
        .unwrap_or(SyntaxFailure {
            rule: Rule::Script,
            span: Span::new(0, 0),
        });
    debug!(
        rule = %failure.rule,
        start = failure.span.start,
        end = failure.span.end,
        "script rejected"
    );
    Err(failure)
}

struct Matcher<'s> {
    text: &'s str,
    pos: usize,
    tokens: Vec<Token>,
    /// Rightmost non-empty match so far, reported when the whole script fails.
    furthest: Option<Token>,
    nesting: usize,
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_letter_or_digit(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_sign(c: char) -> bool {
    c == '+' || c == '-'
}

impl<'s> Matcher<'s> {
    fn new(text: &'s str) -> Self {
        Self {
            text,
            pos: 0,
            tokens: Vec::with_capacity(text.len() / 2),
            furthest: None,
            nesting: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Primitive matchers
    // ------------------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Matches any single character.
    fn bump(&mut self) -> bool {
        match self.peek() {
            Some(c) => {
                self.pos += c.len_utf8();
                true
            }
            None => false,
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.eat_if(|c| c == expected)
    }

    fn eat_if(&mut self, pred: impl Fn(char) -> bool) -> bool {
        match self.peek() {
            Some(c) if pred(c) => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if self.text[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            return true;
        }
        false
    }

    fn eat_hex_digits(&mut self, count: usize) -> bool {
        (0..count).all(|_| self.eat_if(|c| c.is_ascii_hexdigit()))
    }

    // ------------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------------

    /// Runs `f`; on failure restores the cursor and drops any tokens it produced.
    fn attempt(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let (pos, len) = (self.pos, self.tokens.len());
        if f(self) {
            return true;
        }
        self.pos = pos;
        self.tokens.truncate(len);
        false
    }

    /// Runs `f` as the body of `rule`, recording a token for non-empty matches.
    fn rule(&mut self, rule: Rule, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let begin = self.pos;
        if !self.attempt(f) {
            return false;
        }
        if begin != self.pos {
            self.add(rule, begin);
        }
        true
    }

    fn add(&mut self, rule: Rule, begin: usize) {
        let token = Token {
            rule,
            span: Span::new(begin, self.pos),
        };
        self.tokens.push(token);
        if self.furthest.map_or(true, |max| self.pos > max.span.end) {
            self.furthest = Some(token);
        }
    }

    fn zero_or_more(&mut self, mut f: impl FnMut(&mut Self) -> bool) -> bool {
        loop {
            let before = self.pos;
            if !self.attempt(&mut f) || self.pos == before {
                return true;
            }
        }
    }

    fn one_or_more(&mut self, mut f: impl FnMut(&mut Self) -> bool) -> bool {
        if !self.attempt(&mut f) {
            return false;
        }
        self.zero_or_more(f)
    }

    fn optional(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        self.attempt(f);
        true
    }

    /// Negative lookahead: succeeds without consuming input when `f` fails.
    fn not_ahead(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let (pos, len) = (self.pos, self.tokens.len());
        let matched = f(self);
        self.pos = pos;
        self.tokens.truncate(len);
        !matched
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    fn script(&mut self) -> bool {
        self.rule(Rule::Script, |m| m.spacing() && m.value() && m.eot())
    }

    fn eot(&mut self) -> bool {
        self.rule(Rule::Eot, |m| m.at_end())
    }

    fn value(&mut self) -> bool {
        self.rule(Rule::Value, |m| {
            (m.expression() || m.literal() || m.identifier_attr() || m.identifier()) && m.spacing()
        })
    }

    fn expression(&mut self) -> bool {
        if self.nesting >= MAX_NESTING {
            return false;
        }
        self.nesting += 1;
        let matched = self.rule(Rule::Expression, |m| {
            m.lpar()
                && m.operator()
                && m.zero_or_more(|m| m.option_list() || m.value())
                && m.rpar()
        });
        self.nesting -= 1;
        matched
    }

    fn operator(&mut self) -> bool {
        self.rule(Rule::Operator, |m| m.identifier())
    }

    fn option_list(&mut self) -> bool {
        self.rule(Rule::OptionList, |m| m.one_or_more(|m| m.option()))
    }

    fn option(&mut self) -> bool {
        self.rule(Rule::Option, |m| {
            m.eat('#')
                && m.eat(':')
                && m.identifier()
                && (m.literal() || m.identifier_attr() || m.identifier())
                && m.spacing()
        })
    }

    fn lpar(&mut self) -> bool {
        self.rule(Rule::LPar, |m| m.spacing() && m.eat('(') && m.spacing())
    }

    fn rpar(&mut self) -> bool {
        self.rule(Rule::RPar, |m| m.spacing() && m.eat(')') && m.spacing())
    }

    fn spacing(&mut self) -> bool {
        self.rule(Rule::Spacing, |m| {
            m.zero_or_more(|m| m.one_or_more(|m| m.eat_if(is_blank)) || m.comment())
        })
    }

    fn comment(&mut self) -> bool {
        self.attempt(|m| {
            m.eat(';')
                && m.zero_or_more(|m| m.not_ahead(|m| m.eat('\r') || m.eat('\n')) && m.bump())
                && (m.eat('\r') || m.eat('\n') || m.at_end())
        })
    }

    // ------------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------------

    fn identifier(&mut self) -> bool {
        self.rule(Rule::Identifier, |m| {
            m.eat_if(|c| is_letter(c) || c == '@' || c == '$')
                && m.zero_or_more(|m| m.eat_if(|c| is_letter_or_digit(c) || c == '-'))
                && m.spacing()
        })
    }

    fn identifier_attr(&mut self) -> bool {
        self.rule(Rule::IdentifierAttr, |m| {
            m.identifier() && m.one_or_more(|m| m.attribute())
        })
    }

    fn attribute(&mut self) -> bool {
        self.rule(Rule::Attribute, |m| m.eat('.') && m.identifier())
    }

    // ------------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------------

    fn literal(&mut self) -> bool {
        self.rule(Rule::Literal, |m| {
            m.float_literal()
                || m.long_string_literal()
                || m.bool_literal()
                || m.string_literal()
                || m.nil_literal()
                || m.integer_literal()
        })
    }

    fn nil_literal(&mut self) -> bool {
        self.rule(Rule::NilLiteral, |m| {
            m.eat_str("nil") && m.not_ahead(|m| m.eat_if(|c| is_letter_or_digit(c) || c == '-'))
        })
    }

    fn bool_literal(&mut self) -> bool {
        self.rule(Rule::BoolLiteral, |m| {
            (m.eat_str("#f") || m.eat_str("#t")) && m.not_ahead(|m| m.eat_if(is_letter_or_digit))
        })
    }

    fn float_literal(&mut self) -> bool {
        self.rule(Rule::FloatLiteral, |m| {
            m.optional(|m| m.eat_if(is_sign))
                && (m.attempt(|m| {
                    m.digits()
                        && m.eat('.')
                        && m.optional(|m| m.digits())
                        && m.optional(|m| m.exponent())
                }) || m.attempt(|m| m.digits() && m.exponent())
                    || m.attempt(|m| m.eat('.') && m.digits() && m.optional(|m| m.exponent())))
        })
    }

    fn exponent(&mut self) -> bool {
        self.rule(Rule::Exponent, |m| {
            m.eat_if(|c| c == 'e' || c == 'E') && m.optional(|m| m.eat_if(is_sign)) && m.digits()
        })
    }

    /// `[0-9] ('_'* [0-9])*`
    fn digits(&mut self) -> bool {
        self.eat_if(|c| c.is_ascii_digit())
            && self.zero_or_more(|m| {
                m.zero_or_more(|m| m.eat('_')) && m.eat_if(|c| c.is_ascii_digit())
            })
    }

    fn integer_literal(&mut self) -> bool {
        self.rule(Rule::IntegerLiteral, |m| {
            m.optional(|m| m.eat_if(is_sign))
                && (m.attempt(|m| {
                    m.eat('0') && m.eat_if(|c| c == 'x' || c == 'X') && m.hex_numeral()
                }) || m.decimal_numeral())
                && m.optional(|m| m.eat_if(|c| c == 'u' || c == 'U'))
        })
    }

    fn hex_numeral(&mut self) -> bool {
        self.rule(Rule::HexNumeral, |m| {
            m.attempt(|m| {
                m.eat_if(|c| c.is_ascii_hexdigit())
                    && m.zero_or_more(|m| {
                        m.zero_or_more(|m| m.eat('_')) && m.eat_if(|c| c.is_ascii_hexdigit())
                    })
            }) || m.eat('0')
        })
    }

    fn decimal_numeral(&mut self) -> bool {
        self.rule(Rule::DecimalNumeral, |m| {
            m.attempt(|m| {
                m.eat_if(|c| ('1'..='9').contains(&c))
                    && m.zero_or_more(|m| {
                        m.zero_or_more(|m| m.eat('_')) && m.eat_if(|c| c.is_ascii_digit())
                    })
            }) || m.eat('0')
        })
    }

    fn long_string_literal(&mut self) -> bool {
        self.rule(Rule::LongStringLiteral, |m| {
            m.eat_str("\"\"\"")
                && m.zero_or_more(|m| m.not_ahead(|m| m.eat('"')) && m.bump())
                && m.eat_str("\"\"\"")
        })
    }

    fn string_literal(&mut self) -> bool {
        self.rule(Rule::StringLiteral, |m| {
            m.eat('"') && m.zero_or_more(|m| m.string_char()) && m.eat('"')
        })
    }

    fn string_char(&mut self) -> bool {
        self.u_char()
            || self.escape()
            || self.hex_byte()
            || self.attempt(|m| {
                m.not_ahead(|m| m.eat_if(|c| matches!(c, '\\' | '\n' | '"'))) && m.bump()
            })
    }

    fn hex_byte(&mut self) -> bool {
        self.rule(Rule::HexByte, |m| {
            m.eat('\\') && m.eat('x') && m.eat_hex_digits(2)
        })
    }

    fn u_char(&mut self) -> bool {
        self.rule(Rule::UChar, |m| {
            m.attempt(|m| m.eat('\\') && m.eat('u') && m.eat_hex_digits(4))
                || m.attempt(|m| m.eat('\\') && m.eat('U') && m.eat_hex_digits(8))
        })
    }

    fn escape(&mut self) -> bool {
        self.rule(Rule::Escape, |m| {
            m.eat('\\')
                && m.eat_if(|c| {
                    matches!(c, '\'' | '"' | '\\' | 'v' | 't' | 'r' | 'n' | 'f' | 'b' | 'a')
                })
        })
    }
}
