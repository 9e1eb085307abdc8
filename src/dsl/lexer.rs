//! Lexer for the relationship query language.
//!
//! Converts join expressions such as
//! `this.customerId = Customer.id and Customer.status = "ACTIVE"` into a
//! sequence of tokens with span information.

use chumsky::prelude::*;

/// A token in a relationship query.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // ========================================================================
    // Keywords
    // ========================================================================
    This,
    And,
    Or,
    In,
    Not,
    Is,
    Null,
    True,
    False,
    EqualsEdgePoint,

    // ========================================================================
    // Literals and identifiers
    // ========================================================================
    Ident(&'src str),
    StringLit(&'src str),
    Number(&'src str),
    /// `{name}`, a value supplied at call time.
    Param(&'src str),

    // ========================================================================
    // Symbols
    // ========================================================================
    Dot,
    Comma,
    LParen,
    RParen,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl<'src> std::fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::This => write!(f, "this"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::In => write!(f, "in"),
            Token::Not => write!(f, "not"),
            Token::Is => write!(f, "is"),
            Token::Null => write!(f, "null"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::EqualsEdgePoint => write!(f, "equalsEdgePoint"),

            Token::Ident(s) => write!(f, "{}", s),
            Token::StringLit(s) => write!(f, "\"{}\"", s),
            Token::Number(s) => write!(f, "{}", s),
            Token::Param(s) => write!(f, "{{{}}}", s),

            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eq => write!(f, "="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
        }
    }
}

/// Map an identifier to a keyword token if it is one.
///
/// Boolean connectives are accepted in any case (`and`, `AND`); `this` and
/// `equalsEdgePoint` are case-sensitive.
fn keyword_or_ident(s: &str) -> Token<'_> {
    match s {
        "this" => return Token::This,
        "equalsEdgePoint" => return Token::EqualsEdgePoint,
        _ => {}
    }
    match s.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "in" => Token::In,
        "not" => Token::Not,
        "is" => Token::Is,
        "null" => Token::Null,
        "true" => Token::True,
        "false" => Token::False,
        _ => Token::Ident(s),
    }
}

/// Create a lexer for relationship queries.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    let ident = text::ident().map(keyword_or_ident);

    // String literals: "..." (single quotes are accepted too)
    let double_quoted = just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'));
    let single_quoted = just('\'')
        .ignore_then(none_of('\'').repeated().to_slice())
        .then_ignore(just('\''));
    let string_lit = double_quoted.or(single_quoted).map(Token::StringLit);

    // Numbers: optional sign, digits, optional fraction
    let number = just('-')
        .or_not()
        .then(text::digits(10))
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(Token::Number);

    // Parameter literals: {name}
    let param = just('{')
        .ignore_then(text::ident().padded())
        .then_ignore(just('}'))
        .map(Token::Param);

    // Symbols (multi-char first, then single-char)
    let symbol = choice((
        just("<=").to(Token::LtEq),
        just(">=").to(Token::GtEq),
        just("!=").to(Token::NotEq),
        just("<>").to(Token::NotEq),
        just("==").to(Token::Eq),
        just('=').to(Token::Eq),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
    ));

    let token = choice((ident, string_lit, number, param, symbol)).map_with(|tok, e| (tok, e.span()));

    token
        .padded()
        .repeated()
        .collect()
        .padded()
        .then_ignore(end())
}

/// Lex a query string into tokens.
///
/// Returns Ok with the token list on success, or Err with the lexer errors.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, SimpleSpan)>, Vec<Rich<'_, char>>> {
    let (tokens, errs) = lexer().parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}
