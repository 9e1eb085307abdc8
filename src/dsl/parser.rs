//! Parser for relationship queries using chumsky.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! query    := or_expr
//! or_expr  := and_expr ("or" and_expr)*
//! and_expr := atom ("and" atom)*
//! atom     := "(" or_expr ")"
//!           | attr "not"? "in" "(" literal ("," literal)* ")"
//!           | attr "is" "not"? "null"
//!           | attr "equalsEdgePoint"
//!           | operand relop operand
//! operand  := attr | literal
//! attr     := ("this" | Ident) "." Ident
//! ```

use chumsky::input::ValueInput;
use chumsky::prelude::*;

use super::ast::*;
use super::lexer::Token;
use super::span::Spanned;

/// Convert a SimpleSpan to our Span type (Range<usize>)
fn to_span(span: SimpleSpan) -> std::ops::Range<usize> {
    span.start..span.end
}

/// Create the query parser.
///
/// Generic over any `ValueInput` producing `Token` values with
/// `SimpleSpan` spans.
pub fn parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Spanned<Expr>, extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    // ==========================================================================
    // Basic token parsers
    // ==========================================================================

    let ident = select! {
        Token::Ident(s) => s.to_string(),
    }
    .labelled("identifier");

    let owner = just(Token::This)
        .to(Owner::This)
        .or(ident.clone().map(Owner::Type));

    let attr = owner
        .then_ignore(just(Token::Dot))
        .then(ident.clone())
        .map_with(|(owner, attribute), e| {
            Spanned::new(AttributeRef { owner, attribute }, to_span(e.span()))
        })
        .labelled("attribute reference");

    let literal = select! {
        Token::StringLit(s) => Literal::String(s.to_string()),
        Token::Number(s) => Literal::Number(s.to_string()),
        Token::True => Literal::Boolean(true),
        Token::False => Literal::Boolean(false),
        Token::Param(s) => Literal::Param(s.to_string()),
    }
    .map_with(|l, e| Spanned::new(l, to_span(e.span())))
    .labelled("literal");

    let operand = attr
        .clone()
        .map(|r| r.map(Operand::Attribute))
        .or(literal.clone().map(|l| l.map(Operand::Literal)));

    let rel_op = select! {
        Token::Eq => RelOp::Eq,
        Token::NotEq => RelOp::NotEq,
        Token::Lt => RelOp::Lt,
        Token::Gt => RelOp::Gt,
        Token::LtEq => RelOp::LtEq,
        Token::GtEq => RelOp::GtEq,
    }
    .labelled("comparison operator");

    let negation = just(Token::Not).or_not().map(|n| n.is_some());

    // ==========================================================================
    // Expressions
    // ==========================================================================

    let expr = recursive(|expr| {
        let group = expr.delimited_by(just(Token::LParen), just(Token::RParen));

        let in_list = attr
            .clone()
            .then(negation.clone())
            .then_ignore(just(Token::In))
            .then(
                literal
                    .clone()
                    .separated_by(just(Token::Comma))
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|((attribute, negated), values)| Expr::In {
                attribute,
                negated,
                values,
            });

        let is_null = attr
            .clone()
            .then_ignore(just(Token::Is))
            .then(negation.clone())
            .then_ignore(just(Token::Null))
            .map(|(attribute, negated)| Expr::IsNull { attribute, negated });

        let edge_point = attr
            .clone()
            .then_ignore(just(Token::EqualsEdgePoint))
            .map(|attribute| Expr::EqualsEdgePoint { attribute });

        let compare = operand
            .clone()
            .then(rel_op)
            .then(operand.clone())
            .map(|((left, op), right)| Expr::Compare { left, op, right });

        let atom = choice((in_list, is_null, edge_point, compare))
            .map_with(|ex, e| Spanned::new(ex, to_span(e.span())))
            .or(group);

        let and_expr = atom
            .separated_by(just(Token::And))
            .at_least(1)
            .collect::<Vec<_>>()
            .map_with(|mut items: Vec<Spanned<Expr>>, e| {
                if items.len() == 1 {
                    items.remove(0)
                } else {
                    Spanned::new(Expr::And(items), to_span(e.span()))
                }
            });

        and_expr
            .separated_by(just(Token::Or))
            .at_least(1)
            .collect::<Vec<_>>()
            .map_with(|mut items: Vec<Spanned<Expr>>, e| {
                if items.len() == 1 {
                    items.remove(0)
                } else {
                    Spanned::new(Expr::Or(items), to_span(e.span()))
                }
            })
    });

    expr.then_ignore(end())
}
