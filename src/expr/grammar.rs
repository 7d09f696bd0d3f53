//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ExprError;
use crate::expr::ast::*;
use crate::expr::lexer::Token;

/// Postfix accessors chained after a primary expression
#[derive(Debug, Clone)]
enum Access {
    Member(String),
    Index(Expr),
}

/// Parse a data-expr source string into an expression tree
pub fn parse(input: &str) -> Result<Expr, Vec<ExprError>> {
    let len = input.len();

    let token_iter = crate::expr::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expr_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let literal = select! {
            Token::Number(n) => Literal::Number(n),
            Token::Str(s) => Literal::Str(s),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
            Token::Undefined => Literal::Undefined,
        }
        .map(Expr::Literal)
        .labelled("literal");

        let ident = select! { Token::Ident(s) => s }.labelled("identifier");

        let primary = choice((
            literal,
            ident.clone().map(Expr::Ident),
            expr.clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ));

        // a.b, a[b]
        let access = choice((
            just(Token::Dot).ignore_then(ident).map(Access::Member),
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Access::Index),
        ));
        let postfix = primary.foldl(access.repeated(), |object, access| match access {
            Access::Member(field) => Expr::Member(Box::new(object), field),
            Access::Index(key) => Expr::Index(Box::new(object), Box::new(key)),
        });

        // !a, -a, +a (right associative)
        let unary_op = choice((
            just(Token::Bang).to(UnaryOp::Not),
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Plus).to(UnaryOp::Plus),
        ));
        let unary = unary_op
            .repeated()
            .foldr(postfix, |op, operand| Expr::unary(op, operand))
            .boxed();

        let product_op = choice((
            just(Token::Star).to(BinaryOp::Mul),
            just(Token::Slash).to(BinaryOp::Div),
            just(Token::Percent).to(BinaryOp::Rem),
        ));
        let product = unary
            .clone()
            .foldl(product_op.then(unary).repeated(), |lhs, (op, rhs)| {
                Expr::binary(lhs, op, rhs)
            });

        let sum_op = choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ));
        let sum = product
            .clone()
            .foldl(sum_op.then(product).repeated(), |lhs, (op, rhs)| {
                Expr::binary(lhs, op, rhs)
            });

        let compare_op = choice((
            just(Token::LessOrEqual).to(BinaryOp::LessOrEqual),
            just(Token::GreaterOrEqual).to(BinaryOp::GreaterOrEqual),
            just(Token::Less).to(BinaryOp::Less),
            just(Token::Greater).to(BinaryOp::Greater),
        ));
        let comparison = sum
            .clone()
            .foldl(compare_op.then(sum).repeated(), |lhs, (op, rhs)| {
                Expr::binary(lhs, op, rhs)
            });

        let equality_op = choice((
            just(Token::StrictEq).to(BinaryOp::StrictEq),
            just(Token::StrictNotEq).to(BinaryOp::StrictNotEq),
            just(Token::Eq).to(BinaryOp::Eq),
            just(Token::NotEq).to(BinaryOp::NotEq),
        ));
        let equality = comparison
            .clone()
            .foldl(equality_op.then(comparison).repeated(), |lhs, (op, rhs)| {
                Expr::binary(lhs, op, rhs)
            })
            .boxed();

        let and = equality.clone().foldl(
            just(Token::And).to(BinaryOp::And).then(equality).repeated(),
            |lhs, (op, rhs)| Expr::binary(lhs, op, rhs),
        );

        let or = and
            .clone()
            .foldl(
                just(Token::Or).to(BinaryOp::Or).then(and).repeated(),
                |lhs, (op, rhs)| Expr::binary(lhs, op, rhs),
            )
            .boxed();

        // c ? a : b, with both branches parsed as full expressions
        or.then(
            just(Token::Question)
                .ignore_then(expr.clone())
                .then_ignore(just(Token::Colon))
                .then(expr)
                .or_not(),
        )
        .map(|(test, branches)| match branches {
            Some((consequent, alternate)) => Expr::Conditional(
                Box::new(test),
                Box::new(consequent),
                Box::new(alternate),
            ),
            None => test,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum_field(field: &str) -> Expr {
        Expr::Member(Box::new(Expr::Ident("datum".to_string())), field.to_string())
    }

    #[test]
    fn test_member_comparison() {
        let expr = parse("datum.value > 10").expect("Should parse");
        assert_eq!(
            expr,
            Expr::binary(
                datum_field("value"),
                BinaryOp::Greater,
                Expr::Literal(Literal::Number(10.0))
            )
        );
    }

    #[test]
    fn test_precedence_of_and_over_or() {
        let expr = parse("datum.a || datum.b && datum.c").expect("Should parse");
        assert_eq!(
            expr,
            Expr::binary(
                datum_field("a"),
                BinaryOp::Or,
                Expr::binary(datum_field("b"), BinaryOp::And, datum_field("c"))
            )
        );
    }

    #[test]
    fn test_product_binds_tighter_than_sum() {
        let expr = parse("1 + 2 * 3").expect("Should parse");
        assert_eq!(
            expr,
            Expr::binary(
                Expr::Literal(Literal::Number(1.0)),
                BinaryOp::Add,
                Expr::binary(
                    Expr::Literal(Literal::Number(2.0)),
                    BinaryOp::Mul,
                    Expr::Literal(Literal::Number(3.0))
                )
            )
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let expr = parse("5 - 2 - 1").expect("Should parse");
        assert_eq!(
            expr,
            Expr::binary(
                Expr::binary(
                    Expr::Literal(Literal::Number(5.0)),
                    BinaryOp::Sub,
                    Expr::Literal(Literal::Number(2.0))
                ),
                BinaryOp::Sub,
                Expr::Literal(Literal::Number(1.0))
            )
        );
    }

    #[test]
    fn test_computed_member_and_unary() {
        let expr = parse(r#"!datum["is open"]"#).expect("Should parse");
        assert_eq!(
            expr,
            Expr::unary(
                UnaryOp::Not,
                Expr::Index(
                    Box::new(Expr::Ident("datum".to_string())),
                    Box::new(Expr::Literal(Literal::Str("is open".to_string())))
                )
            )
        );
    }

    #[test]
    fn test_conditional() {
        let expr = parse("datum.x ? 1 : 2").expect("Should parse");
        assert!(matches!(expr, Expr::Conditional(..)));
    }

    #[test]
    fn test_parenthesized_grouping() {
        let expr = parse("(1 + 2) * 3").expect("Should parse");
        assert!(matches!(expr, Expr::Binary(_, BinaryOp::Mul, _)));
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        let errs = parse("datum.a datum.b").unwrap_err();
        assert!(!errs.is_empty());
        assert!(matches!(errs[0], ExprError::Syntax { .. }));
    }

    #[test]
    fn test_unrecognized_character_reports_span() {
        let errs = parse("datum.a # 3").unwrap_err();
        match &errs[0] {
            ExprError::Syntax { span, message, .. } => {
                assert_eq!(span.clone(), 8..9);
                assert!(message.contains("unrecognized character"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
