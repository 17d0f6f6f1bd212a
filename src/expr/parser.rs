//! Recursive descent parser: expression text → [`Expr`].
//!
//! The parser is hand-rolled for full control over error messages and the
//! small fixed grammar:
//!
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := atom (('**' | '^') unary)?
//! atom    := number | ident '(' sum ')' | ident | '(' sum ')'
//! ```
//!
//! `**` is right-associative and its exponent may carry a sign, so `x**-2`
//! and `2**3**2` parse the way they read. Unary minus binds looser than `**`:
//! `-x**2` is `-(x**2)`.

use miette::SourceSpan;

use super::{Expr, Func, rational};
use crate::error::{ExprError, ExprResult};

/// Byte-level source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.end - span.start).into()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    End,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Plus => "'+'".into(),
            TokenKind::Minus => "'-'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Slash => "'/'".into(),
            TokenKind::Caret => "'**'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::End => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    span: Span,
}

fn tokenize(input: &str) -> ExprResult<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let kind = if c.is_ascii_digit() || c == '.' {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            TokenKind::Number(input[start..i].to_string())
        } else if c.is_ascii_alphabetic() || c == '_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            TokenKind::Ident(input[start..i].to_string())
        } else {
            i += 1;
            match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' if bytes.get(i) == Some(&b'*') => {
                    i += 1;
                    TokenKind::Caret
                }
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '^' => TokenKind::Caret,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                _ => {
                    // Report the whole (possibly multi-byte) character.
                    let ch = input[start..].chars().next().unwrap_or(c);
                    return Err(ExprError::UnexpectedChar {
                        ch,
                        src: input.to_string(),
                        span: (start, ch.len_utf8()).into(),
                    });
                }
            }
        };

        tokens.push(Token {
            kind,
            span: Span { start, end: i },
        });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        span: Span {
            start: input.len(),
            end: input.len(),
        },
    });
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, expected: &str) -> ExprError {
        let token = &self.tokens[self.pos];
        ExprError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.describe(),
            src: self.input.to_string(),
            span: token.span.into(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ExprResult<()> {
        if *self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn sum(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.product()?;
        loop {
            match self.peek() {
                TokenKind::Plus => {
                    self.advance();
                    lhs = Expr::add(lhs, self.product()?);
                }
                TokenKind::Minus => {
                    self.advance();
                    lhs = Expr::sub(lhs, self.product()?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn product(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                TokenKind::Star => {
                    self.advance();
                    lhs = Expr::mul(lhs, self.unary()?);
                }
                TokenKind::Slash => {
                    self.advance();
                    lhs = Expr::div(lhs, self.unary()?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> ExprResult<Expr> {
        match self.peek() {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::neg(self.unary()?))
            }
            TokenKind::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> ExprResult<Expr> {
        let base = self.atom()?;
        if *self.peek() == TokenKind::Caret {
            self.advance();
            let exp = self.unary()?;
            return Ok(Expr::pow(base, exp));
        }
        Ok(base)
    }

    fn atom(&mut self) -> ExprResult<Expr> {
        let at = self.pos;
        let token = self.advance();
        match token.kind {
            TokenKind::Number(literal) => {
                rational::parse_decimal(&literal)
                    .map(Expr::Num)
                    .ok_or_else(|| ExprError::InvalidNumber {
                        literal,
                        src: self.input.to_string(),
                        span: token.span.into(),
                    })
            }
            TokenKind::Ident(name) => {
                if *self.peek() != TokenKind::LParen {
                    return Ok(Expr::Var(name));
                }
                let func = Func::from_name(&name).ok_or_else(|| ExprError::UnknownFunction {
                    name: name.clone(),
                    src: self.input.to_string(),
                    span: token.span.into(),
                })?;
                self.advance();
                let arg = self.sum()?;
                self.expect(TokenKind::RParen, "')' to close the function call")?;
                Ok(Expr::call(func, arg))
            }
            TokenKind::LParen => {
                let inner = self.sum()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => {
                self.pos = at;
                Err(self.error("a number, variable or '('"))
            }
        }
    }
}

/// Parse expression text into an [`Expr`].
pub fn parse(input: &str) -> ExprResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let expr = parser.sum()?;
    if *parser.peek() != TokenKind::End {
        return Err(parser.error("an operator or end of input"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn parses_default_expression_forms() {
        assert_eq!(parse("1/x").unwrap(), Expr::div(Expr::num(1), x()));
        assert_eq!(
            parse("1/sqrt(x)").unwrap(),
            Expr::div(Expr::num(1), Expr::call(Func::Sqrt, x()))
        );
        assert_eq!(
            parse("x**-2").unwrap(),
            Expr::pow(x(), Expr::neg(Expr::num(2)))
        );
        assert_eq!(
            parse("exp(-x)").unwrap(),
            Expr::call(Func::Exp, Expr::neg(x()))
        );
    }

    #[test]
    fn precedence_and_associativity() {
        // -x**2 is -(x**2)
        assert_eq!(
            parse("-x**2").unwrap(),
            Expr::neg(Expr::pow(x(), Expr::num(2)))
        );
        // ** is right-associative
        assert_eq!(
            parse("2**3**2").unwrap(),
            Expr::pow(Expr::num(2), Expr::pow(Expr::num(3), Expr::num(2)))
        );
        // * and / are left-associative
        assert_eq!(
            parse("a/b*c").unwrap(),
            Expr::mul(Expr::div(Expr::var("a"), Expr::var("b")), Expr::var("c"))
        );
        assert_eq!(
            parse("a - b + c").unwrap(),
            Expr::add(Expr::sub(Expr::var("a"), Expr::var("b")), Expr::var("c"))
        );
        assert_eq!(parse("x^2").unwrap(), parse("x**2").unwrap());
    }

    #[test]
    fn decimals_become_exact_rationals() {
        assert_eq!(
            parse("x**0.5").unwrap(),
            Expr::pow(x(), Expr::Num(rational::HALF))
        );
    }

    #[test]
    fn unbalanced_parens_report_a_span() {
        let err = parse("sqrt(x").unwrap_err();
        match err {
            ExprError::UnexpectedToken { found, span, .. } => {
                assert_eq!(found, "end of input");
                assert_eq!(span.offset(), 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            parse("x $ 2"),
            Err(ExprError::UnexpectedChar { ch: '$', .. })
        ));
        assert!(matches!(
            parse("gamma(x)"),
            Err(ExprError::UnknownFunction { .. })
        ));
        assert!(matches!(
            parse("1.2.3"),
            Err(ExprError::InvalidNumber { .. })
        ));
        assert!(matches!(parse(""), Err(ExprError::UnexpectedToken { .. })));
        assert!(matches!(parse("x y"), Err(ExprError::UnexpectedToken { .. })));
        assert!(matches!(parse("x *"), Err(ExprError::UnexpectedToken { .. })));
    }
}
