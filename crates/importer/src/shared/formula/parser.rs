//! Recursive-descent parser for the formula grammar:
//!
//! ```text
//! expr    := sum
//! sum     := product (("+" | "-") product)*
//! product := unary (("*" | "/" | "//" | "%") unary)*
//! unary   := ("-" | "+") unary | power
//! power   := atom ("**" unary)?
//! atom    := NUMBER | STRING | FSTRING | NAME | NAME "(" args? ")" | "(" expr ")"
//! ```

use super::ast::{BinaryOp, Expr, FormatSpec, InterpolationPart, UnaryOp};
use super::functions::Function;
use super::lexer::{tokenize, unescape, Token, TokenKind};
use super::value::Value;
use super::FormulaErrorKind;

const MAX_DEPTH: usize = 64;
/// Flat operator chains build one tree node per operand.
const MAX_TOKENS: usize = 1024;

pub fn parse(source: &str) -> Result<Expr, FormulaErrorKind> {
    parse_nested(source, 0)
}

fn parse_nested(source: &str, depth: usize) -> Result<Expr, FormulaErrorKind> {
    if source.trim().is_empty() {
        return Err(FormulaErrorKind::Syntax {
            position: 0,
            message: "empty expression".to_string(),
        });
    }
    let tokens = tokenize(source)?;
    if tokens.len() > MAX_TOKENS {
        return Err(FormulaErrorKind::Syntax {
            position: tokens[MAX_TOKENS].pos,
            message: format!("expression is too long (more than {} tokens)", MAX_TOKENS),
        });
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        TokenKind::Eof => Ok(expr),
        _ => Err(parser.unexpected()),
    }
}

/// Name of a rejected construct for a forbidden symbol
fn forbidden_construct(symbol: &str) -> &'static str {
    match symbol {
        "." => "attribute access",
        "[" | "]" => "indexing",
        "=" | ":=" => "assignment",
        "==" | "!=" | "<" | ">" | "<=" | ">=" => "comparison",
        "&" | "|" | "^" | "~" | "<<" | ">>" => "bitwise operator",
        "{" | "}" => "set or dict literal",
        ":" => "slice, annotation or lambda",
        ";" => "statement separator",
        "@" => "decorator",
        "->" => "annotation",
        _ => "unsupported syntax",
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn position(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].pos
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn unexpected(&self) -> FormulaErrorKind {
        match self.peek() {
            TokenKind::Forbidden(sym) => FormulaErrorKind::Forbidden(forbidden_construct(sym).to_string()),
            TokenKind::Keyword(k) => FormulaErrorKind::Forbidden(format!("keyword '{}'", k)),
            other => FormulaErrorKind::Syntax {
                position: self.position(),
                message: format!("unexpected {}", other.describe()),
            },
        }
    }

    fn enter(&mut self) -> Result<(), FormulaErrorKind> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaErrorKind::Syntax {
                position: self.position(),
                message: "expression is nested too deeply".to_string(),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expr(&mut self) -> Result<Expr, FormulaErrorKind> {
        self.enter()?;
        let result = self.sum();
        self.leave();
        result
    }

    fn sum(&mut self) -> Result<Expr, FormulaErrorKind> {
        let mut left = self.product()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.product()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn product(&mut self) -> Result<Expr, FormulaErrorKind> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::DoubleSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaErrorKind> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn power(&mut self) -> Result<Expr, FormulaErrorKind> {
        let base = self.atom()?;
        if matches!(self.peek(), TokenKind::DoubleStar) {
            self.advance();
            self.enter()?;
            let exponent = self.unary();
            self.leave();
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent?),
            });
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, FormulaErrorKind> {
        let position = self.position();
        let expr = match self.peek().clone() {
            TokenKind::Int(i) => {
                self.advance();
                Expr::Literal(Value::Int(i))
            }
            TokenKind::Float(f) => {
                self.advance();
                Expr::Literal(Value::Float(f))
            }
            TokenKind::Str(s) => {
                self.advance();
                Expr::Literal(Value::Str(s))
            }
            TokenKind::FStr(raw) => {
                self.advance();
                parse_fstring(&raw, position, self.depth)?
            }
            TokenKind::Name(name) => {
                self.advance();
                if matches!(self.peek(), TokenKind::LParen) {
                    self.call(&name)?
                } else {
                    Expr::Variable(name)
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                match self.peek() {
                    TokenKind::RParen => {
                        self.advance();
                    }
                    TokenKind::Comma => {
                        return Err(FormulaErrorKind::Forbidden("tuple".to_string()));
                    }
                    _ => return Err(self.unexpected()),
                }
                inner
            }
            _ => return Err(self.unexpected()),
        };

        // Postfix forms on any atom: x.attr, x[i], x(...)
        match self.peek() {
            TokenKind::Forbidden(".") => Err(FormulaErrorKind::Forbidden("attribute access".to_string())),
            TokenKind::Forbidden("[") => Err(FormulaErrorKind::Forbidden("indexing".to_string())),
            TokenKind::LParen => Err(FormulaErrorKind::Forbidden(
                "call on a non-function expression".to_string(),
            )),
            _ => Ok(expr),
        }
    }

    fn call(&mut self, name: &str) -> Result<Expr, FormulaErrorKind> {
        let function =
            Function::lookup(name).ok_or_else(|| FormulaErrorKind::UnknownFunction(name.to_string()))?;
        // consume '('
        self.advance();

        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                args.push(self.expr()?);
                match self.peek() {
                    TokenKind::Comma => {
                        self.advance();
                        if matches!(self.peek(), TokenKind::RParen) {
                            break;
                        }
                    }
                    TokenKind::RParen => break,
                    _ => return Err(self.unexpected()),
                }
            }
        }
        // consume ')'
        self.advance();

        function.check_arity(args.len())?;
        Ok(Expr::Call { function, args })
    }
}

/// Splits an f-string body into literal text and `{expr[:spec]}` parts.
fn parse_fstring(raw: &str, position: usize, depth: usize) -> Result<Expr, FormulaErrorKind> {
    let chars: Vec<char> = raw.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    let syntax = |message: &str| FormulaErrorKind::Syntax {
        position,
        message: message.to_string(),
    };

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                literal.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                literal.push('}');
                i += 2;
            }
            '}' => return Err(syntax("single '}' is not allowed in f-string")),
            '{' => {
                if !literal.is_empty() {
                    parts.push(InterpolationPart::Text(unescape(&literal)));
                    literal.clear();
                }

                let (expr_end, terminator) = scan_replacement_field(&chars, i + 1)
                    .ok_or_else(|| syntax("expecting '}' in f-string"))?;
                let inner: String = chars[i + 1..expr_end].iter().collect();
                if inner.trim().is_empty() {
                    return Err(syntax("empty expression in f-string"));
                }

                let (spec, next) = match terminator {
                    '}' => (None, expr_end + 1),
                    '!' => {
                        return Err(FormulaErrorKind::Forbidden("f-string conversion".to_string()))
                    }
                    _ => {
                        let spec_end = chars[expr_end + 1..]
                            .iter()
                            .position(|c| *c == '}' || *c == '{')
                            .map(|p| p + expr_end + 1)
                            .ok_or_else(|| syntax("expecting '}' in f-string"))?;
                        if chars[spec_end] == '{' {
                            return Err(FormulaErrorKind::Forbidden(
                                "nested format spec".to_string(),
                            ));
                        }
                        let spec_text: String = chars[expr_end + 1..spec_end].iter().collect();
                        (Some(FormatSpec::parse(&spec_text)?), spec_end + 1)
                    }
                };

                let expr = parse_nested(&inner, depth + 1)?;
                parts.push(InterpolationPart::Expr {
                    expr: Box::new(expr),
                    spec,
                });
                i = next;
            }
            c => {
                literal.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        literal.push(next);
                        i += 1;
                    }
                }
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        parts.push(InterpolationPart::Text(unescape(&literal)));
    }
    Ok(Expr::Interpolated(parts))
}

/// Finds where the expression of a replacement field ends: the index of
/// `}`, `:` or `!` at nesting depth zero, outside string literals.
fn scan_replacement_field(chars: &[char], start: usize) -> Option<(usize, char)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '}' if depth > 0 => depth -= 1,
            '}' => return Some((i, '}')),
            ':' if depth == 0 && chars.get(i + 1) != Some(&'=') => return Some((i, ':')),
            '!' if depth == 0 && chars.get(i + 1) != Some(&'=') => return Some((i, '!')),
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable(name.to_string()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a + b * c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: var("a"),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: var("b"),
                    right: var("c"),
                }),
            }
        );
    }

    #[test]
    fn test_unary_binds_looser_than_power() {
        let expr = parse("-a ** 2").unwrap();
        assert!(matches!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                ..
            }
        ));
    }

    #[test]
    fn test_call_and_arity() {
        assert!(matches!(
            parse("int(round(weight * 453.592))").unwrap(),
            Expr::Call {
                function: Function::Int,
                ..
            }
        ));
        assert!(matches!(
            parse("round(1, 2, 3)"),
            Err(FormulaErrorKind::Arity { .. })
        ));
        assert_eq!(
            parse("open('x')"),
            Err(FormulaErrorKind::UnknownFunction("open".to_string()))
        );
    }

    #[test]
    fn test_fstring_parts() {
        let expr = parse("f\"{model} | {price:.2f} {{x}}\"").unwrap();
        let Expr::Interpolated(parts) = expr else {
            panic!("expected f-string");
        };
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1], InterpolationPart::Text(" | ".to_string()));
        assert!(matches!(
            &parts[2],
            InterpolationPart::Expr { spec: Some(_), .. }
        ));
        assert_eq!(parts[3], InterpolationPart::Text(" {x}".to_string()));
    }

    #[test]
    fn test_fstring_errors() {
        assert!(parse("f'{}'").is_err());
        assert!(parse("f'{a'").is_err());
        assert!(parse("f'a }'").is_err());
        assert_eq!(
            parse("f'{a!r}'"),
            Err(FormulaErrorKind::Forbidden("f-string conversion".to_string()))
        );
        assert_eq!(
            parse("f'{a.b}'"),
            Err(FormulaErrorKind::Forbidden("attribute access".to_string()))
        );
    }

    #[test]
    fn test_rejections_name_the_construct() {
        let cases = [
            ("a.b", "attribute access"),
            ("a[0]", "indexing"),
            ("a = 1", "assignment"),
            ("a == 1", "comparison"),
            ("(a)(1)", "call on a non-function expression"),
            ("(a, b)", "tuple"),
            ("a if b else c", "keyword 'if'"),
            ("lambda x: x", "keyword 'lambda'"),
        ];
        for (src, construct) in cases {
            assert_eq!(
                parse(src),
                Err(FormulaErrorKind::Forbidden(construct.to_string())),
                "{}",
                src
            );
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(matches!(parse(&deep), Err(FormulaErrorKind::Syntax { .. })));
        assert!(parse("((1))").is_ok());
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        let long = vec!["1"; 20_000].join("+");
        match parse(&long) {
            Err(FormulaErrorKind::Syntax { message, .. }) => assert!(message.contains("too long")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(parse(&vec!["1"; 400].join("+")).is_ok());
    }

    #[test]
    fn test_empty_and_trailing() {
        assert!(parse("   ").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("1 +").is_err());
    }
}
