//! Infix formula text, as carried by Level 1 `formula` attributes.
//!
//! Grammar, lowest precedence first: `+ -`, `* /`, unary `-`, `^` (right
//! associative), then numbers, names, calls and parentheses. Built-in
//! functions use their call spelling (`exp(x)`, `log(x)` for the natural
//! log, `log10(x)`); any other call names a user function.

use super::MathError;
use super::ast::{Constant, MathNode, Operator};
use crate::xml::format_real;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Name(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, MathError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            tokens.push((start, Token::Number(chars[start..i].iter().collect())));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push((start, Token::Name(chars[start..i].iter().collect())));
            continue;
        }
        let token = match c {
            '+' | '-' | '*' | '/' | '^' => Token::Op(c),
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => {
                return Err(MathError::Syntax {
                    position: start,
                    message: format!("unexpected character '{other}'"),
                });
            }
        };
        tokens.push((start, token));
        i += 1;
    }
    Ok(tokens)
}

/// Deepest nesting of parentheses, calls and unary signs accepted.
const MAX_NESTING: usize = 256;

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    len: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.len)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> MathError {
        MathError::Syntax {
            position: self.offset(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), MathError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expression(&mut self) -> Result<MathNode, MathError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = match (op, lhs) {
                ('+', MathNode::Apply { op: Operator::Plus, mut args }) => {
                    args.push(rhs);
                    MathNode::apply(Operator::Plus, args)
                }
                ('+', lhs) => MathNode::apply(Operator::Plus, vec![lhs, rhs]),
                (_, lhs) => MathNode::apply(Operator::Minus, vec![lhs, rhs]),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<MathNode, MathError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = match (op, lhs) {
                ('*', MathNode::Apply { op: Operator::Times, mut args }) => {
                    args.push(rhs);
                    MathNode::apply(Operator::Times, args)
                }
                ('*', lhs) => MathNode::apply(Operator::Times, vec![lhs, rhs]),
                (_, lhs) => MathNode::apply(Operator::Divide, vec![lhs, rhs]),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<MathNode, MathError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("formula is nested too deeply"));
        }
        self.depth += 1;
        let node = self.signed();
        self.depth -= 1;
        node
    }

    fn signed(&mut self) -> Result<MathNode, MathError> {
        if self.peek() == Some(&Token::Op('-')) {
            self.pos += 1;
            let operand = self.unary()?;
            return Ok(MathNode::apply(Operator::Minus, vec![operand]));
        }
        if self.peek() == Some(&Token::Op('+')) {
            self.pos += 1;
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<MathNode, MathError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Op('^')) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(MathNode::apply(Operator::Power, vec![base, exponent]));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<MathNode, MathError> {
        match self.next() {
            Some(Token::Number(text)) => parse_number(&text).ok_or_else(|| MathError::Syntax {
                position: self.tokens[self.pos - 1].0,
                message: format!("invalid number '{text}'"),
            }),
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.arguments()?;
                    return Ok(call(name, args));
                }
                Ok(Constant::from_infix(&name)
                    .map(MathNode::Constant)
                    .unwrap_or(MathNode::Identifier(name)))
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(_) => {
                self.pos -= 1;
                Err(self.error("expected a number, name or '('"))
            }
            None => Err(self.error("unexpected end of formula")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<MathNode>, MathError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                _ => {
                    self.pos -= 1;
                    return Err(self.error("expected ',' or ')'"));
                }
            }
        }
    }
}

fn parse_number(text: &str) -> Option<MathNode> {
    if text.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(v) = text.parse::<i64>() {
            return Some(MathNode::Integer(v));
        }
    }
    text.parse::<f64>().ok().map(MathNode::Real)
}

fn call(name: String, mut args: Vec<MathNode>) -> MathNode {
    if name == "lambda" {
        if let Some(body) = args.pop() {
            let params: Option<Vec<String>> = args
                .iter()
                .map(|a| match a {
                    MathNode::Identifier(p) => Some(p.clone()),
                    _ => None,
                })
                .collect();
            match params {
                Some(params) => {
                    return MathNode::Lambda {
                        params,
                        body: Box::new(body),
                    };
                }
                None => args.push(body),
            }
        }
    }
    match Operator::from_function_name(&name) {
        Some(op) => MathNode::apply(op, args),
        None => MathNode::Call {
            function: name,
            args,
        },
    }
}

/// Parses infix formula text.
pub fn parse_formula(text: &str) -> Result<MathNode, MathError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(MathError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: text.len(),
        depth: 0,
    };
    let node = parser.expression()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(node)
}

const PREC_SUM: u8 = 1;
const PREC_PRODUCT: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_POWER: u8 = 4;
const PREC_ATOM: u8 = 5;

fn precedence(node: &MathNode) -> u8 {
    match node {
        MathNode::Apply { op, args } => match op {
            Operator::Plus if args.len() > 1 => PREC_SUM,
            Operator::Minus if args.len() == 1 => PREC_UNARY,
            Operator::Minus => PREC_SUM,
            Operator::Times | Operator::Divide if args.len() > 1 => PREC_PRODUCT,
            Operator::Power => PREC_POWER,
            _ => PREC_ATOM,
        },
        MathNode::Integer(v) if *v < 0 => PREC_UNARY,
        MathNode::Real(v) if *v < 0.0 => PREC_UNARY,
        _ => PREC_ATOM,
    }
}

fn wrap(node: &MathNode, min: u8) -> String {
    let text = format_formula(node);
    if precedence(node) < min {
        format!("({text})")
    } else {
        text
    }
}

fn join_args(args: &[MathNode]) -> String {
    args.iter().map(format_formula).collect::<Vec<_>>().join(", ")
}

/// Renders a tree as infix text with the fewest parentheses that preserve
/// its structure.
pub fn format_formula(node: &MathNode) -> String {
    match node {
        MathNode::Integer(v) => v.to_string(),
        MathNode::Real(v) => format_real(*v),
        MathNode::Rational {
            numerator,
            denominator,
        } => format!("({numerator}/{denominator})"),
        MathNode::Identifier(name) => name.clone(),
        MathNode::Time => "time".to_string(),
        MathNode::Constant(c) => c.infix_name().to_string(),
        MathNode::Call { function, args } => format!("{function}({})", join_args(args)),
        MathNode::Lambda { params, body } => {
            let mut parts: Vec<String> = params.clone();
            parts.push(format_formula(body));
            format!("lambda({})", parts.join(", "))
        }
        MathNode::Apply { op, args } => match (op, args.as_slice()) {
            (Operator::Plus, [_, _, ..]) => args
                .iter()
                .map(|a| wrap(a, PREC_SUM))
                .collect::<Vec<_>>()
                .join(" + "),
            (Operator::Minus, [operand]) => format!("-{}", wrap(operand, PREC_UNARY + 1)),
            (Operator::Minus, [lhs, rhs]) => {
                format!("{} - {}", wrap(lhs, PREC_SUM), wrap(rhs, PREC_SUM + 1))
            }
            (Operator::Times, [_, _, ..]) => args
                .iter()
                .map(|a| wrap(a, PREC_PRODUCT))
                .collect::<Vec<_>>()
                .join(" * "),
            (Operator::Divide, [lhs, rhs]) => {
                format!("{} / {}", wrap(lhs, PREC_PRODUCT), wrap(rhs, PREC_PRODUCT + 1))
            }
            (Operator::Power, [base, exponent]) => {
                format!("{}^{}", wrap(base, PREC_POWER + 1), wrap(exponent, PREC_POWER))
            }
            (op, args) => format!("{}({})", op.function_name(), join_args(args)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(text: &str) -> String {
        format_formula(&parse_formula(text).expect("parse"))
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(roundtrip("a + b * c"), "a + b * c");
        assert_eq!(roundtrip("(a + b) * c"), "(a + b) * c");
        assert_eq!(roundtrip("a - (b - c)"), "a - (b - c)");
        assert_eq!(roundtrip("a - b - c"), "a - b - c");
        assert_eq!(roundtrip("a / (b * c)"), "a / (b * c)");
        assert_eq!(roundtrip("a ^ b ^ c"), "a^b^c");
        assert_eq!(roundtrip("(a ^ b) ^ c"), "(a^b)^c");
        assert_eq!(roundtrip("-(a + b)"), "-(a + b)");
    }

    #[test]
    fn rate_law_parses_into_a_division() {
        let node = parse_formula("(vm * s1)/(km + s1)").expect("parse");
        let MathNode::Apply { op, args } = &node else {
            panic!("expected apply");
        };
        assert_eq!(*op, Operator::Divide);
        assert_eq!(args.len(), 2);
        assert_eq!(format_formula(&node), "vm * s1 / (km + s1)");
    }

    #[test]
    fn calls_map_to_builtins_or_user_functions() {
        assert_eq!(
            parse_formula("exp(x)").expect("parse"),
            MathNode::apply(Operator::Exp, vec![MathNode::ident("x")])
        );
        assert_eq!(
            parse_formula("f(x, 2)").expect("parse"),
            MathNode::Call {
                function: "f".to_string(),
                args: vec![MathNode::ident("x"), MathNode::Integer(2)],
            }
        );
        assert_eq!(roundtrip("log(x) + log10(y)"), "log(x) + log10(y)");
    }

    #[test]
    fn lambda_calls_bind_their_parameters() {
        let parsed = parse_formula("lambda(x, y, x * y)").expect("parse");
        assert!(matches!(&parsed, MathNode::Lambda { params, .. } if params.len() == 2));
        assert!(parsed.free_identifiers().is_empty());
        assert_eq!(roundtrip("lambda(x, x + 1)"), "lambda(x, x + 1)");
    }

    #[test]
    fn numbers_keep_integer_and_real_forms() {
        assert_eq!(parse_formula("3").expect("parse"), MathNode::Integer(3));
        assert_eq!(parse_formula("2.5").expect("parse"), MathNode::Real(2.5));
        assert_eq!(parse_formula("1e-3").expect("parse"), MathNode::Real(1e-3));
        assert_eq!(parse_formula("pi").expect("parse"), MathNode::Constant(Constant::Pi));
    }

    #[test]
    fn syntax_errors_report_offsets() {
        assert_eq!(parse_formula("   "), Err(MathError::Empty));
        assert!(matches!(
            parse_formula("a + "),
            Err(MathError::Syntax { .. })
        ));
        assert!(matches!(
            parse_formula("a $ b"),
            Err(MathError::Syntax { position: 2, .. })
        ));
        assert!(parse_formula("f(a b)").is_err());
        assert!(parse_formula("(a").is_err());
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let deep = format!("{}x{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(
            parse_formula(&deep),
            Err(MathError::Syntax { message, .. }) if message.contains("nested too deeply")
        ));
        let signs = format!("{}x", "-".repeat(10_000));
        assert!(parse_formula(&signs).is_err());

        let shallow = format!("{}x{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse_formula(&shallow), Ok(MathNode::ident("x")));
    }
}
