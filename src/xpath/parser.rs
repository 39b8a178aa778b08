//! Tokenizer and recursive-descent parser for the supported XPath subset

use crate::error::{MddfError, Result};
use crate::namespace::NamespaceContext;

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    DescendantOrSelf,
    SelfNode,
    Parent,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// `node()`, `.` and `..`
    AnyNode,
    /// `*` (elements on the child axis, any attribute on the attribute axis)
    Wildcard,
    /// Element name bound to a namespace URI
    Element { namespace: Option<String>, local: String },
    /// Attribute name as written
    Attribute(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Count(LocationPath),
    Path(LocationPath),
    Literal(String),
    Number(f64),
}

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    Star,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Op(CompareOp),
    Name(String),
    Literal(String),
    Number(f64),
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn tokenize(expression: &str) -> Result<Vec<(usize, Token)>> {
    let chars: Vec<(usize, char)> = expression.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '/' if next == Some('/') => {
                tokens.push((pos, Token::DoubleSlash));
                i += 2;
            }
            '/' => {
                tokens.push((pos, Token::Slash));
                i += 1;
            }
            '.' if next == Some('.') => {
                tokens.push((pos, Token::DotDot));
                i += 2;
            }
            '.' if next.map(|n| n.is_ascii_digit()).unwrap_or(false) => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| MddfError::path_syntax(expression, pos, "malformed number"))?;
                tokens.push((pos, Token::Number(value)));
            }
            '.' => {
                tokens.push((pos, Token::Dot));
                i += 1;
            }
            '@' => {
                tokens.push((pos, Token::At));
                i += 1;
            }
            '*' => {
                tokens.push((pos, Token::Star));
                i += 1;
            }
            '[' => {
                tokens.push((pos, Token::LBracket));
                i += 1;
            }
            ']' => {
                tokens.push((pos, Token::RBracket));
                i += 1;
            }
            '(' => {
                tokens.push((pos, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((pos, Token::RParen));
                i += 1;
            }
            '=' => {
                tokens.push((pos, Token::Op(CompareOp::Eq)));
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push((pos, Token::Op(CompareOp::Ne)));
                i += 2;
            }
            '<' if next == Some('=') => {
                tokens.push((pos, Token::Op(CompareOp::Le)));
                i += 2;
            }
            '<' => {
                tokens.push((pos, Token::Op(CompareOp::Lt)));
                i += 1;
            }
            '>' if next == Some('=') => {
                tokens.push((pos, Token::Op(CompareOp::Ge)));
                i += 2;
            }
            '>' => {
                tokens.push((pos, Token::Op(CompareOp::Gt)));
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].1 != quote {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(MddfError::path_syntax(expression, pos, "unterminated string literal"));
                }
                let text: String = chars[start..end].iter().map(|&(_, c)| c).collect();
                tokens.push((pos, Token::Literal(text)));
                i = end + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| MddfError::path_syntax(expression, pos, "malformed number"))?;
                tokens.push((pos, Token::Number(value)));
            }
            c if is_name_start(c) => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i].1) {
                    i += 1;
                }
                // prefix:local
                if i + 1 < chars.len() && chars[i].1 == ':' && is_name_start(chars[i + 1].1) {
                    i += 1;
                    while i < chars.len() && is_name_char(chars[i].1) {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                tokens.push((pos, Token::Name(text)));
            }
            other => {
                return Err(MddfError::path_syntax(
                    expression,
                    pos,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }

    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

/// Parse a fully substituted expression into a location path
pub(crate) fn parse(expression: &str, namespaces: &NamespaceContext) -> Result<LocationPath> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        expression,
        tokens,
        pos: 0,
        namespaces,
    };
    let path = parser.location_path()?;
    if let Some((offset, token)) = parser.tokens.get(parser.pos) {
        return Err(MddfError::path_syntax(
            expression,
            *offset,
            format!("unexpected {:?} after path", token),
        ));
    }
    Ok(path)
}

struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
    namespaces: &'a NamespaceContext,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(o, _)| *o)
            .unwrap_or(self.expression.len())
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, reason: impl Into<String>) -> MddfError {
        MddfError::path_syntax(self.expression, self.offset(), reason)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => {
                self.pos -= 1;
                Err(self.error(format!("expected {:?}, found {:?}", expected, t)))
            }
            None => Err(self.error(format!("expected {:?}, found end of expression", expected))),
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_))
        )
    }

    fn location_path(&mut self) -> Result<LocationPath> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                if !self.starts_step() {
                    return Ok(LocationPath { absolute: true, steps });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                steps.push(descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.advance();
                    steps.push(self.step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    steps.push(descendant_or_self());
                    steps.push(self.step()?);
                }
                _ => break,
            }
        }

        Ok(LocationPath { absolute, steps })
    }

    fn step(&mut self) -> Result<Step> {
        let (axis, test) = match self.advance() {
            Some(Token::Dot) => (Axis::SelfNode, NodeTest::AnyNode),
            Some(Token::DotDot) => (Axis::Parent, NodeTest::AnyNode),
            Some(Token::Star) => (Axis::Child, NodeTest::Wildcard),
            Some(Token::At) => match self.advance() {
                Some(Token::Name(name)) => (Axis::Attribute, NodeTest::Attribute(name)),
                Some(Token::Star) => (Axis::Attribute, NodeTest::Wildcard),
                _ => {
                    self.pos -= 1;
                    return Err(self.error("expected attribute name after '@'"));
                }
            },
            Some(Token::Name(name)) if name == "node" && self.peek() == Some(&Token::LParen) => {
                self.expect(Token::LParen)?;
                self.expect(Token::RParen)?;
                (Axis::Child, NodeTest::AnyNode)
            }
            Some(Token::Name(name)) => (Axis::Child, self.element_test(&name)?),
            _ => {
                self.pos -= 1;
                return Err(self.error("expected a location step"));
            }
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.advance();
            predicates.push(self.expr()?);
            self.expect(Token::RBracket)?;
        }

        Ok(Step { axis, test, predicates })
    }

    fn element_test(&self, name: &str) -> Result<NodeTest> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                let uri = self
                    .namespaces
                    .resolve(prefix)
                    .ok_or_else(|| MddfError::UnknownNamespace(prefix.to_string()))?;
                Ok(NodeTest::Element {
                    namespace: Some(uri.to_string()),
                    local: local.to_string(),
                })
            }
            None => Ok(NodeTest::Element {
                namespace: None,
                local: name.to_string(),
            }),
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some(Token::Name(n)) if n == "or") {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;
        while matches!(self.peek(), Some(Token::Name(n)) if n == "and") {
            self.advance();
            let right = self.comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.primary()?;
        if let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.primary()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Literal(_)) => match self.advance() {
                Some(Token::Literal(text)) => Ok(Expr::Literal(text)),
                _ => Err(self.error("expected literal")),
            },
            Some(Token::Number(_)) => match self.advance() {
                Some(Token::Number(value)) => Ok(Expr::Number(value)),
                _ => Err(self.error("expected number")),
            },
            Some(Token::LParen) => {
                self.advance();
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::LParen) && name != "node" => {
                let function = name.clone();
                self.advance();
                self.advance();
                let result = match function.as_str() {
                    "count" => Expr::Count(self.location_path()?),
                    "not" => Expr::Not(Box::new(self.expr()?)),
                    other => return Err(self.error(format!("unsupported function '{}()'", other))),
                };
                self.expect(Token::RParen)?;
                Ok(result)
            }
            Some(Token::Slash | Token::DoubleSlash) => Ok(Expr::Path(self.location_path()?)),
            _ if self.starts_step() => Ok(Expr::Path(self.location_path()?)),
            Some(token) => Err(self.error(format!("unexpected {:?} in predicate", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
    }
}
