// switchyard/src/expression/simple/parser.rs

//! Parser: recursive descent over the lexer's tokens, producing an `Expr` tree.
//!
//! Precedence, loosest first: ternary `?:`, `||`/`or`, `&&`/`and`, equality,
//! relational and string/collection operators, additive, multiplicative, unary, postfix.

use super::compile_error;
use super::lexer::{Lexer, Token, TokenKind};
use crate::core::exchange::ENVIRONMENT_KEYS;
use crate::core::value::Value;
use crate::error::SwitchyardResult;
use regex::Regex;

#[derive(Debug, Clone)]
pub enum Expr {
  Literal(Value),
  /// A root name of the evaluation environment (`body`, `header`, ...)
  Root(String),
  List(Vec<Expr>),
  Member(Box<Expr>, String),
  Index(Box<Expr>, Box<Expr>),
  Call(Function, Vec<Expr>),
  Unary(UnaryOp, Box<Expr>),
  Binary(BinaryOp, Box<Expr>, Box<Expr>),
  And(Box<Expr>, Box<Expr>),
  Or(Box<Expr>, Box<Expr>),
  Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
  Matches(Box<Expr>, Pattern),
}

#[derive(Debug, Clone)]
pub enum Pattern {
  /// Literal pattern, compiled once with the expression
  Static(Regex),
  Dynamic(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Not,
  Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  Eq,
  NotEq,
  Lt,
  Le,
  Gt,
  Ge,
  Contains,
  StartsWith,
  EndsWith,
  In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
  Len,
  Upper,
  Lower,
  Trim,
  String,
  Int,
  Float,
  Bool,
}

impl Function {
  fn lookup(name: &str) -> Option<(Function, usize)> {
    let found = match name {
      "len" => Function::Len,
      "upper" => Function::Upper,
      "lower" => Function::Lower,
      "trim" => Function::Trim,
      "string" => Function::String,
      "int" => Function::Int,
      "float" => Function::Float,
      "bool" => Function::Bool,
      _ => return None,
    };
    Some((found, 1))
  }
}

pub struct Parser<'a> {
  source: &'a str,
  tokens: Vec<Token>,
  pos: usize,
}

impl<'a> Parser<'a> {
  pub fn parse(source: &'a str) -> SwitchyardResult<Expr> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { source, tokens, pos: 0 };
    if parser.check(&TokenKind::Eof) {
      return Err(compile_error(source, 1, "empty expression"));
    }
    let expr = parser.parse_expr()?;
    if !parser.check(&TokenKind::Eof) {
      let token = parser.peek();
      return Err(compile_error(
        source,
        token.col,
        format!("unexpected trailing input '{}'", token.text),
      ));
    }
    Ok(expr)
  }

  fn parse_expr(&mut self) -> SwitchyardResult<Expr> {
    let condition = self.parse_or()?;
    if self.eat(&TokenKind::Question) {
      let then_branch = self.parse_expr()?;
      self.expect(&TokenKind::Colon, "':' in conditional expression")?;
      let else_branch = self.parse_expr()?;
      return Ok(Expr::Conditional(
        Box::new(condition),
        Box::new(then_branch),
        Box::new(else_branch),
      ));
    }
    Ok(condition)
  }

  fn parse_or(&mut self) -> SwitchyardResult<Expr> {
    let mut left = self.parse_and()?;
    while self.eat(&TokenKind::OrOr) || self.eat(&TokenKind::Or) {
      let right = self.parse_and()?;
      left = Expr::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
  }

  fn parse_and(&mut self) -> SwitchyardResult<Expr> {
    let mut left = self.parse_equality()?;
    while self.eat(&TokenKind::AndAnd) || self.eat(&TokenKind::And) {
      let right = self.parse_equality()?;
      left = Expr::And(Box::new(left), Box::new(right));
    }
    Ok(left)
  }

  fn parse_equality(&mut self) -> SwitchyardResult<Expr> {
    let mut left = self.parse_relational()?;
    loop {
      let op = match self.peek().kind {
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        _ => break,
      };
      self.advance();
      let right = self.parse_relational()?;
      left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
  }

  fn parse_relational(&mut self) -> SwitchyardResult<Expr> {
    let mut left = self.parse_additive()?;
    loop {
      let op = match self.peek().kind {
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::Contains => BinaryOp::Contains,
        TokenKind::StartsWith => BinaryOp::StartsWith,
        TokenKind::EndsWith => BinaryOp::EndsWith,
        TokenKind::In => BinaryOp::In,
        TokenKind::Matches => {
          self.advance();
          left = self.parse_matches(left)?;
          continue;
        }
        _ => break,
      };
      self.advance();
      let right = self.parse_additive()?;
      left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
  }

  fn parse_matches(&mut self, left: Expr) -> SwitchyardResult<Expr> {
    let col = self.peek().col;
    let right = self.parse_additive()?;
    let pattern = match right {
      Expr::Literal(Value::String(text)) => Regex::new(&text)
        .map(Pattern::Static)
        .map_err(|e| compile_error(self.source, col, format!("invalid regex: {}", e)))?,
      dynamic => Pattern::Dynamic(Box::new(dynamic)),
    };
    Ok(Expr::Matches(Box::new(left), pattern))
  }

  fn parse_additive(&mut self) -> SwitchyardResult<Expr> {
    let mut left = self.parse_multiplicative()?;
    loop {
      let op = match self.peek().kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        _ => break,
      };
      self.advance();
      let right = self.parse_multiplicative()?;
      left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
  }

  fn parse_multiplicative(&mut self) -> SwitchyardResult<Expr> {
    let mut left = self.parse_unary()?;
    loop {
      let op = match self.peek().kind {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        _ => break,
      };
      self.advance();
      let right = self.parse_unary()?;
      left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
  }

  fn parse_unary(&mut self) -> SwitchyardResult<Expr> {
    match self.peek().kind {
      TokenKind::Bang | TokenKind::Not => {
        self.advance();
        Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)))
      }
      TokenKind::Minus => {
        self.advance();
        Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)))
      }
      _ => self.parse_postfix(),
    }
  }

  fn parse_postfix(&mut self) -> SwitchyardResult<Expr> {
    let mut expr = self.parse_primary()?;
    loop {
      if self.eat(&TokenKind::Dot) {
        let name = self.expect(&TokenKind::Ident, "member name after '.'")?;
        expr = Expr::Member(Box::new(expr), name.text);
      } else if self.eat(&TokenKind::LBracket) {
        let index = self.parse_expr()?;
        self.expect(&TokenKind::RBracket, "']'")?;
        expr = Expr::Index(Box::new(expr), Box::new(index));
      } else {
        break;
      }
    }
    Ok(expr)
  }

  fn parse_primary(&mut self) -> SwitchyardResult<Expr> {
    let token = self.advance();
    let expr = match token.kind {
      TokenKind::Int(i) => Expr::Literal(Value::Int(i)),
      TokenKind::Float(f) => Expr::Literal(Value::Float(f)),
      TokenKind::Str => Expr::Literal(Value::String(token.text)),
      TokenKind::True => Expr::Literal(Value::Bool(true)),
      TokenKind::False => Expr::Literal(Value::Bool(false)),
      TokenKind::Null => Expr::Literal(Value::Null),
      TokenKind::LParen => {
        let inner = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')'")?;
        inner
      }
      TokenKind::LBracket => {
        let mut items = Vec::new();
        if !self.eat(&TokenKind::RBracket) {
          loop {
            items.push(self.parse_expr()?);
            if self.eat(&TokenKind::Comma) {
              continue;
            }
            self.expect(&TokenKind::RBracket, "']' closing list literal")?;
            break;
          }
        }
        Expr::List(items)
      }
      TokenKind::Ident if self.check(&TokenKind::LParen) => self.parse_call(token)?,
      TokenKind::Ident => {
        if !ENVIRONMENT_KEYS.contains(&token.text.as_str()) {
          return Err(compile_error(
            self.source,
            token.col,
            format!(
              "unknown identifier '{}' (expected one of: {})",
              token.text,
              ENVIRONMENT_KEYS.join(", ")
            ),
          ));
        }
        Expr::Root(token.text)
      }
      TokenKind::Eof => return Err(compile_error(self.source, token.col, "unexpected end of expression")),
      _ => {
        return Err(compile_error(
          self.source,
          token.col,
          format!("unexpected token '{}'", token.text),
        ))
      }
    };
    Ok(expr)
  }

  fn parse_call(&mut self, name: Token) -> SwitchyardResult<Expr> {
    let Some((function, arity)) = Function::lookup(&name.text) else {
      return Err(compile_error(
        self.source,
        name.col,
        format!("unknown function '{}'", name.text),
      ));
    };
    self.expect(&TokenKind::LParen, "'('")?;
    let mut args = Vec::new();
    if !self.eat(&TokenKind::RParen) {
      loop {
        args.push(self.parse_expr()?);
        if self.eat(&TokenKind::Comma) {
          continue;
        }
        self.expect(&TokenKind::RParen, "')' closing argument list")?;
        break;
      }
    }
    if args.len() != arity {
      return Err(compile_error(
        self.source,
        name.col,
        format!("function '{}' expects {} argument(s), got {}", name.text, arity, args.len()),
      ));
    }
    Ok(Expr::Call(function, args))
  }

  // --- token helpers ---

  fn peek(&self) -> &Token {
    // tokenize always terminates the stream with Eof, and advance never moves past it
    &self.tokens[self.pos.min(self.tokens.len() - 1)]
  }

  fn advance(&mut self) -> Token {
    let token = self.peek().clone();
    if token.kind != TokenKind::Eof {
      self.pos += 1;
    }
    token
  }

  fn check(&self, kind: &TokenKind) -> bool {
    &self.peek().kind == kind
  }

  fn eat(&mut self, kind: &TokenKind) -> bool {
    if self.check(kind) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn expect(&mut self, kind: &TokenKind, what: &str) -> SwitchyardResult<Token> {
    if self.check(kind) {
      return Ok(self.advance());
    }
    let token = self.peek();
    let found = if token.kind == TokenKind::Eof {
      "end of expression".to_string()
    } else {
      format!("'{}'", token.text)
    };
    Err(compile_error(
      self.source,
      token.col,
      format!("expected {}, found {}", what, found),
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_precedence() {
    let expr = Parser::parse("1 + 2 * 3 == 7 && true").unwrap();
    match expr {
      Expr::And(left, _) => match *left {
        Expr::Binary(BinaryOp::Eq, sum, _) => match *sum {
          Expr::Binary(BinaryOp::Add, _, product) => {
            assert!(matches!(*product, Expr::Binary(BinaryOp::Mul, _, _)))
          }
          other => panic!("expected addition, got {:?}", other),
        },
        other => panic!("expected equality, got {:?}", other),
      },
      other => panic!("expected conjunction, got {:?}", other),
    }
  }

  #[test]
  fn test_member_and_index_chain() {
    let expr = Parser::parse("header['a'].b").unwrap();
    match expr {
      Expr::Member(base, name) => {
        assert_eq!(name, "b");
        assert!(matches!(*base, Expr::Index(_, _)));
      }
      other => panic!("expected member access, got {:?}", other),
    }
  }

  #[test]
  fn test_unknown_identifier_is_rejected() {
    let err = Parser::parse("bodyy == 1").unwrap_err();
    assert!(err.to_string().contains("unknown identifier 'bodyy'"), "{}", err);
  }

  #[test]
  fn test_unknown_function_is_rejected() {
    assert!(Parser::parse("reverse(body)").is_err());
  }

  #[test]
  fn test_static_regex_is_compiled_once() {
    let expr = Parser::parse("body matches '^a+$'").unwrap();
    assert!(matches!(expr, Expr::Matches(_, Pattern::Static(_))));
    assert!(Parser::parse("body matches '('").is_err());
  }

  #[test]
  fn test_trailing_input_and_empty_expression() {
    assert!(Parser::parse("body body").is_err());
    assert!(Parser::parse("   ").is_err());
    assert!(Parser::parse("(body").is_err());
  }
}
