// switchyard/src/expression/simple/lexer.rs

//! Lexer: tokenizes simple-language expressions.

use super::compile_error;
use crate::error::SwitchyardResult;

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  /// Raw text (identifiers, keywords, operators) or the decoded literal for strings
  pub text: String,
  /// Column number (1-based, in characters)
  pub col: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
  // Literals and names
  Int(i64),
  Float(f64),
  Str,
  Ident,

  // Keywords
  True,
  False,
  Null,
  And,
  Or,
  Not,
  Contains,
  StartsWith,
  EndsWith,
  In,
  Matches,

  // Punctuation
  LParen,
  RParen,
  LBracket,
  RBracket,
  Dot,
  Comma,
  Question,
  Colon,

  // Operators
  Plus,
  Minus,
  Star,
  Slash,
  Percent,
  Bang,
  EqEq,
  NotEq,
  Lt,
  Le,
  Gt,
  Ge,
  AndAnd,
  OrOr,

  Eof,
}

pub struct Lexer<'a> {
  source: &'a str,
  input: Vec<char>,
  pos: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      input: source.chars().collect(),
      pos: 0,
    }
  }

  pub fn tokenize(&mut self) -> SwitchyardResult<Vec<Token>> {
    let mut tokens = Vec::new();
    loop {
      self.skip_whitespace();
      if self.pos >= self.input.len() {
        tokens.push(Token {
          kind: TokenKind::Eof,
          text: String::new(),
          col: self.pos + 1,
        });
        break;
      }
      tokens.push(self.next_token()?);
    }
    Ok(tokens)
  }

  fn next_token(&mut self) -> SwitchyardResult<Token> {
    let col = self.pos + 1;
    let ch = self.input[self.pos];
    let two = (ch, self.peek_at(1));

    let (kind, width) = match two {
      ('=', Some('=')) => (TokenKind::EqEq, 2),
      ('!', Some('=')) => (TokenKind::NotEq, 2),
      ('<', Some('=')) => (TokenKind::Le, 2),
      ('>', Some('=')) => (TokenKind::Ge, 2),
      ('&', Some('&')) => (TokenKind::AndAnd, 2),
      ('|', Some('|')) => (TokenKind::OrOr, 2),
      ('(', _) => (TokenKind::LParen, 1),
      (')', _) => (TokenKind::RParen, 1),
      ('[', _) => (TokenKind::LBracket, 1),
      (']', _) => (TokenKind::RBracket, 1),
      (',', _) => (TokenKind::Comma, 1),
      ('?', _) => (TokenKind::Question, 1),
      (':', _) => (TokenKind::Colon, 1),
      ('+', _) => (TokenKind::Plus, 1),
      ('-', _) => (TokenKind::Minus, 1),
      ('*', _) => (TokenKind::Star, 1),
      ('/', _) => (TokenKind::Slash, 1),
      ('%', _) => (TokenKind::Percent, 1),
      ('!', _) => (TokenKind::Bang, 1),
      ('<', _) => (TokenKind::Lt, 1),
      ('>', _) => (TokenKind::Gt, 1),
      ('.', Some(d)) if d.is_ascii_digit() => return self.read_number(),
      ('.', _) => (TokenKind::Dot, 1),
      ('"', _) | ('\'', _) => return self.read_string(ch),
      (c, _) if c.is_ascii_digit() => return self.read_number(),
      (c, _) if c.is_alphabetic() || c == '_' => return Ok(self.read_identifier_or_keyword()),
      _ => {
        return Err(compile_error(
          self.source,
          col,
          format!("unexpected character '{}'", ch),
        ))
      }
    };

    let text: String = self.input[self.pos..self.pos + width].iter().collect();
    self.pos += width;
    Ok(Token { kind, text, col })
  }

  fn read_string(&mut self, quote: char) -> SwitchyardResult<Token> {
    let col = self.pos + 1;
    self.pos += 1; // opening quote

    let mut text = String::new();
    loop {
      let Some(ch) = self.input.get(self.pos).copied() else {
        return Err(compile_error(self.source, col, "unterminated string literal"));
      };
      self.pos += 1;
      if ch == quote {
        break;
      }
      if ch == '\\' {
        let Some(escaped) = self.input.get(self.pos).copied() else {
          return Err(compile_error(self.source, col, "unterminated escape sequence"));
        };
        self.pos += 1;
        text.push(match escaped {
          'n' => '\n',
          't' => '\t',
          'r' => '\r',
          other => other,
        });
      } else {
        text.push(ch);
      }
    }

    Ok(Token {
      kind: TokenKind::Str,
      text,
      col,
    })
  }

  fn read_number(&mut self) -> SwitchyardResult<Token> {
    let col = self.pos + 1;
    let start = self.pos;
    let mut is_float = false;

    while let Some(ch) = self.input.get(self.pos).copied() {
      if ch.is_ascii_digit() || ch == '_' {
        self.pos += 1;
      } else if ch == '.' && !is_float && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
        is_float = true;
        self.pos += 1;
      } else {
        break;
      }
    }

    let text: String = self.input[start..self.pos].iter().filter(|c| **c != '_').collect();
    let kind = if is_float {
      text
        .parse::<f64>()
        .map(TokenKind::Float)
        .map_err(|e| compile_error(self.source, col, format!("invalid number '{}': {}", text, e)))?
    } else {
      text
        .parse::<i64>()
        .map(TokenKind::Int)
        .map_err(|e| compile_error(self.source, col, format!("invalid number '{}': {}", text, e)))?
    };
    Ok(Token { kind, text, col })
  }

  fn read_identifier_or_keyword(&mut self) -> Token {
    let col = self.pos + 1;
    let start = self.pos;
    while let Some(ch) = self.input.get(self.pos).copied() {
      if ch.is_alphanumeric() || ch == '_' {
        self.pos += 1;
      } else {
        break;
      }
    }
    let text: String = self.input[start..self.pos].iter().collect();

    let kind = match text.as_str() {
      "true" => TokenKind::True,
      "false" => TokenKind::False,
      "null" | "nil" => TokenKind::Null,
      "and" => TokenKind::And,
      "or" => TokenKind::Or,
      "not" => TokenKind::Not,
      "contains" => TokenKind::Contains,
      "startsWith" => TokenKind::StartsWith,
      "endsWith" => TokenKind::EndsWith,
      "in" => TokenKind::In,
      "matches" => TokenKind::Matches,
      _ => TokenKind::Ident,
    };

    Token { kind, text, col }
  }

  fn skip_whitespace(&mut self) {
    while self.input.get(self.pos).map_or(false, |c| c.is_whitespace()) {
      self.pos += 1;
    }
  }

  fn peek_at(&self, offset: usize) -> Option<char> {
    self.input.get(self.pos + offset).copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::new(input).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
  }

  #[test]
  fn test_operators_and_member_access() {
    assert_eq!(
      kinds("header.foo >= 10 && !x"),
      vec![
        TokenKind::Ident,
        TokenKind::Dot,
        TokenKind::Ident,
        TokenKind::Ge,
        TokenKind::Int(10),
        TokenKind::AndAnd,
        TokenKind::Bang,
        TokenKind::Ident,
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn test_string_literals_with_escapes() {
    let tokens = Lexer::new(r#"'it\'s' "a\"b""#).tokenize().unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Str);
    assert_eq!(tokens[0].text, "it's");
    assert_eq!(tokens[1].text, "a\"b");
  }

  #[test]
  fn test_numbers() {
    assert_eq!(
      kinds("1 2.5 1_000"),
      vec![TokenKind::Int(1), TokenKind::Float(2.5), TokenKind::Int(1000), TokenKind::Eof]
    );
  }

  #[test]
  fn test_keywords() {
    assert_eq!(
      kinds("true false nil and or not contains startsWith endsWith in matches"),
      vec![
        TokenKind::True,
        TokenKind::False,
        TokenKind::Null,
        TokenKind::And,
        TokenKind::Or,
        TokenKind::Not,
        TokenKind::Contains,
        TokenKind::StartsWith,
        TokenKind::EndsWith,
        TokenKind::In,
        TokenKind::Matches,
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn test_unterminated_string() {
    assert!(Lexer::new("\"open").tokenize().is_err());
  }

  #[test]
  fn test_unexpected_character_reports_column() {
    let err = Lexer::new("body # 1").tokenize().unwrap_err();
    assert!(err.to_string().contains("column 6"), "{}", err);
  }
}
