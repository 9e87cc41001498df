// switchyard/src/expression/template.rs

//! Text templates with embedded `${expr}` segments, used by the `Log` step.

use super::simple::SimpleExpression;
use super::Expression;
use crate::core::exchange::Exchange;
use crate::error::{SwitchyardError, SwitchyardResult};

#[derive(Debug, Clone)]
enum Segment {
  Text(String),
  Expr(SimpleExpression),
}

#[derive(Debug, Clone)]
pub struct Template {
  source: String,
  segments: Vec<Segment>,
}

impl Template {
  pub fn compile(source: &str) -> SwitchyardResult<Self> {
    let chars: Vec<char> = source.chars().collect();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < chars.len() {
      if chars[pos] == '$' && chars.get(pos + 1) == Some(&'{') {
        let start = pos + 2;
        let end = find_closing_brace(&chars, start).ok_or_else(|| SwitchyardError::ExpressionCompile {
          expression: source.to_string(),
          column: pos + 1,
          message: "unterminated '${' in template".to_string(),
        })?;
        if !text.is_empty() {
          segments.push(Segment::Text(std::mem::take(&mut text)));
        }
        let inner: String = chars[start..end].iter().collect();
        segments.push(Segment::Expr(SimpleExpression::compile(&inner)?));
        pos = end + 1;
      } else {
        text.push(chars[pos]);
        pos += 1;
      }
    }
    if !text.is_empty() {
      segments.push(Segment::Text(text));
    }

    Ok(Self {
      source: source.to_string(),
      segments,
    })
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn render(&self, exchange: &Exchange) -> SwitchyardResult<String> {
    let mut out = String::new();
    for segment in &self.segments {
      match segment {
        Segment::Text(text) => out.push_str(text),
        Segment::Expr(expr) => out.push_str(&expr.eval(exchange)?.to_string()),
      }
    }
    Ok(out)
  }
}

/// Index of the `}` closing a `${`, skipping braces inside quoted strings.
fn find_closing_brace(chars: &[char], from: usize) -> Option<usize> {
  let mut quote: Option<char> = None;
  let mut pos = from;
  while pos < chars.len() {
    let ch = chars[pos];
    match quote {
      Some(_) if ch == '\\' => pos += 1,
      Some(q) if ch == q => quote = None,
      Some(_) => {}
      None if ch == '\'' || ch == '"' => quote = Some(ch),
      None if ch == '}' => return Some(pos),
      None => {}
    }
    pos += 1;
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_render_mixes_text_and_expressions() {
    let mut exchange = Exchange::detached();
    exchange.set_body("world");
    exchange.set_header("n", 2);
    let template = Template::compile("hello ${body}, n+1=${header.n + 1}!").unwrap();
    assert_eq!(template.render(&exchange).unwrap(), "hello world, n+1=3!");
  }

  #[test]
  fn test_braces_inside_quotes() {
    let exchange = Exchange::detached();
    let template = Template::compile("${'}' + 'x'}").unwrap();
    assert_eq!(template.render(&exchange).unwrap(), "}x");
  }

  #[test]
  fn test_unterminated_segment_is_a_compile_error() {
    assert!(Template::compile("oops ${body").is_err());
    assert!(Template::compile("bad ${nothing}").is_err());
  }
}
