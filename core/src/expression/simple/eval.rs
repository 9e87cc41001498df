// switchyard/src/expression/simple/eval.rs

use super::parser::{BinaryOp, Expr, Function, Pattern, UnaryOp};
use crate::core::exchange::Exchange;
use crate::core::value::Value;
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::expression::to_bool;
use regex::Regex;
use std::cmp::Ordering;

fn eval_error(message: impl Into<String>) -> SwitchyardError {
  SwitchyardError::Expression(message.into())
}

pub(super) fn evaluate(expr: &Expr, exchange: &Exchange) -> SwitchyardResult<Value> {
  match expr {
    Expr::Literal(value) => Ok(value.clone()),
    Expr::Root(name) => Ok(exchange.lookup(name).unwrap_or_default()),
    Expr::List(items) => items
      .iter()
      .map(|item| evaluate(item, exchange))
      .collect::<SwitchyardResult<Vec<_>>>()
      .map(Value::List),
    Expr::Member(base, name) => {
      if let Some(value) = scoped_lookup(base, name, exchange) {
        return Ok(value);
      }
      member(&evaluate(base, exchange)?, name)
    }
    Expr::Index(base, index) => {
      let index = evaluate(index, exchange)?;
      if let Value::String(key) = &index {
        if let Some(value) = scoped_lookup(base, key, exchange) {
          return Ok(value);
        }
      }
      element(&evaluate(base, exchange)?, &index)
    }
    Expr::Call(function, args) => {
      let args = args
        .iter()
        .map(|arg| evaluate(arg, exchange))
        .collect::<SwitchyardResult<Vec<_>>>()?;
      call(*function, &args)
    }
    Expr::Unary(op, operand) => {
      let value = evaluate(operand, exchange)?;
      match op {
        UnaryOp::Not => Ok(Value::Bool(!to_bool(&value)?)),
        UnaryOp::Neg => match value {
          Value::Int(i) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| eval_error("integer overflow in negation")),
          Value::Float(f) => Ok(Value::Float(-f)),
          other => Err(eval_error(format!("cannot negate a {} value", other.kind()))),
        },
      }
    }
    Expr::Binary(op, left, right) => {
      let left = evaluate(left, exchange)?;
      let right = evaluate(right, exchange)?;
      binary(*op, &left, &right)
    }
    Expr::And(left, right) => {
      if !to_bool(&evaluate(left, exchange)?)? {
        return Ok(Value::Bool(false));
      }
      Ok(Value::Bool(to_bool(&evaluate(right, exchange)?)?))
    }
    Expr::Or(left, right) => {
      if to_bool(&evaluate(left, exchange)?)? {
        return Ok(Value::Bool(true));
      }
      Ok(Value::Bool(to_bool(&evaluate(right, exchange)?)?))
    }
    Expr::Conditional(condition, then_branch, else_branch) => {
      if to_bool(&evaluate(condition, exchange)?)? {
        evaluate(then_branch, exchange)
      } else {
        evaluate(else_branch, exchange)
      }
    }
    Expr::Matches(subject, pattern) => {
      let subject = evaluate(subject, exchange)?;
      if subject.is_null() {
        return Ok(Value::Bool(false));
      }
      let text = subject.to_string();
      let matched = match pattern {
        Pattern::Static(regex) => regex.is_match(&text),
        Pattern::Dynamic(pattern) => {
          let pattern = evaluate(pattern, exchange)?;
          let Some(pattern) = pattern.as_str() else {
            return Err(eval_error(format!("matches expects a string pattern, got {}", pattern.kind())));
          };
          Regex::new(pattern)
            .map_err(|e| eval_error(format!("invalid regex '{}': {}", pattern, e)))?
            .is_match(&text)
        }
      };
      Ok(Value::Bool(matched))
    }
  }
}

/// `header.x` / `property.x` without materializing the whole map.
fn scoped_lookup(base: &Expr, key: &str, exchange: &Exchange) -> Option<Value> {
  let Expr::Root(root) = base else {
    return None;
  };
  match root.as_str() {
    "header" => Some(exchange.header(key).cloned().unwrap_or_default()),
    "property" => Some(exchange.property(key).cloned().unwrap_or_default()),
    _ => None,
  }
}

fn member(base: &Value, name: &str) -> SwitchyardResult<Value> {
  match base {
    Value::Null => Ok(Value::Null),
    Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
    Value::Error(err) if name == "message" => Ok(Value::String(err.message())),
    other => Err(eval_error(format!("cannot access member '{}' of a {} value", name, other.kind()))),
  }
}

fn element(base: &Value, index: &Value) -> SwitchyardResult<Value> {
  match (base, index) {
    (Value::Null, _) => Ok(Value::Null),
    (Value::Map(map), Value::String(key)) => Ok(map.get(key).cloned().unwrap_or_default()),
    (Value::List(items), Value::Int(i)) => {
      let resolved = if *i < 0 { items.len() as i64 + i } else { *i };
      Ok(usize::try_from(resolved)
        .ok()
        .and_then(|idx| items.get(idx))
        .cloned()
        .unwrap_or_default())
    }
    (base, index) => Err(eval_error(format!(
      "cannot index a {} value with a {} value",
      base.kind(),
      index.kind()
    ))),
  }
}

fn call(function: Function, args: &[Value]) -> SwitchyardResult<Value> {
  let arg = args.first().unwrap_or(&Value::Null);
  match function {
    Function::Len => match arg {
      Value::Null => Ok(Value::Int(0)),
      Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
      Value::Bytes(b) => Ok(Value::Int(b.len() as i64)),
      Value::List(items) => Ok(Value::Int(items.len() as i64)),
      Value::Map(map) => Ok(Value::Int(map.len() as i64)),
      other => Err(eval_error(format!("len() is not defined for {} values", other.kind()))),
    },
    Function::Upper => map_string(arg, "upper", |s| s.to_uppercase()),
    Function::Lower => map_string(arg, "lower", |s| s.to_lowercase()),
    Function::Trim => map_string(arg, "trim", |s| s.trim().to_string()),
    Function::String => Ok(match arg {
      Value::Null => Value::String(String::new()),
      other => Value::String(other.to_string()),
    }),
    Function::Int => match arg {
      Value::Null => Ok(Value::Int(0)),
      Value::Int(i) => Ok(Value::Int(*i)),
      Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
      Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
      Value::String(s) => {
        let trimmed = s.trim();
        trimmed
          .parse::<i64>()
          .or_else(|_| trimmed.parse::<f64>().map(|f| f.trunc() as i64))
          .map(Value::Int)
          .map_err(|_| conversion(arg, "int"))
      }
      other => Err(conversion(other, "int")),
    },
    Function::Float => match arg {
      Value::Null => Ok(Value::Float(0.0)),
      Value::Int(i) => Ok(Value::Float(*i as f64)),
      Value::Float(f) => Ok(Value::Float(*f)),
      Value::String(s) => s
        .trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| conversion(arg, "float")),
      other => Err(conversion(other, "float")),
    },
    Function::Bool => Ok(Value::Bool(to_bool(arg)?)),
  }
}

fn conversion(value: &Value, to: &str) -> SwitchyardError {
  SwitchyardError::Conversion {
    from: value.kind().to_string(),
    to: to.to_string(),
    message: format!("'{}' is not a valid {}", value, to),
  }
}

fn map_string(value: &Value, name: &str, f: impl Fn(&str) -> String) -> SwitchyardResult<Value> {
  match value {
    Value::Null => Ok(Value::Null),
    Value::String(s) => Ok(Value::String(f(s))),
    other => Err(eval_error(format!("{}() expects a string, got {}", name, other.kind()))),
  }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> SwitchyardResult<Value> {
  match op {
    BinaryOp::Add => add(left, right),
    BinaryOp::Sub => subtract(left, right),
    BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arithmetic(op, left, right),
    BinaryOp::Eq => Ok(Value::Bool(left == right)),
    BinaryOp::NotEq => Ok(Value::Bool(left != right)),
    BinaryOp::Lt => Ok(Value::Bool(compare(left, right)? == Ordering::Less)),
    BinaryOp::Le => Ok(Value::Bool(compare(left, right)? != Ordering::Greater)),
    BinaryOp::Gt => Ok(Value::Bool(compare(left, right)? == Ordering::Greater)),
    BinaryOp::Ge => Ok(Value::Bool(compare(left, right)? != Ordering::Less)),
    BinaryOp::Contains => contains(left, right).map(Value::Bool),
    BinaryOp::In => contains(right, left).map(Value::Bool),
    BinaryOp::StartsWith => Ok(Value::Bool(match (left, right) {
      (Value::Null, _) => false,
      (l, r) => l.to_string().starts_with(&r.to_string()),
    })),
    BinaryOp::EndsWith => Ok(Value::Bool(match (left, right) {
      (Value::Null, _) => false,
      (l, r) => l.to_string().ends_with(&r.to_string()),
    })),
  }
}

fn add(left: &Value, right: &Value) -> SwitchyardResult<Value> {
  match (left, right) {
    (Value::String(l), r) => Ok(Value::String(format!("{}{}", l, r))),
    (l, Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
    (Value::Int(l), Value::Int(r)) => l
      .checked_add(*r)
      .map(Value::Int)
      .ok_or_else(|| eval_error("integer overflow in addition")),
    (Value::Duration(l), Value::Duration(r)) => l
      .checked_add(*r)
      .map(Value::Duration)
      .ok_or_else(|| eval_error("duration overflow in addition")),
    (Value::Time(t), Value::Duration(d)) | (Value::Duration(d), Value::Time(t)) => {
      chrono::Duration::from_std(*d)
        .ok()
        .and_then(|d| t.checked_add_signed(d))
        .map(Value::Time)
        .ok_or_else(|| eval_error("time overflow in addition"))
    }
    (Value::List(l), Value::List(r)) => Ok(Value::List(l.iter().chain(r.iter()).cloned().collect())),
    (l, r) => arithmetic(BinaryOp::Add, l, r),
  }
}

fn subtract(left: &Value, right: &Value) -> SwitchyardResult<Value> {
  match (left, right) {
    (Value::Duration(l), Value::Duration(r)) => l
      .checked_sub(*r)
      .map(Value::Duration)
      .ok_or_else(|| eval_error("negative duration in subtraction")),
    (Value::Time(t), Value::Duration(d)) => chrono::Duration::from_std(*d)
      .ok()
      .and_then(|d| t.checked_sub_signed(d))
      .map(Value::Time)
      .ok_or_else(|| eval_error("time overflow in subtraction")),
    (Value::Time(l), Value::Time(r)) => (*l - *r)
      .to_std()
      .map(Value::Duration)
      .map_err(|_| eval_error("negative duration in time subtraction")),
    (l, r) => arithmetic(BinaryOp::Sub, l, r),
  }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> SwitchyardResult<Value> {
  if let (Value::Int(l), Value::Int(r)) = (left, right) {
    let (l, r) = (*l, *r);
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && r == 0 {
      return Err(eval_error("division by zero"));
    }
    let result = match op {
      BinaryOp::Add => l.checked_add(r),
      BinaryOp::Sub => l.checked_sub(r),
      BinaryOp::Mul => l.checked_mul(r),
      BinaryOp::Div => l.checked_div(r),
      BinaryOp::Rem => l.checked_rem(r),
      _ => None,
    };
    return result
      .map(Value::Int)
      .ok_or_else(|| eval_error(format!("integer overflow in {:?}", op)));
  }

  let (Some(l), Some(r)) = (numeric(left), numeric(right)) else {
    return Err(eval_error(format!(
      "unsupported operand types for {:?}: {} and {}",
      op,
      left.kind(),
      right.kind()
    )));
  };
  if matches!(op, BinaryOp::Div | BinaryOp::Rem) && r == 0.0 {
    return Err(eval_error("division by zero"));
  }
  let result = match op {
    BinaryOp::Add => l + r,
    BinaryOp::Sub => l - r,
    BinaryOp::Mul => l * r,
    BinaryOp::Div => l / r,
    BinaryOp::Rem => l % r,
    _ => return Err(eval_error(format!("{:?} is not an arithmetic operator", op))),
  };
  Ok(Value::Float(result))
}

fn numeric(value: &Value) -> Option<f64> {
  match value {
    Value::Int(_) | Value::Float(_) => value.as_f64(),
    _ => None,
  }
}

fn compare(left: &Value, right: &Value) -> SwitchyardResult<Ordering> {
  let ordering = match (left, right) {
    (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
    (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
    (Value::Time(l), Value::Time(r)) => Some(l.cmp(r)),
    (Value::Duration(l), Value::Duration(r)) => Some(l.cmp(r)),
    (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
    (l, r) => match (numeric(l), numeric(r)) {
      (Some(l), Some(r)) => l.partial_cmp(&r),
      _ => None,
    },
  };
  ordering.ok_or_else(|| {
    eval_error(format!(
      "cannot compare a {} value with a {} value",
      left.kind(),
      right.kind()
    ))
  })
}

fn contains(container: &Value, item: &Value) -> SwitchyardResult<bool> {
  match container {
    Value::Null => Ok(false),
    Value::String(s) => Ok(match item {
      Value::Null => false,
      other => s.contains(other.to_string().as_str()),
    }),
    Value::List(items) => Ok(items.iter().any(|candidate| candidate == item)),
    Value::Map(map) => Ok(match item {
      Value::String(key) => map.contains_key(key),
      _ => false,
    }),
    Value::Error(err) => Ok(err.full_message().contains(item.to_string().as_str())),
    other => Err(eval_error(format!("contains is not defined for {} values", other.kind()))),
  }
}
