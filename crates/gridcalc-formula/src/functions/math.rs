//! Math and aggregate functions

use crate::evaluator::{Argument, EvaluationContext};
use gridcalc_core::{ErrorKind, Value};

/// Flatten scalars and range elements into one numeric sequence
///
/// Empty cells are skipped, errors propagate, anything else that is not a number is a
/// type error.
fn numbers(args: &[Argument]) -> Result<Vec<f64>, ErrorKind> {
    let mut out = Vec::new();

    for value in args.iter().flat_map(Argument::values) {
        match value {
            Value::Number(n) => out.push(*n),
            Value::Empty => {}
            Value::Error(e) => return Err(*e),
            Value::Boolean(_) | Value::Text(_) => return Err(ErrorKind::Type),
        }
    }

    Ok(out)
}

fn with_numbers(args: &[Argument], f: impl FnOnce(Vec<f64>) -> Value) -> Value {
    match numbers(args) {
        Ok(values) => f(values),
        Err(e) => Value::Error(e),
    }
}

/// SUM function
pub fn fn_sum(args: &[Argument], _ctx: &EvaluationContext) -> Value {
    with_numbers(args, |values| Value::Number(values.iter().sum()))
}

/// AVERAGE function
pub fn fn_average(args: &[Argument], _ctx: &EvaluationContext) -> Value {
    with_numbers(args, |values| {
        if values.is_empty() {
            Value::Error(ErrorKind::DivisionByZero)
        } else {
            Value::Number(values.iter().sum::<f64>() / values.len() as f64)
        }
    })
}

/// MIN function
pub fn fn_min(args: &[Argument], _ctx: &EvaluationContext) -> Value {
    with_numbers(args, |values| {
        Value::Number(values.into_iter().reduce(f64::min).unwrap_or(0.0))
    })
}

/// MAX function
pub fn fn_max(args: &[Argument], _ctx: &EvaluationContext) -> Value {
    with_numbers(args, |values| {
        Value::Number(values.into_iter().reduce(f64::max).unwrap_or(0.0))
    })
}

/// COUNT function - counts numbers, ignoring everything else
pub fn fn_count(args: &[Argument], _ctx: &EvaluationContext) -> Value {
    let count = args
        .iter()
        .flat_map(Argument::values)
        .filter(|v| matches!(v, Value::Number(_)))
        .count();
    Value::Number(count as f64)
}

/// ABS function
pub fn fn_abs(args: &[Argument], _ctx: &EvaluationContext) -> Value {
    match args {
        [Argument::Scalar(Value::Number(n))] => Value::Number(n.abs()),
        [Argument::Scalar(Value::Empty)] => Value::Number(0.0),
        [Argument::Scalar(Value::Error(e))] => Value::Error(*e),
        [_] => Value::Error(ErrorKind::Type),
        _ => Value::Error(ErrorKind::Arity),
    }
}
