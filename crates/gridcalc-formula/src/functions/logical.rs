//! Logical functions

use crate::ast::FormulaExpr;
use crate::evaluator::{evaluate, Argument, EvaluationContext};
use gridcalc_core::{ErrorKind, Value};

/// Truthiness of every argument, scalars and range elements in order
///
/// Empty cells inside ranges are skipped; a call whose ranges hold nothing but
/// empty cells has no logical values at all, which is a type error.
fn logical_values(args: &[Argument], ctx: &EvaluationContext) -> Result<Vec<bool>, ErrorKind> {
    let mut values = Vec::with_capacity(args.len());

    for arg in args {
        match arg {
            Argument::Scalar(value) => values.push(ctx.truthy(value)?),
            Argument::Range(cells) => {
                for value in cells.iter().filter(|v| !v.is_empty()) {
                    values.push(ctx.truthy(value)?);
                }
            }
        }
    }

    if values.is_empty() {
        return Err(ErrorKind::Type);
    }
    Ok(values)
}

/// AND function
pub fn fn_and(args: &[Argument], ctx: &EvaluationContext) -> Value {
    match logical_values(args, ctx) {
        Ok(values) => Value::Boolean(values.into_iter().all(|b| b)),
        Err(e) => Value::Error(e),
    }
}

/// OR function
pub fn fn_or(args: &[Argument], ctx: &EvaluationContext) -> Value {
    match logical_values(args, ctx) {
        Ok(values) => Value::Boolean(values.into_iter().any(|b| b)),
        Err(e) => Value::Error(e),
    }
}

/// NOT function
pub fn fn_not(args: &[Argument], ctx: &EvaluationContext) -> Value {
    match args {
        [Argument::Scalar(value)] => match ctx.truthy(value) {
            Ok(b) => Value::Boolean(!b),
            Err(e) => Value::Error(e),
        },
        [Argument::Range(_)] => Value::Error(ErrorKind::Type),
        _ => Value::Error(ErrorKind::Arity),
    }
}

/// IF function
///
/// The condition is evaluated first, then only the selected branch. Without an else
/// branch a false condition yields `FALSE`.
pub fn fn_if(args: &[FormulaExpr], ctx: &EvaluationContext) -> Value {
    let (condition, if_true, if_false) = match args {
        [c, t] => (c, t, None),
        [c, t, f] => (c, t, Some(f)),
        _ => return Value::Error(ErrorKind::Arity),
    };

    let condition = match ctx.truthy(&evaluate(condition, ctx)) {
        Ok(b) => b,
        Err(e) => return Value::Error(e),
    };

    if condition {
        evaluate(if_true, ctx)
    } else {
        if_false.map_or(Value::Boolean(false), |expr| evaluate(expr, ctx))
    }
}
