//! Arithmetic and ordering primitives: sub, mul, div, nand, lt?.
//!
//! Deliberately minimal: the runtime library derives `+` from `-`, the
//! comparison predicates from `<`, and every bitwise operator from `nand`.
//! Mixed integer/float operands promote to float; integer division floors.

use crate::error::LispError;
use crate::eval::{Context, Step};
use crate::value::{uncons, Value};

pub fn register(ctx: &mut Context) {
    ctx.define_prim("sub", op_sub);
    ctx.define_prim("-", op_sub);
    ctx.define_prim("mul", op_mul);
    ctx.define_prim("*", op_mul);
    ctx.define_prim("div", op_div);
    ctx.define_prim("/", op_div);
    ctx.define_prim("nand", op_nand);
    ctx.define_prim("lt?", op_lt);
    ctx.define_prim("<", op_lt);
}

fn number(v: &Value) -> Result<f64, LispError> {
    match v {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        other => Err(LispError::type_err(format!(
            "expected number, got {}",
            other.type_name()
        ))),
    }
}

/// `(- x)` negates, `(- x y)` subtracts.
fn op_sub(ctx: &mut Context) -> Result<Step, LispError> {
    let (x, y) = match uncons(&ctx.argl) {
        Some((x, Value::Nil)) => (Value::Int(0), x),
        Some((x, rest)) => match uncons(&rest) {
            Some((y, Value::Nil)) => (x, y),
            _ => return Err(LispError::syntax("expected one or two args")),
        },
        None => return Err(LispError::syntax("expected one or two args")),
    };
    ctx.val = match (&x, &y) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_sub(*b)),
        _ => Value::Float(number(&x)? - number(&y)?),
    };
    Ok(Step::Run(ctx.cont))
}

fn op_mul(ctx: &mut Context) -> Result<Step, LispError> {
    let (x, y) = ctx.unpack2()?;
    ctx.val = match (&x, &y) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_mul(*b)),
        _ => Value::Float(number(&x)? * number(&y)?),
    };
    Ok(Step::Run(ctx.cont))
}

/// Integer operands use flooring division, so `(/ -7 2)` is `-4`.
fn op_div(ctx: &mut Context) -> Result<Step, LispError> {
    let (x, y) = ctx.unpack2()?;
    ctx.val = match (&x, &y) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(LispError::type_err("division by zero"));
            }
            Value::Int(floor_div(*a, *b))
        }
        _ => {
            let d = number(&y)?;
            if d == 0.0 {
                return Err(LispError::type_err("division by zero"));
            }
            Value::Float(number(&x)? / d)
        }
    };
    Ok(Step::Run(ctx.cont))
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn op_nand(ctx: &mut Context) -> Result<Step, LispError> {
    let (x, y) = ctx.unpack2()?;
    ctx.val = match (&x, &y) {
        (Value::Int(a), Value::Int(b)) => Value::Int(!(a & b)),
        _ => {
            return Err(LispError::type_err(format!(
                "expected integers, got {} and {}",
                x.type_name(),
                y.type_name()
            )));
        }
    };
    Ok(Step::Run(ctx.cont))
}

/// Numbers order numerically, strings lexicographically; anything else is
/// unorderable.
fn op_lt(ctx: &mut Context) -> Result<Step, LispError> {
    let (x, y) = ctx.unpack2()?;
    let less = match (&x, &y) {
        (Value::Int(a), Value::Int(b)) => a < b,
        (Value::Str(a), Value::Str(b)) => a < b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            number(&x)? < number(&y)?
        }
        _ => {
            return Err(LispError::type_err(format!(
                "unorderable types {} and {}",
                x.type_name(),
                y.type_name()
            )));
        }
    };
    ctx.val = if less { Value::True } else { Value::Nil };
    Ok(Step::Run(ctx.cont))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ctx: &mut Context, src: &str) -> Vec<String> {
        let values = ctx.execute(src).unwrap();
        values.iter().map(|v| ctx.stringify(v).unwrap()).collect()
    }

    #[test]
    fn test_sub() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(sub 10 3)"), vec!["7"]);
        assert_eq!(run(&mut ctx, "(- 5)"), vec!["-5"]);
        assert_eq!(run(&mut ctx, "(- 1.5 1)"), vec!["0.5"]);
        assert!(matches!(
            ctx.execute("(sub 1 2 3)"),
            Err(LispError::Syntax(_))
        ));
    }

    #[test]
    fn test_mul_div() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(mul 6 7)"), vec!["42"]);
        assert_eq!(run(&mut ctx, "(* 2 2.5)"), vec!["5.0"]);
        assert_eq!(run(&mut ctx, "(/ 7 2)"), vec!["3"]);
        assert_eq!(run(&mut ctx, "(/ -7 2)"), vec!["-4"]); // floors
        assert_eq!(run(&mut ctx, "(/ 1.0 4)"), vec!["0.25"]);
        assert!(matches!(
            ctx.execute("(/ 1 0)"),
            Err(LispError::Type(_))
        ));
    }

    #[test]
    fn test_nand_is_bitwise_complete() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(nand 12 10)"), vec!["-9"]); // ~(12 & 10)
        assert!(matches!(
            ctx.execute("(nand 1.5 1)"),
            Err(LispError::Type(_))
        ));
    }

    #[test]
    fn test_lt() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(lt? 1 2)"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(< 2 1)"), vec!["()"]);
        assert_eq!(run(&mut ctx, "(< 1 1.5)"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(< \"a\" \"b\")"), vec!["#t"]);
        assert!(matches!(
            ctx.execute("(< 'a 'b)"),
            Err(LispError::Type(_))
        ));
    }
}
