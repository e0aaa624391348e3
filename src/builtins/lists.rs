//! Pair and list primitives: cons, car, cdr, set-car!, set-cdr!, null?, range.

use crate::error::LispError;
use crate::eval::{Context, Step};
use crate::value::{car, cdr, cons, ListBuilder, Value};

pub fn register(ctx: &mut Context) {
    ctx.define_prim("cons", op_cons);
    ctx.define_prim("car", op_car);
    ctx.define_prim("cdr", op_cdr);
    ctx.define_prim("set-car!", op_set_car);
    ctx.define_prim("set-cdr!", op_set_cdr);
    ctx.define_prim("set-head!", op_set_car);
    ctx.define_prim("set-tail!", op_set_cdr);
    ctx.define_prim("null?", op_null);
    ctx.define_prim("range", op_range);
}

fn op_cons(ctx: &mut Context) -> Result<Step, LispError> {
    let (head, tail) = ctx.unpack2()?;
    ctx.val = cons(head, tail);
    Ok(Step::Run(ctx.cont))
}

fn op_car(ctx: &mut Context) -> Result<Step, LispError> {
    let x = ctx.unpack1()?;
    ctx.val = car(&x)?;
    Ok(Step::Run(ctx.cont))
}

fn op_cdr(ctx: &mut Context) -> Result<Step, LispError> {
    let x = ctx.unpack1()?;
    ctx.val = cdr(&x)?;
    Ok(Step::Run(ctx.cont))
}

fn op_set_car(ctx: &mut Context) -> Result<Step, LispError> {
    let (target, value) = ctx.unpack2()?;
    match &target {
        Value::Pair(p) => p.set_head(value),
        other => {
            return Err(LispError::type_err(format!(
                "expected list, got {}",
                other.type_name()
            )));
        }
    }
    ctx.val = Value::Nil;
    Ok(Step::Run(ctx.cont))
}

fn op_set_cdr(ctx: &mut Context) -> Result<Step, LispError> {
    let (target, value) = ctx.unpack2()?;
    match &target {
        Value::Pair(p) => p.set_tail(value),
        other => {
            return Err(LispError::type_err(format!(
                "expected list, got {}",
                other.type_name()
            )));
        }
    }
    ctx.val = Value::Nil;
    Ok(Step::Run(ctx.cont))
}

fn op_null(ctx: &mut Context) -> Result<Step, LispError> {
    let x = ctx.unpack1()?;
    ctx.val = if x.is_nil() { Value::True } else { Value::Nil };
    Ok(Step::Run(ctx.cont))
}

/// `(range start stop step)` builds the list directly; going through the FFI
/// bridge element by element is too slow for large lists.
fn op_range(ctx: &mut Context) -> Result<Step, LispError> {
    let (start, stop, step) = ctx.unpack3()?;
    let (start, stop, step) = match (start, stop, step) {
        (Value::Int(a), Value::Int(b), Value::Int(c)) => (a, b, c),
        (a, b, c) => {
            return Err(LispError::type_err(format!(
                "expected integers, got {}, {} and {}",
                a.type_name(),
                b.type_name(),
                c.type_name()
            )));
        }
    };
    if step == 0 {
        return Err(LispError::type_err("range step must not be zero"));
    }
    let mut out = ListBuilder::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(Value::Int(i));
        i += step;
    }
    ctx.val = out.finish();
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
    fn test_cons_car_cdr() {
        let mut ctx = Context::new();
        let out = run(
            &mut ctx,
            "(cons 1 ())
             (car '(1 2))
             (cdr '(1 2))
             (cdr '())",
        );
        assert_eq!(out, vec!["(1)", "1", "(2)", "()"]);
    }

    #[test]
    fn test_car_of_empty_is_type_error() {
        let mut ctx = Context::new();
        assert!(matches!(
            ctx.execute("(car '())"),
            Err(LispError::Type(_))
        ));
    }

    #[test]
    fn test_mutation() {
        let mut ctx = Context::new();
        let out = run(
            &mut ctx,
            "(define p '(1 2))
             (set-car! p 9)
             p
             (set-cdr! p ())
             p",
        );
        assert_eq!(out[2], "(9 2)");
        assert_eq!(out[4], "(9)");
    }

    #[test]
    fn test_mutation_is_visible_through_sharing() {
        let mut ctx = Context::new();
        let out = run(
            &mut ctx,
            "(define a '(1 2))
             (define b (cons 0 a))
             (set-car! a 9)
             b",
        );
        assert_eq!(out[3], "(0 9 2)");
    }

    #[test]
    fn test_null() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(null? ())"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(null? '(1))"), vec!["()"]);
        assert_eq!(run(&mut ctx, "(null? 0)"), vec!["()"]);
    }

    #[test]
    fn test_range() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(range 0 5 1)"), vec!["(0 1 2 3 4)"]);
        assert_eq!(run(&mut ctx, "(range 5 0 -2)"), vec!["(5 3 1)"]);
        assert_eq!(run(&mut ctx, "(range 0 0 1)"), vec!["()"]);
        assert!(matches!(
            ctx.execute("(range 0 5 0)"),
            Err(LispError::Type(_))
        ));
    }
}
