//! Type predicates and identity: atom?, eq?, equal?, type.

use crate::error::LispError;
use crate::eval::{Context, Step};
use crate::value::{eq, equal, is_atom, Value};

pub fn register(ctx: &mut Context) {
    ctx.define_prim("atom?", op_atom);
    ctx.define_prim("eq?", op_eq);
    ctx.define_prim("equal?", op_equal);
    ctx.define_prim("type", op_type);
}

fn op_atom(ctx: &mut Context) -> Result<Step, LispError> {
    let x = ctx.unpack1()?;
    ctx.val = if is_atom(&x) { Value::True } else { Value::Nil };
    Ok(Step::Run(ctx.cont))
}

fn op_eq(ctx: &mut Context) -> Result<Step, LispError> {
    let (x, y) = ctx.unpack2()?;
    ctx.val = if eq(&x, &y) { Value::True } else { Value::Nil };
    Ok(Step::Run(ctx.cont))
}

fn op_equal(ctx: &mut Context) -> Result<Step, LispError> {
    let (x, y) = ctx.unpack2()?;
    ctx.val = if equal(&x, &y) { Value::True } else { Value::Nil };
    Ok(Step::Run(ctx.cont))
}

fn op_type(ctx: &mut Context) -> Result<Step, LispError> {
    let x = ctx.unpack1()?;
    let name = x.type_name();
    ctx.val = Value::Symbol(ctx.symbol(name));
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
    fn test_atom() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(atom? 'a)"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(atom? ())"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(atom? 1)"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(atom? '(1))"), vec!["()"]);
    }

    #[test]
    fn test_eq_on_interned_symbols() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(eq? 'sym 'sym)"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(eq? 'a 'b)"), vec!["()"]);
        assert_eq!(run(&mut ctx, "(eq? () ())"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(eq? #t #t)"), vec!["#t"]);
        // identity does not extend to numbers
        assert_eq!(run(&mut ctx, "(eq? 1 1)"), vec!["()"]);
    }

    #[test]
    fn test_equal_structural() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut ctx, "(equal? '(1 (2)) '(1 (2)))"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(equal? 1 1.0)"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(equal? \"a\" \"a\")"), vec!["#t"]);
        assert_eq!(run(&mut ctx, "(equal? '(1) '(2))"), vec!["()"]);
    }

    #[test]
    fn test_type_names() {
        let mut ctx = Context::new();
        let out = run(
            &mut ctx,
            "(type ())
             (type #t)
             (type 'x)
             (type 1)
             (type 1.5)
             (type \"s\")
             (type '(1))
             (type (lambda (x) x))
             (type (call/cc))
             (type cons)",
        );
        assert_eq!(
            out,
            vec![
                "()",
                "#t",
                "symbol",
                "integer",
                "float",
                "string",
                "pair",
                "lambda",
                "continuation",
                "primitive"
            ]
        );
    }
}
