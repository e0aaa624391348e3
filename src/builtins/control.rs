//! Control primitives: apply, call/cc, eval, while, error, exit.

use crate::error::{ExitStatus, LispError};
use crate::eval::{create_continuation, Cont, Context, Step};
use crate::printer::stringify;
use crate::value::{cons, Value};

pub fn register(ctx: &mut Context) {
    ctx.define_prim("apply", op_apply);
    ctx.define_prim("call/cc", op_callcc);
    ctx.define_prim("call-with-current-continuation", op_callcc);
    ctx.define_prim("eval", op_eval);
    ctx.define_prim("while", op_while);
    ctx.define_prim("error", op_error);
    ctx.define_prim("exit", op_exit);
}

fn op_apply(ctx: &mut Context) -> Result<Step, LispError> {
    let (proc, args) = ctx.unpack2()?;
    let proc = match proc {
        Value::Proc(p) => p,
        other => {
            return Err(LispError::syntax(format!(
                "expected proc, got {}",
                other.type_name()
            )));
        }
    };
    ctx.argl = args;
    Ok(Step::Apply(proc))
}

/// With no arguments, yield the bare continuation: `(call/cc)` is the cheap
/// spelling of `(call/cc (lambda (cc) cc))`.
fn op_callcc(ctx: &mut Context) -> Result<Step, LispError> {
    if ctx.argl.is_nil() {
        ctx.val = create_continuation(ctx);
        return Ok(Step::Run(ctx.cont));
    }
    let proc = match ctx.unpack1()? {
        Value::Proc(p) => p,
        other => {
            return Err(LispError::syntax(format!(
                "expected callable, got {}",
                other.type_name()
            )));
        }
    };
    let k = create_continuation(ctx);
    ctx.argl = cons(k, Value::Nil);
    Ok(Step::Apply(proc))
}

/// `(eval x)` or `(eval x n)`: evaluate a datum, or the last datum read from
/// a string, in the environment `n` parent frames above the current one.
fn op_eval(ctx: &mut Context) -> Result<Step, LispError> {
    let (x, n_up) = match ctx.unpack1() {
        Ok(x) => (x, 0),
        Err(_) => {
            let (x, n) = ctx.unpack2()?;
            match n {
                Value::Int(i) if i >= 0 => (x, i),
                other => {
                    return Err(LispError::type_err(format!(
                        "expected integer, got {}",
                        other.type_name()
                    )));
                }
            }
        }
    };
    let x = match &x {
        Value::Str(text) => {
            let text = text.to_string();
            let mut datums = crate::parser::read_all(ctx, &text)?;
            datums.pop().unwrap_or(Value::Nil)
        }
        _ => x,
    };
    let mut env = ctx.env.clone();
    for _ in 0..n_up {
        env = env
            .parent()
            .ok_or_else(|| LispError::syntax("no frame available"))?;
    }
    ctx.exp = x;
    ctx.env = env;
    Ok(Step::Eval)
}

/// `(while thunk)`: call the thunk until it returns `()`.
fn op_while(ctx: &mut Context) -> Result<Step, LispError> {
    let proc = match ctx.unpack1()? {
        Value::Proc(p) => p,
        other => {
            return Err(LispError::type_err(format!(
                "expected callable, got {}",
                other.type_name()
            )));
        }
    };
    ctx.push_cont(ctx.cont);
    ctx.push(Value::Proc(proc.clone()));
    ctx.push_env(ctx.env.clone());
    ctx.argl = Value::Nil;
    ctx.cont = Cont::WhileTest;
    Ok(Step::Apply(proc))
}

pub fn k_while_test(ctx: &mut Context) -> Result<Step, LispError> {
    ctx.env = ctx.pop_env()?;
    let thunk = ctx.pop()?;
    if ctx.val.is_nil() {
        ctx.cont = ctx.pop_cont()?;
        return Ok(Step::Run(ctx.cont));
    }
    let proc = match &thunk {
        Value::Proc(p) => p.clone(),
        other => {
            return Err(LispError::type_err(format!(
                "expected callable, got {}",
                other.type_name()
            )));
        }
    };
    ctx.push(thunk);
    ctx.push_env(ctx.env.clone());
    ctx.argl = Value::Nil;
    ctx.cont = Cont::WhileTest;
    Ok(Step::Apply(proc))
}

fn op_error(ctx: &mut Context) -> Result<Step, LispError> {
    let x = ctx.unpack1()?;
    Err(LispError::User(stringify(&x)?))
}

fn op_exit(ctx: &mut Context) -> Result<Step, LispError> {
    let x = ctx.unpack1()?;
    match x {
        Value::Int(code) => Err(LispError::Exit(ExitStatus::Code(code))),
        other => Err(LispError::Exit(ExitStatus::Message(stringify(&other)?))),
    }
}
