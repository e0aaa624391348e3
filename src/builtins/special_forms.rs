//! Special forms: heads that receive their operands unevaluated.
//!
//! Every operator here is registered with the `special` trait set, so the
//! evaluator hands it the raw argument list. Forms that need to evaluate a
//! sub-expression park their state on the evaluator stack and resume in one
//! of the `k_*` continuation steps; the tail sub-expression of `if`, `cond`
//! and `begin` is evaluated with the caller's own continuation, which is
//! what keeps tail calls flat.

use crate::error::LispError;
use crate::eval::{Cont, Context, StackSlot, Step};
use crate::value::{cons, symcheck, uncons, Proc, Value};

pub fn register(ctx: &mut Context) {
    ctx.define_special("quote", op_quote);
    ctx.define_special("if", op_if);
    ctx.define_special("cond", op_cond);
    ctx.define_special("define", op_define);
    ctx.define_special("set!", op_setbang);
    ctx.define_special("lambda", op_lambda);
    ctx.define_special("special", op_special);
    ctx.define_special("begin", op_begin);
    ctx.define_special("do", op_begin);
    ctx.define_special("quasiquote", op_quasiquote);
    ctx.define_special("trap", op_trap);
}

/// A body is one expression, or several wrapped in an implicit `begin`.
fn single_or_begin(ctx: &mut Context, body: &Value) -> Result<Value, LispError> {
    match uncons(body) {
        Some((first, Value::Nil)) => Ok(first),
        Some(_) => Ok(cons(Value::Symbol(ctx.begin.clone()), body.clone())),
        None => Err(LispError::syntax(format!(
            "expected list, got {}",
            body.type_name()
        ))),
    }
}

// ----- quote ---------------------------------------------------------------

fn op_quote(ctx: &mut Context) -> Result<Step, LispError> {
    ctx.val = ctx.unpack1()?;
    Ok(Step::Run(ctx.cont))
}

// ----- begin / do ----------------------------------------------------------

fn op_begin(ctx: &mut Context) -> Result<Step, LispError> {
    let args = std::mem::take(&mut ctx.argl);
    if args.is_nil() {
        ctx.val = Value::Nil;
        return Ok(Step::Run(ctx.cont));
    }
    let (first, rest) = uncons(&args).ok_or_else(|| LispError::syntax("expected list"))?;
    ctx.exp = first;
    if !rest.is_nil() {
        ctx.push_cont(ctx.cont);
        ctx.push_env(ctx.env.clone());
        ctx.push(rest);
        ctx.cont = Cont::BeginNext;
    }
    Ok(Step::Eval)
}

pub fn k_begin_next(ctx: &mut Context) -> Result<Step, LispError> {
    let args = ctx.pop()?;
    let (first, rest) = uncons(&args).ok_or_else(|| LispError::syntax("expected list"))?;
    ctx.exp = first;
    ctx.env = ctx.pop_env()?;
    if rest.is_nil() {
        // unwound before the last expression: this is the tail call
        ctx.cont = ctx.pop_cont()?;
    } else {
        ctx.push_env(ctx.env.clone());
        ctx.push(rest);
        ctx.cont = Cont::BeginNext;
    }
    Ok(Step::Eval)
}

// ----- cond ----------------------------------------------------------------

fn op_cond(ctx: &mut Context) -> Result<Step, LispError> {
    ctx.push_cont(ctx.cont);
    ctx.push_env(ctx.env.clone());
    let args = std::mem::take(&mut ctx.argl);
    cond_setup(ctx, args)
}

fn cond_setup(ctx: &mut Context, args: Value) -> Result<Step, LispError> {
    if args.is_nil() {
        // no clause fired
        ctx.env = ctx.pop_env()?;
        ctx.cont = ctx.pop_cont()?;
        ctx.val = Value::Nil;
        return Ok(Step::Run(ctx.cont));
    }
    // predicates evaluate in the saved env kept on the stack
    ctx.env = ctx.pop_env()?;
    ctx.push_env(ctx.env.clone());

    let (clause, rest) = uncons(&args).ok_or_else(|| {
        LispError::type_err(format!("expected list, got {}", args.type_name()))
    })?;
    let (pred, body) = match uncons(&clause) {
        Some((p, b)) if b.is_pair() => (p, b),
        _ => {
            return Err(LispError::syntax(format!(
                "expected list, got {}",
                clause.type_name()
            )));
        }
    };
    let body = single_or_begin(ctx, &body)?;
    ctx.push(body);
    ctx.push(rest);
    ctx.cont = Cont::CondNext;
    ctx.exp = pred;
    Ok(Step::Eval)
}

pub fn k_cond_next(ctx: &mut Context) -> Result<Step, LispError> {
    let rest = ctx.pop()?;
    let body = ctx.pop()?;
    if ctx.val.is_nil() {
        return cond_setup(ctx, rest);
    }
    ctx.env = ctx.pop_env()?;
    ctx.cont = ctx.pop_cont()?;
    ctx.exp = body;
    Ok(Step::Eval)
}

// ----- define --------------------------------------------------------------

fn op_define(ctx: &mut Context) -> Result<Step, LispError> {
    let (target, body) = match uncons(&ctx.argl) {
        Some((t, b)) if !b.is_nil() => (t, b),
        _ => return Err(LispError::syntax("define takes at least 2 args")),
    };

    // (define (f params...) body...) sugar
    if let Value::Pair(sig) = &target {
        let name = match sig.head() {
            Value::Symbol(s) => s,
            _ => return Err(LispError::syntax("expected symbol")),
        };
        let params = sig.tail();
        let body = single_or_begin(ctx, &body)?;
        let lam = Proc::closure(params, body, ctx.env.clone());
        ctx.env.define(name, lam);
        ctx.val = Value::Nil;
        return Ok(Step::Run(ctx.cont));
    }

    let (expr, more) = uncons(&body).ok_or_else(|| LispError::syntax("expected list"))?;
    if !more.is_nil() {
        return Err(LispError::syntax("body must be a single value"));
    }
    let sym = match target {
        Value::Symbol(s) => s,
        _ => return Err(LispError::syntax("expected symbol")),
    };
    ctx.push_cont(ctx.cont);
    ctx.push_env(ctx.env.clone());
    ctx.push(Value::Symbol(sym));
    ctx.exp = expr;
    ctx.cont = Cont::DefineBind;
    Ok(Step::Eval)
}

pub fn k_define_bind(ctx: &mut Context) -> Result<Step, LispError> {
    let sym = symcheck(&ctx.pop()?)?;
    ctx.env = ctx.pop_env()?;
    ctx.cont = ctx.pop_cont()?;
    let value = std::mem::take(&mut ctx.val);
    ctx.env.define(sym, value);
    ctx.val = Value::Nil;
    Ok(Step::Run(ctx.cont))
}

// ----- if ------------------------------------------------------------------

fn op_if(ctx: &mut Context) -> Result<Step, LispError> {
    let (pred, consequent, alternative) = ctx
        .unpack3()
        .map_err(|_| LispError::syntax("expected three args"))?;
    ctx.push_cont(ctx.cont);
    ctx.push_env(ctx.env.clone());
    ctx.push(alternative);
    ctx.push(consequent);
    ctx.cont = Cont::IfBranch;
    ctx.exp = pred;
    Ok(Step::Eval)
}

pub fn k_if_branch(ctx: &mut Context) -> Result<Step, LispError> {
    let consequent = ctx.pop()?;
    let alternative = ctx.pop()?;
    ctx.env = ctx.pop_env()?;
    ctx.cont = ctx.pop_cont()?;
    // () is the only falsy value
    ctx.exp = if ctx.val.is_nil() {
        alternative
    } else {
        consequent
    };
    Ok(Step::Eval)
}

// ----- set! ----------------------------------------------------------------

fn op_setbang(ctx: &mut Context) -> Result<Step, LispError> {
    let (sym, value) = ctx.unpack2()?;
    if !matches!(sym, Value::Symbol(_)) {
        return Err(LispError::syntax("expected symbol"));
    }
    ctx.push(sym);
    ctx.push_ce();
    ctx.cont = Cont::SetBind;
    ctx.exp = value;
    Ok(Step::Eval)
}

pub fn k_set_bind(ctx: &mut Context) -> Result<Step, LispError> {
    ctx.pop_ce()?;
    let sym = symcheck(&ctx.pop()?)?;
    let value = std::mem::take(&mut ctx.val);
    ctx.env.set(&sym, value)?;
    ctx.val = Value::Nil;
    Ok(Step::Run(ctx.cont))
}

// ----- lambda --------------------------------------------------------------

fn op_lambda(ctx: &mut Context) -> Result<Step, LispError> {
    let (params, body) = match uncons(&ctx.argl) {
        Some((p, b)) if b.is_pair() => (p, b),
        _ => return Err(LispError::syntax("expected at least 2 args")),
    };
    let body = single_or_begin(ctx, &body)?;
    ctx.val = Proc::closure(params, body, ctx.env.clone());
    Ok(Step::Run(ctx.cont))
}

// ----- special -------------------------------------------------------------

/// `(special (name params...) body...)` defines a closure whose arguments
/// arrive unevaluated (a fexpr); `(special name expr)` marks the procedure
/// `expr` evaluates to.
fn op_special(ctx: &mut Context) -> Result<Step, LispError> {
    let (target, body) = match uncons(&ctx.argl) {
        Some((t, b)) if !b.is_nil() => (t, b),
        _ => return Err(LispError::syntax("special takes at least 2 args")),
    };

    if let Value::Pair(sig) = &target {
        let name = symcheck(&sig.head())?;
        let params = sig.tail();
        let body = single_or_begin(ctx, &body)?;
        let lam = Proc::closure(params, body, ctx.env.clone());
        if let Value::Proc(p) = &lam {
            p.set_special(true);
        }
        ctx.env.define(name, lam);
        ctx.val = Value::Nil;
        return Ok(Step::Run(ctx.cont));
    }

    let (expr, more) = uncons(&body).ok_or_else(|| LispError::syntax("expected list"))?;
    if !more.is_nil() {
        return Err(LispError::syntax("body must be a single value"));
    }
    let name = symcheck(&target)?;
    ctx.push_ce();
    ctx.push(Value::Symbol(name));
    ctx.exp = expr;
    ctx.cont = Cont::SpecialBind;
    Ok(Step::Eval)
}

pub fn k_special_bind(ctx: &mut Context) -> Result<Step, LispError> {
    let sym = symcheck(&ctx.pop()?)?;
    ctx.pop_ce()?;
    let value = std::mem::take(&mut ctx.val);
    match &value {
        Value::Proc(p) => p.set_special(true),
        _ => return Err(LispError::syntax("expected proc")),
    }
    ctx.env.define(sym, value);
    ctx.val = Value::Nil;
    Ok(Step::Run(ctx.cont))
}

// ----- trap ----------------------------------------------------------------

/// Protected sub-evaluation: `(#t value)` on success, `(() "Kind: message")`
/// on any failure, with the register state restored either way.
fn op_trap(ctx: &mut Context) -> Result<Step, LispError> {
    let expr = ctx.unpack1()?;
    let saved = ctx.save();
    let env = ctx.env.clone();
    let outcome = ctx.eval_in(expr, env);
    ctx.restore(&saved);
    ctx.val = match outcome {
        Ok(v) => cons(Value::True, cons(v, Value::Nil)),
        Err(e) => cons(
            Value::Nil,
            cons(Value::string(e.to_string()), Value::Nil),
        ),
    };
    Ok(Step::Run(ctx.cont))
}

// ----- quasiquote ----------------------------------------------------------

fn op_quasiquote(ctx: &mut Context) -> Result<Step, LispError> {
    ctx.exp = ctx.unpack1()?;
    Ok(Step::Qq)
}

/// Walk one template node in `exp`.
pub fn qq_walk(ctx: &mut Context) -> Result<Step, LispError> {
    let form = std::mem::take(&mut ctx.exp);
    let cell = match &form {
        Value::Pair(p) => p.clone(),
        _ => {
            ctx.val = form;
            return Ok(Step::Run(ctx.cont));
        }
    };
    if let Value::Symbol(head) = &cell.head() {
        if *head == ctx.quotes.quasiquote {
            // one level of nesting: the inner template stays literal data
            ctx.val = form;
            return Ok(Step::Run(ctx.cont));
        }
        if *head == ctx.quotes.unquote {
            ctx.argl = form;
            let (_, operand) = ctx.unpack2()?;
            ctx.exp = operand;
            return Ok(Step::Eval);
        }
        if *head == ctx.quotes.unquote_splicing {
            ctx.argl = form;
            ctx.unpack2()?;
            return Err(LispError::syntax("cannot use unquote-splicing here"));
        }
    }
    ctx.push_ce();
    ctx.push_mark();
    qq_setup(ctx, form)
}

fn qq_setup(ctx: &mut Context, form: Value) -> Result<Step, LispError> {
    let (elt, rest) = uncons(&form).ok_or_else(|| {
        LispError::type_err(format!("expected list, got {}", form.type_name()))
    })?;
    if !(rest.is_pair() || rest.is_nil()) {
        return Err(LispError::type_err(format!(
            "expected list, got {}",
            rest.type_name()
        )));
    }
    ctx.push(rest);
    ctx.push_ce();
    if let Some((head, _)) = uncons(&elt) {
        if let Value::Symbol(s) = &head {
            if *s == ctx.quotes.unquote_splicing {
                ctx.argl = elt;
                let (_, operand) = ctx.unpack2()?;
                ctx.cont = Cont::QqSpliced;
                ctx.exp = operand;
                return Ok(Step::Eval);
            }
        }
    }
    ctx.cont = Cont::QqNext;
    ctx.exp = elt;
    Ok(Step::Qq)
}

/// A spliced operand evaluated; dump its elements into the partial result.
pub fn k_qq_spliced(ctx: &mut Context) -> Result<Step, LispError> {
    ctx.pop_ce()?;
    let form = ctx.pop()?;
    let mut value = std::mem::take(&mut ctx.val);
    if value.is_nil() {
        if form.is_nil() {
            return Ok(Step::QqFinish);
        }
        return qq_setup(ctx, form);
    }
    loop {
        let (elt, rest) = uncons(&value).ok_or_else(|| {
            LispError::type_err(format!("expected list, got {}", value.type_name()))
        })?;
        if rest.is_nil() {
            // the last element rides through the ordinary element step
            ctx.val = elt;
            ctx.push(form);
            ctx.push_ce();
            return Ok(Step::Run(Cont::QqNext));
        }
        ctx.push(elt);
        value = rest;
    }
}

pub fn k_qq_next(ctx: &mut Context) -> Result<Step, LispError> {
    ctx.pop_ce()?;
    let form = ctx.pop()?;
    let done = std::mem::take(&mut ctx.val);
    ctx.push(done);
    if form.is_nil() {
        Ok(Step::QqFinish)
    } else {
        qq_setup(ctx, form)
    }
}

/// Collect results down to the frame mark into a proper list.
pub fn k_qq_finish(ctx: &mut Context) -> Result<Step, LispError> {
    let mut result = Value::Nil;
    loop {
        match ctx.pop_slot()? {
            StackSlot::Mark => break,
            StackSlot::Val(v) => result = cons(v, result),
            slot => {
                return Err(LispError::type_err(format!(
                    "expected value on stack, got {:?}",
                    slot
                )));
            }
        }
    }
    ctx.pop_ce()?;
    ctx.val = result;
    Ok(Step::Run(ctx.cont))
}
