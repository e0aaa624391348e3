// ABOUTME: Evaluator context, persistent stack, and trampoline steps

use crate::env::Env;
use crate::error::LispError;
use crate::ffi;
use crate::printer;
use crate::value::{uncons, Proc, ProcKind, Symbol, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Continuation step kinds that can be stored in the `cont` register or on
/// the stack. Each names the resume point of one suspended operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cont {
    /// Terminate the trampoline and yield `val`
    Land,
    /// Operator evaluated; decide how to evaluate the arguments
    ProcDone,
    /// One argument done, more remain
    ArgNext,
    /// Last argument done; reassemble and invoke
    ArgLast,
    BeginNext,
    CondNext,
    IfBranch,
    DefineBind,
    SetBind,
    SpecialBind,
    QqSpliced,
    QqNext,
    WhileTest,
}

/// What the trampoline runs next. Step functions return one of these instead
/// of calling each other, so the host stack stays flat no matter how deep
/// the Lisp recursion goes.
#[derive(Clone, Debug)]
pub enum Step {
    Run(Cont),
    /// Dispatch `exp` in `env`
    Eval,
    /// Walk a quasiquote template in `exp`
    Qq,
    /// Collect quasiquote results off the stack
    QqFinish,
    /// Invoke a procedure on `argl`
    Apply(Rc<Proc>),
}

impl From<Cont> for Step {
    fn from(c: Cont) -> Step {
        Step::Run(c)
    }
}

/// One cell of the evaluator stack.
#[derive(Clone, Debug)]
pub enum StackSlot {
    Val(Value),
    Env(Env),
    Cont(Cont),
    /// Frame separator for grouped saves
    Mark,
}

/// The evaluator stack: a persistent cons-stack. Pushing never rewrites an
/// existing cell, so a continuation snapshot aliases the live stack in O(1)
/// and survives later pushes and pops.
#[derive(Clone, Debug, Default)]
pub struct Stack(Option<Rc<StackNode>>);

#[derive(Debug)]
pub struct StackNode {
    slot: StackSlot,
    rest: Stack,
}

impl Stack {
    fn push(&mut self, slot: StackSlot) {
        let rest = std::mem::take(self);
        *self = Stack(Some(Rc::new(StackNode { slot, rest })));
    }

    fn pop(&mut self) -> Option<StackSlot> {
        let node = self.0.take()?;
        let slot = node.slot.clone();
        *self = node.rest.clone();
        Some(slot)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl Drop for StackNode {
    fn drop(&mut self) {
        // unlink unshared suffixes iteratively; deep stacks must not recurse
        let mut rest = std::mem::take(&mut self.rest);
        while let Some(rc) = rest.0.take() {
            match Rc::try_unwrap(rc) {
                Ok(mut node) => rest = std::mem::take(&mut node.rest),
                Err(_) => break,
            }
        }
    }
}

/// A full copy of the six registers. Cheap: every field is a handle, and the
/// stack is persistent.
#[derive(Clone, Debug)]
pub struct Snapshot {
    argl: Value,
    cont: Cont,
    env: Env,
    exp: Value,
    val: Value,
    s: Stack,
}

/// Reader tokens `'`, `` ` ``, `,`, `,@` resolve to these interned symbols.
#[derive(Clone, Debug)]
pub struct QuoteTable {
    pub quote: Symbol,
    pub quasiquote: Symbol,
    pub unquote: Symbol,
    pub unquote_splicing: Symbol,
}

/// One interpreter instance: registers, stack, intern table, global frame.
/// Contexts are independent; nothing is shared between two of them.
pub struct Context {
    pub exp: Value,
    pub env: Env,
    pub cont: Cont,
    pub val: Value,
    pub argl: Value,
    pub s: Stack,
    pub quotes: QuoteTable,
    symbols: HashMap<String, Symbol>,
    global: Env,
    pub(crate) amp: Symbol,
    pub(crate) begin: Symbol,
}

impl Context {
    /// A fresh interpreter with all primitives and `#t` pre-bound.
    pub fn new() -> Context {
        let global = Env::root();
        let mut symbols = HashMap::new();
        let mut intern = |name: &str| -> Symbol {
            symbols
                .entry(name.to_string())
                .or_insert_with(|| Symbol::new(name))
                .clone()
        };
        let quotes = QuoteTable {
            quote: intern("quote"),
            quasiquote: intern("quasiquote"),
            unquote: intern("unquote"),
            unquote_splicing: intern("unquote-splicing"),
        };
        let amp = intern("&");
        let begin = intern("begin");
        let truth = intern("#t");
        global.define(truth, Value::True);

        let mut ctx = Context {
            exp: Value::Nil,
            env: global.clone(),
            cont: Cont::Land,
            val: Value::Nil,
            argl: Value::Nil,
            s: Stack::default(),
            quotes,
            symbols,
            global,
            amp,
            begin,
        };
        crate::builtins::register_builtins(&mut ctx);
        ctx
    }

    /// Intern a spelling, returning the process-unique symbol for it.
    pub fn symbol(&mut self, name: &str) -> Symbol {
        self.symbols
            .entry(name.to_string())
            .or_insert_with(|| Symbol::new(name))
            .clone()
    }

    pub fn global(&self) -> Env {
        self.global.clone()
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        let sym = self.symbol(name);
        self.global.define(sym, value);
    }

    pub fn define_prim(&mut self, name: &'static str, run: crate::value::PrimFn) {
        self.define_global(name, Proc::primitive(name, false, run));
    }

    pub fn define_special(&mut self, name: &'static str, run: crate::value::PrimFn) {
        self.define_global(name, Proc::primitive(name, true, run));
    }

    pub fn define_ffi(&mut self, name: &'static str, run: crate::value::FfiFn) {
        self.define_global(name, Proc::ffi(name, run));
    }

    // ----- top level ------------------------------------------------------

    /// Evaluate a datum in the global environment.
    pub fn eval(&mut self, x: Value) -> Result<Value, LispError> {
        let env = self.global.clone();
        self.eval_in(x, env)
    }

    /// Evaluate a datum in a given environment.
    pub fn eval_in(&mut self, x: Value, env: Env) -> Result<Value, LispError> {
        self.cont = Cont::Land;
        self.exp = x;
        self.env = env;
        self.trampoline(Step::Eval)
    }

    /// Read `text` and evaluate each top-level form in order, collecting the
    /// values.
    pub fn execute(&mut self, text: &str) -> Result<Vec<Value>, LispError> {
        let mut results = Vec::new();
        crate::parser::read(self, text, &mut |ctx, expr| {
            results.push(ctx.eval(expr)?);
            Ok(())
        })?;
        Ok(results)
    }

    pub fn stringify(&self, v: &Value) -> Result<String, LispError> {
        printer::stringify(v)
    }

    // ----- trampoline -----------------------------------------------------

    /// Drive step functions until one lands. The host call stack does not
    /// grow with Lisp recursion depth.
    pub fn trampoline(&mut self, first: Step) -> Result<Value, LispError> {
        let mut step = first;
        loop {
            step = match step {
                Step::Run(Cont::Land) => {
                    return Ok(std::mem::take(&mut self.val));
                }
                Step::Run(c) => self.run_cont(c)?,
                Step::Eval => k_leval(self)?,
                Step::Qq => crate::builtins::special_forms::qq_walk(self)?,
                Step::QqFinish => crate::builtins::special_forms::k_qq_finish(self)?,
                Step::Apply(proc) => apply(self, proc)?,
            };
        }
    }

    fn run_cont(&mut self, c: Cont) -> Result<Step, LispError> {
        use crate::builtins::{control, special_forms as sf};
        match c {
            Cont::Land => Err(LispError::type_err("land is handled by the trampoline")),
            Cont::ProcDone => k_leval_proc_done(self),
            Cont::ArgNext => k_leval_next(self),
            Cont::ArgLast => k_leval_last(self),
            Cont::BeginNext => sf::k_begin_next(self),
            Cont::CondNext => sf::k_cond_next(self),
            Cont::IfBranch => sf::k_if_branch(self),
            Cont::DefineBind => sf::k_define_bind(self),
            Cont::SetBind => sf::k_set_bind(self),
            Cont::SpecialBind => sf::k_special_bind(self),
            Cont::QqSpliced => sf::k_qq_spliced(self),
            Cont::QqNext => sf::k_qq_next(self),
            Cont::WhileTest => control::k_while_test(self),
        }
    }

    // ----- stack ----------------------------------------------------------

    pub fn clear_stack(&mut self) {
        self.s = Stack::default();
    }

    pub fn push(&mut self, v: Value) {
        self.s.push(StackSlot::Val(v));
    }

    pub fn push_mark(&mut self) {
        self.s.push(StackSlot::Mark);
    }

    pub fn push_env(&mut self, env: Env) {
        self.s.push(StackSlot::Env(env));
    }

    pub fn push_cont(&mut self, c: Cont) {
        self.s.push(StackSlot::Cont(c));
    }

    /// Save `cont` then `env` so `pop_ce` restores them together.
    pub fn push_ce(&mut self) {
        self.s.push(StackSlot::Cont(self.cont));
        self.s.push(StackSlot::Env(self.env.clone()));
    }

    pub fn pop_slot(&mut self) -> Result<StackSlot, LispError> {
        self.s
            .pop()
            .ok_or_else(|| LispError::type_err("evaluator stack underflow"))
    }

    pub fn pop(&mut self) -> Result<Value, LispError> {
        match self.pop_slot()? {
            StackSlot::Val(v) => Ok(v),
            slot => Err(LispError::type_err(format!(
                "expected value on stack, got {:?}",
                slot
            ))),
        }
    }

    pub fn pop_env(&mut self) -> Result<Env, LispError> {
        match self.pop_slot()? {
            StackSlot::Env(e) => Ok(e),
            slot => Err(LispError::type_err(format!(
                "expected env on stack, got {:?}",
                slot
            ))),
        }
    }

    pub fn pop_cont(&mut self) -> Result<Cont, LispError> {
        match self.pop_slot()? {
            StackSlot::Cont(c) => Ok(c),
            slot => Err(LispError::type_err(format!(
                "expected cont on stack, got {:?}",
                slot
            ))),
        }
    }

    pub fn pop_ce(&mut self) -> Result<(), LispError> {
        self.env = self.pop_env()?;
        self.cont = self.pop_cont()?;
        Ok(())
    }

    // ----- argument list helpers -----------------------------------------

    pub fn unpack1(&self) -> Result<Value, LispError> {
        match uncons(&self.argl) {
            Some((x, Value::Nil)) => Ok(x),
            _ => Err(LispError::syntax("expected one arg")),
        }
    }

    pub fn unpack2(&self) -> Result<(Value, Value), LispError> {
        if let Some((x, rest)) = uncons(&self.argl) {
            if let Some((y, Value::Nil)) = uncons(&rest) {
                return Ok((x, y));
            }
        }
        Err(LispError::syntax("expected two args"))
    }

    pub fn unpack3(&self) -> Result<(Value, Value, Value), LispError> {
        if let Some((x, rest)) = uncons(&self.argl) {
            if let Some((y, rest)) = uncons(&rest) {
                if let Some((z, Value::Nil)) = uncons(&rest) {
                    return Ok((x, y, z));
                }
            }
        }
        Err(LispError::syntax("expected three args"))
    }

    // ----- state management ----------------------------------------------

    pub fn save(&self) -> Snapshot {
        Snapshot {
            argl: self.argl.clone(),
            cont: self.cont,
            env: self.env.clone(),
            exp: self.exp.clone(),
            val: self.val.clone(),
            s: self.s.clone(),
        }
    }

    pub fn restore(&mut self, snap: &Snapshot) {
        self.argl = snap.argl.clone();
        self.cont = snap.cont;
        self.env = snap.env.clone();
        self.exp = snap.exp.clone();
        self.val = snap.val.clone();
        self.s = snap.s.clone();
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

// ----- core evaluation steps ----------------------------------------------

/// Dispatch `exp`: symbols look up through the environment chain, non-pairs
/// are self-evaluating, pairs resolve their operator and, unless it is
/// `special`, evaluate arguments left to right.
pub fn k_leval(ctx: &mut Context) -> Result<Step, LispError> {
    let x = std::mem::take(&mut ctx.exp);
    let (op, args) = match x {
        Value::Symbol(sym) => {
            let v = ctx
                .env
                .get(&sym)
                .ok_or_else(|| LispError::name(sym.as_str()))?;
            ctx.val = v;
            return Ok(Step::Run(ctx.cont));
        }
        Value::Pair(p) => (p.head(), p.tail()),
        other => {
            ctx.val = other;
            return Ok(Step::Run(ctx.cont));
        }
    };

    let op = match op {
        Value::Symbol(sym) => {
            let v = ctx
                .env
                .get(&sym)
                .ok_or_else(|| LispError::name(sym.as_str()))?;
            if let Value::Proc(p) = &v {
                if p.is_special() {
                    // special forms get the raw argument list
                    ctx.argl = args;
                    return Ok(Step::Apply(p.clone()));
                }
            }
            v
        }
        other => other,
    };

    ctx.push_cont(ctx.cont);
    ctx.push_env(ctx.env.clone());
    ctx.push(args);
    match op {
        Value::Proc(_) => {
            ctx.val = op;
            Ok(Step::Run(Cont::ProcDone))
        }
        Value::Pair(_) => {
            ctx.cont = Cont::ProcDone;
            ctx.exp = op;
            Ok(Step::Eval)
        }
        other => Err(LispError::syntax(format!(
            "expected list or proc, got {}",
            other.type_name()
        ))),
    }
}

/// The operator value is ready in `val`; start evaluating arguments, or
/// invoke straight away for no arguments or a late-resolved special form.
fn k_leval_proc_done(ctx: &mut Context) -> Result<Step, LispError> {
    let proc = match std::mem::take(&mut ctx.val) {
        Value::Proc(p) => p,
        other => {
            return Err(LispError::syntax(format!(
                "expected callable, got {}",
                other.type_name()
            )));
        }
    };
    ctx.argl = ctx.pop()?;
    ctx.env = ctx.pop_env()?;

    if ctx.argl.is_nil() || proc.is_special() {
        ctx.cont = ctx.pop_cont()?;
        return Ok(Step::Apply(proc));
    }

    ctx.push(Value::Proc(proc));
    ctx.push_mark();
    ctx.push_env(ctx.env.clone());

    let (first, rest) = match uncons(&ctx.argl) {
        Some(pair) => pair,
        None => {
            return Err(LispError::type_err(format!(
                "expected list, got {}",
                ctx.argl.type_name()
            )));
        }
    };
    ctx.exp = first;
    set_up_next_arg(ctx, rest)?;
    Ok(Step::Eval)
}

/// An argument value arrived; stash it and evaluate the next one.
fn k_leval_next(ctx: &mut Context) -> Result<Step, LispError> {
    let args = ctx.pop()?;
    ctx.env = ctx.pop_env()?;

    let done = std::mem::take(&mut ctx.val);
    ctx.push(done);
    ctx.push_env(ctx.env.clone());

    let (first, rest) = match uncons(&args) {
        Some(pair) => pair,
        None => {
            return Err(LispError::type_err(format!(
                "expected list, got {}",
                args.type_name()
            )));
        }
    };
    ctx.exp = first;
    set_up_next_arg(ctx, rest)?;
    Ok(Step::Eval)
}

fn set_up_next_arg(ctx: &mut Context, rest: Value) -> Result<(), LispError> {
    match rest {
        Value::Nil => ctx.cont = Cont::ArgLast,
        Value::Pair(_) => {
            ctx.push(rest);
            ctx.cont = Cont::ArgNext;
        }
        other => {
            return Err(LispError::type_err(format!(
                "expected list, got {}",
                other.type_name()
            )));
        }
    }
    Ok(())
}

/// The last argument arrived; rebuild the argument list in source order and
/// tail-invoke the operator with the caller's continuation.
fn k_leval_last(ctx: &mut Context) -> Result<Step, LispError> {
    ctx.env = ctx.pop_env()?;
    let mut args = crate::value::cons(std::mem::take(&mut ctx.val), Value::Nil);
    loop {
        match ctx.pop_slot()? {
            StackSlot::Mark => break,
            StackSlot::Val(v) => args = crate::value::cons(v, args),
            slot => {
                return Err(LispError::type_err(format!(
                    "expected value on stack, got {:?}",
                    slot
                )));
            }
        }
    }
    ctx.argl = args;
    let proc = match ctx.pop()? {
        Value::Proc(p) => p,
        other => {
            return Err(LispError::syntax(format!(
                "expected callable, got {}",
                other.type_name()
            )));
        }
    };
    ctx.cont = ctx.pop_cont()?;
    Ok(Step::Apply(proc))
}

/// Invoke a procedure on `argl`. Closures reuse the outgoing continuation,
/// which is what makes Lisp-level tail calls O(1) on the host stack.
pub fn apply(ctx: &mut Context, proc: Rc<Proc>) -> Result<Step, LispError> {
    match &proc.kind {
        ProcKind::Primitive { run, .. } => run(ctx),
        ProcKind::Ffi { run, .. } => {
            let host_args = ffi::lisp_args_to_host(&ctx.argl)?;
            let ret = run(host_args)?;
            ctx.val = ffi::host_to_lisp(ctx, ret);
            Ok(Step::Run(ctx.cont))
        }
        ProcKind::Closure { params, body, env } => {
            let parent = if proc.is_special() {
                ctx.env.clone()
            } else {
                env.clone()
            };
            let amp = ctx.amp.clone();
            ctx.env = Env::bind(&amp, params, &ctx.argl, &parent)?;
            ctx.exp = body.clone();
            Ok(Step::Eval)
        }
        ProcKind::Continuation { saved } => {
            let x = ctx.unpack1()?;
            let snap = saved.clone();
            ctx.restore(&snap);
            ctx.val = x;
            Ok(Step::Run(ctx.cont))
        }
    }
}

/// Capture the current registers and stack as an invocable continuation.
pub fn create_continuation(ctx: &Context) -> Value {
    Proc::continuation(ctx.save())
}
