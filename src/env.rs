// ABOUTME: Lexical environments: symbol-to-value frames with parent links

use crate::error::LispError;
use crate::value::{Symbol, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A chain of mutable frames. Cloning an `Env` clones the handle, not the
/// frame, so closures and continuations share bindings with their creators.
#[derive(Clone)]
pub struct Env(Rc<Frame>);

struct Frame {
    vars: RefCell<HashMap<Symbol, Value>>,
    parent: Option<Env>,
}

impl Env {
    /// The root (global) frame, created once per context.
    pub fn root() -> Env {
        Env(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// A fresh empty frame whose lookups fall through to `parent`.
    pub fn child(parent: &Env) -> Env {
        Env(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        }))
    }

    pub fn parent(&self) -> Option<Env> {
        self.0.parent.clone()
    }

    /// Bind in this frame, shadowing any outer binding of the same name.
    pub fn define(&self, sym: Symbol, value: Value) {
        self.0.vars.borrow_mut().insert(sym, value);
    }

    /// Walk parents until a frame binds `sym`.
    pub fn get(&self, sym: &Symbol) -> Option<Value> {
        let mut env = self.clone();
        loop {
            if let Some(v) = env.0.vars.borrow().get(sym) {
                return Some(v.clone());
            }
            match env.parent() {
                Some(p) => env = p,
                None => return None,
            }
        }
    }

    /// Assign to the nearest frame that already binds `sym`.
    pub fn set(&self, sym: &Symbol, value: Value) -> Result<(), LispError> {
        let mut env = self.clone();
        loop {
            if env.0.vars.borrow().contains_key(sym) {
                env.0.vars.borrow_mut().insert(sym.clone(), value);
                return Ok(());
            }
            match env.parent() {
                Some(p) => env = p,
                None => return Err(LispError::name(sym.as_str())),
            }
        }
    }

    /// Build the frame for a procedure call: bind `params` (a proper list of
    /// symbols, with an optional `&` before one trailing symbol that takes
    /// the remaining arguments as a list) to `args` under `parent`.
    pub fn bind(amp: &Symbol, params: &Value, args: &Value, parent: &Env) -> Result<Env, LispError> {
        let frame = Env::child(parent);
        let mut params = params.clone();
        let mut args = args.clone();
        let mut variadic = false;
        loop {
            match params {
                Value::Nil => {
                    if variadic {
                        return Err(LispError::syntax("params end with &"));
                    }
                    if !args.is_nil() {
                        return Err(LispError::syntax("too many args"));
                    }
                    return Ok(frame);
                }
                Value::Pair(p) => {
                    let (head, rest) = (p.head(), p.tail());
                    let sym = match head {
                        Value::Symbol(s) => s,
                        other => {
                            return Err(LispError::syntax(format!(
                                "expected symbol, got {}",
                                other.type_name()
                            )));
                        }
                    };
                    if sym == *amp {
                        variadic = true;
                    } else if variadic {
                        if rest.is_nil() {
                            frame.define(sym, args);
                            return Ok(frame);
                        }
                        return Err(LispError::syntax("trailing junk after &"));
                    } else {
                        match args {
                            Value::Pair(a) => {
                                frame.define(sym, a.head());
                                args = a.tail();
                            }
                            Value::Nil => return Err(LispError::syntax("not enough args")),
                            _ => return Err(LispError::syntax("expected list")),
                        }
                    }
                    params = rest;
                }
                _ => return Err(LispError::syntax("expected list")),
            }
        }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // frames form cycles through closures; never walk them here
        write!(f, "<env {} bindings>", self.0.vars.borrow().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::cons;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    #[test]
    fn test_define_and_get() {
        let env = Env::root();
        let x = sym("x");
        env.define(x.clone(), Value::Int(42));
        assert!(matches!(env.get(&x), Some(Value::Int(42))));
        assert!(env.get(&sym("x")).is_none()); // different intern identity
    }

    #[test]
    fn test_shadowing_and_parent_lookup() {
        let root = Env::root();
        let x = sym("x");
        let y = sym("y");
        root.define(x.clone(), Value::Int(1));
        root.define(y.clone(), Value::Int(2));

        let child = Env::child(&root);
        child.define(x.clone(), Value::Int(10));
        assert!(matches!(child.get(&x), Some(Value::Int(10))));
        assert!(matches!(child.get(&y), Some(Value::Int(2))));
        assert!(matches!(root.get(&x), Some(Value::Int(1))));
    }

    #[test]
    fn test_set_mutates_nearest_binding() {
        let root = Env::root();
        let x = sym("x");
        root.define(x.clone(), Value::Int(1));
        let child = Env::child(&root);
        child.set(&x, Value::Int(5)).unwrap();
        assert!(matches!(root.get(&x), Some(Value::Int(5))));

        let missing = sym("missing");
        assert!(matches!(
            child.set(&missing, Value::Nil),
            Err(LispError::Name(_))
        ));
    }

    #[test]
    fn test_bind_positional() {
        let amp = sym("&");
        let root = Env::root();
        let a = sym("a");
        let b = sym("b");
        let params = cons(
            Value::Symbol(a.clone()),
            cons(Value::Symbol(b.clone()), Value::Nil),
        );
        let args = cons(Value::Int(1), cons(Value::Int(2), Value::Nil));
        let frame = Env::bind(&amp, &params, &args, &root).unwrap();
        assert!(matches!(frame.get(&a), Some(Value::Int(1))));
        assert!(matches!(frame.get(&b), Some(Value::Int(2))));
    }

    #[test]
    fn test_bind_variadic() {
        let amp = sym("&");
        let root = Env::root();
        let a = sym("a");
        let rest = sym("rest");
        let params = cons(
            Value::Symbol(a.clone()),
            cons(
                Value::Symbol(amp.clone()),
                cons(Value::Symbol(rest.clone()), Value::Nil),
            ),
        );
        let args = cons(
            Value::Int(1),
            cons(Value::Int(2), cons(Value::Int(3), Value::Nil)),
        );
        let frame = Env::bind(&amp, &params, &args, &root).unwrap();
        assert!(matches!(frame.get(&a), Some(Value::Int(1))));
        let bound = frame.get(&rest).unwrap();
        assert!(bound.is_pair());

        // () also binds the rest name
        let args1 = cons(Value::Int(1), Value::Nil);
        let frame = Env::bind(&amp, &params, &args1, &root).unwrap();
        assert!(matches!(frame.get(&rest), Some(Value::Nil)));
    }

    #[test]
    fn test_bind_arity_errors() {
        let amp = sym("&");
        let root = Env::root();
        let params = cons(Value::Symbol(sym("a")), Value::Nil);

        let none: Value = Value::Nil;
        assert!(Env::bind(&amp, &params, &none, &root).is_err());

        let two = cons(Value::Int(1), cons(Value::Int(2), Value::Nil));
        assert!(Env::bind(&amp, &params, &two, &root).is_err());

        // & with no trailing name
        let dangling = cons(Value::Symbol(amp.clone()), Value::Nil);
        assert!(Env::bind(&amp, &dangling, &none, &root).is_err());
    }
}
