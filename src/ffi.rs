// ABOUTME: Host-value bridge converting datums across an FFI call

use crate::error::LispError;
use crate::eval::Context;
use crate::value::{ListBuilder, Value};

/// Host-native shape of a datum for `ffi`-flagged procedures. `()` maps to
/// `Null`, `#t` to `Bool(true)`, proper lists to sequences; other atoms pass
/// through (procedures ride along opaquely in `Other`).
#[derive(Debug, Clone)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Sym(String),
    List(Vec<HostValue>),
    Other(Value),
}

/// Convert one datum to its host-native form.
pub fn lisp_to_host(v: &Value) -> Result<HostValue, LispError> {
    match v {
        Value::Nil => Ok(HostValue::Null),
        Value::True => Ok(HostValue::Bool(true)),
        Value::Int(i) => Ok(HostValue::Int(*i)),
        Value::Float(f) => Ok(HostValue::Float(*f)),
        Value::Str(s) => Ok(HostValue::Str(s.to_string())),
        Value::Symbol(s) => Ok(HostValue::Sym(s.as_str().to_string())),
        Value::Pair(_) => {
            let mut out = Vec::new();
            let mut rest = v.clone();
            loop {
                match rest {
                    Value::Pair(p) => {
                        out.push(lisp_to_host(&p.head())?);
                        rest = p.tail();
                    }
                    Value::Nil => break,
                    other => {
                        return Err(LispError::type_err(format!(
                            "expected list, got {}",
                            other.type_name()
                        )));
                    }
                }
            }
            Ok(HostValue::List(out))
        }
        Value::Proc(_) => Ok(HostValue::Other(v.clone())),
    }
}

/// Convert an argument list (a proper list) to a host argument vector.
pub fn lisp_args_to_host(argl: &Value) -> Result<Vec<HostValue>, LispError> {
    match lisp_to_host(argl)? {
        HostValue::Null => Ok(Vec::new()),
        HostValue::List(items) => Ok(items),
        _ => Err(LispError::type_err(format!(
            "expected list, got {}",
            argl.type_name()
        ))),
    }
}

/// Convert a host return value back to a datum. Empty sequences become `()`,
/// non-empty ones proper lists built front to back.
pub fn host_to_lisp(ctx: &mut Context, h: HostValue) -> Value {
    match h {
        HostValue::Null | HostValue::Bool(false) => Value::Nil,
        HostValue::Bool(true) => Value::True,
        HostValue::Int(i) => Value::Int(i),
        HostValue::Float(f) => Value::Float(f),
        HostValue::Str(s) => Value::string(s),
        HostValue::Sym(s) => Value::Symbol(ctx.symbol(&s)),
        HostValue::List(items) => {
            if items.is_empty() {
                return Value::Nil;
            }
            let mut lb = ListBuilder::new();
            for item in items {
                lb.push(host_to_lisp(ctx, item));
            }
            lb.finish()
        }
        HostValue::Other(v) => v,
    }
}
