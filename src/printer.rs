// ABOUTME: Stringifier rendering any datum back to source-ish text

use crate::error::LispError;
use crate::value::{ProcKind, Value};

/// Render a datum as text.
///
/// Strings render unquoted (the surface syntax does not distinguish display
/// from write), `()` and `#t` by their readers' spellings, pairs as proper
/// lists. A dotted tail is a type error. Recursion depth follows datum
/// nesting, not list length, so deep spines are safe; cyclic structure is
/// the caller's problem.
pub fn stringify(v: &Value) -> Result<String, LispError> {
    match v {
        Value::Nil => Ok("()".to_string()),
        Value::True => Ok("#t".to_string()),
        Value::Symbol(s) => Ok(s.as_str().to_string()),
        Value::Int(i) => Ok(i.to_string()),
        // {:?} keeps a trailing ".0" on whole floats so they read back as floats
        Value::Float(f) => Ok(format!("{:?}", f)),
        Value::Str(s) => Ok(s.to_string()),
        Value::Pair(_) => {
            let mut parts = Vec::new();
            let mut rest = v.clone();
            loop {
                match rest {
                    Value::Pair(p) => {
                        parts.push(stringify(&p.head())?);
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
            Ok(format!("({})", parts.join(" ")))
        }
        Value::Proc(p) => match &p.kind {
            ProcKind::Closure { params, body, .. } => Ok(format!(
                "(lambda {} {})",
                stringify(params)?,
                stringify(body)?
            )),
            ProcKind::Continuation { .. } => Ok("<continuation>".to_string()),
            ProcKind::Primitive { .. } | ProcKind::Ffi { .. } => Ok("<primitive>".to_string()),
        },
    }
}
