//! FFI-flagged primitives. Arguments cross the host bridge before the call
//! and the return value crosses back, so these functions never see a pair.

use crate::error::LispError;
use crate::eval::Context;
use crate::ffi::HostValue;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn register(ctx: &mut Context) {
    ctx.define_ffi("time", ffi_time);
    ctx.define_ffi("random", ffi_random);
    ctx.define_ffi("shuffle", ffi_shuffle);
}

/// `(time 'time)` is seconds since the epoch as a float.
fn ffi_time(args: Vec<HostValue>) -> Result<HostValue, LispError> {
    match args.first() {
        Some(HostValue::Sym(name)) if name == "time" => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| LispError::User(e.to_string()))?;
            Ok(HostValue::Float(now.as_secs_f64()))
        }
        Some(HostValue::Sym(name)) => Err(LispError::type_err(format!(
            "function {:?} does not exist",
            name
        ))),
        _ => Err(LispError::type_err("expected symbol")),
    }
}

/// `(random 'random)` is uniform in [0, 1); `(random 'randint lo hi)` is an
/// integer in [lo, hi].
fn ffi_random(args: Vec<HostValue>) -> Result<HostValue, LispError> {
    let mut rng = rand::thread_rng();
    match args.first() {
        Some(HostValue::Sym(name)) if name == "random" => {
            Ok(HostValue::Float(rng.gen::<f64>()))
        }
        Some(HostValue::Sym(name)) if name == "randint" => match (args.get(1), args.get(2)) {
            (Some(HostValue::Int(lo)), Some(HostValue::Int(hi))) if lo <= hi => {
                Ok(HostValue::Int(rng.gen_range(*lo..=*hi)))
            }
            _ => Err(LispError::type_err("randint expects two integers")),
        },
        Some(HostValue::Sym(name)) => Err(LispError::type_err(format!(
            "function {:?} does not exist",
            name
        ))),
        _ => Err(LispError::type_err("expected symbol")),
    }
}

/// Permute a proper list.
fn ffi_shuffle(args: Vec<HostValue>) -> Result<HostValue, LispError> {
    match args.into_iter().next() {
        Some(HostValue::List(mut items)) => {
            items.shuffle(&mut rand::thread_rng());
            Ok(HostValue::List(items))
        }
        Some(HostValue::Null) => Ok(HostValue::Null),
        _ => Err(LispError::type_err("expected list")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn run(ctx: &mut Context, src: &str) -> Vec<Value> {
        ctx.execute(src).unwrap()
    }

    #[test]
    fn test_time_returns_float() {
        let mut ctx = Context::new();
        let out = run(&mut ctx, "(time 'time)");
        assert!(matches!(out[0], Value::Float(f) if f > 0.0));
    }

    #[test]
    fn test_unknown_time_function() {
        let mut ctx = Context::new();
        assert!(matches!(
            ctx.execute("(time 'nope)"),
            Err(LispError::Type(_))
        ));
    }

    #[test]
    fn test_random_range() {
        let mut ctx = Context::new();
        for _ in 0..16 {
            let out = run(&mut ctx, "(random 'random)");
            assert!(matches!(out[0], Value::Float(f) if (0.0..1.0).contains(&f)));
            let out = run(&mut ctx, "(random 'randint 3 5)");
            assert!(matches!(out[0], Value::Int(i) if (3..=5).contains(&i)));
        }
    }

    #[test]
    fn test_shuffle_preserves_elements() {
        let mut ctx = Context::new();
        let out = run(&mut ctx, "(shuffle (range 0 10 1))");
        let mut seen = Vec::new();
        let mut rest = out[0].clone();
        while let Value::Pair(p) = rest {
            if let Value::Int(i) = p.head() {
                seen.push(i);
            }
            rest = p.tail();
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_empty() {
        let mut ctx = Context::new();
        let out = run(&mut ctx, "(shuffle ())");
        assert!(out[0].is_nil());
    }
}
