// ABOUTME: Embedded Lisp runtime library and its loader

use crate::error::LispError;
use crate::eval::Context;

/// The Lisp-level runtime library, compiled into the binary.
pub const RUNTIME: &str = include_str!("runtime.lisp");

/// Evaluate the runtime library into a context's global frame. The engine
/// never requires this; the shell and anything wanting `+`, `let`, `map` and
/// friends does.
pub fn load(ctx: &mut Context) -> Result<(), LispError> {
    ctx.execute(RUNTIME)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_loads() {
        let mut ctx = Context::new();
        load(&mut ctx).unwrap();
        let out = ctx.execute("(+ 1 2)").unwrap();
        assert_eq!(ctx.stringify(&out[0]).unwrap(), "3");
    }
}
