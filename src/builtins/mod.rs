//! # Built-in procedures
//!
//! Everything pre-bound in a fresh context's global frame, organized by
//! category:
//!
//! - **[special_forms]**: quote, if, cond, define, set!, lambda, special,
//!   begin/do, quasiquote, trap
//! - **[lists]**: cons, car, cdr, set-car!, set-cdr!, null?, range
//! - **[arithmetic]**: sub/-, mul/*, div//, nand, lt?/<
//! - **[types]**: atom?, eq?, equal?, type
//! - **[control]**: apply, call/cc, eval, while, error, exit
//! - **[console]**: print, obj>string
//! - **[host]**: time, random, shuffle (FFI-bridged)
//!
//! The surface is deliberately small; the runtime library builds the rest of
//! the language out of these in Lisp itself.

use crate::eval::Context;

pub mod arithmetic;
pub mod console;
pub mod control;
pub mod host;
pub mod lists;
pub mod special_forms;
pub mod types;

/// Register every builtin category into the context's global frame.
pub fn register_builtins(ctx: &mut Context) {
    special_forms::register(ctx);
    lists::register(ctx);
    arithmetic::register(ctx);
    types::register(ctx);
    control::register(ctx);
    console::register(ctx);
    host::register(ctx);
}
