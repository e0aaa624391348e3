//! Output primitives: print, obj>string.

use crate::error::LispError;
use crate::eval::{Context, Step};
use crate::printer::stringify;
use crate::value::{uncons, Value};

pub fn register(ctx: &mut Context) {
    ctx.define_prim("print", op_print);
    ctx.define_prim("obj>string", op_obj_to_string);
}

/// Print the stringified arguments separated by spaces, then a newline.
fn op_print(ctx: &mut Context) -> Result<Step, LispError> {
    let mut parts = Vec::new();
    let mut args = ctx.argl.clone();
    while !args.is_nil() {
        let (head, rest) = uncons(&args).ok_or_else(|| {
            LispError::type_err(format!("expected list, got {}", args.type_name()))
        })?;
        parts.push(stringify(&head)?);
        args = rest;
    }
    println!("{}", parts.join(" "));
    ctx.val = Value::Nil;
    Ok(Step::Run(ctx.cont))
}

fn op_obj_to_string(ctx: &mut Context) -> Result<Step, LispError> {
    let x = ctx.unpack1()?;
    ctx.val = Value::string(stringify(&x)?);
    Ok(Step::Run(ctx.cont))
}
