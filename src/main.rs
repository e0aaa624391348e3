// ABOUTME: Shell layer: CLI entry, script execution, interactive REPL

use clap::Parser;
use pochard::config::{
    CONTINUE_PROMPT, HISTORY_FILE, PROMPT, VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE,
};
use pochard::error::{ExitStatus, LispError};
use pochard::eval::Context;
use pochard::parser::Reader;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::PathBuf;
use std::process::ExitCode;

/// Lisp interpreter with proper tail calls and first-class continuations
#[derive(Parser, Debug)]
#[command(name = "pochard")]
#[command(version = VERSION)]
#[command(about = "A trampolined Lisp interpreter")]
struct CliArgs {
    /// Script file to execute (omit to start the REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Evaluate one expression and exit
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    expr: Option<String>,

    /// Skip loading the Lisp runtime library
    #[arg(long = "no-runtime")]
    no_runtime: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let mut ctx = Context::new();

    if !args.no_runtime {
        if let Err(e) = pochard::runtime::load(&mut ctx) {
            eprintln!("runtime library failed to load: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let outcome = if let Some(expr) = args.expr.as_deref() {
        run_source(&mut ctx, expr)
    } else if let Some(path) = args.script.as_deref() {
        match std::fs::read_to_string(path) {
            Ok(text) => run_source(&mut ctx, &text),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        repl(&mut ctx)
    };
    exit_code(outcome)
}

/// Evaluate every top-level form, printing each non-`()` value.
fn run_source(ctx: &mut Context, text: &str) -> Result<(), LispError> {
    pochard::parser::read(ctx, text, &mut |ctx, expr| {
        let value = ctx.eval(expr)?;
        if !value.is_nil() {
            println!("{}", ctx.stringify(&value)?);
        }
        Ok(())
    })
}

fn repl(ctx: &mut Context) -> Result<(), LispError> {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl =
        DefaultEditor::with_config(config).map_err(|e| LispError::User(e.to_string()))?;
    let _ = rl.load_history(HISTORY_FILE);

    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);

    // one reader across lines so an open form can span them
    let mut reader = Reader::new();
    let outcome = loop {
        let prompt = if reader.at_top_level() {
            PROMPT
        } else {
            CONTINUE_PROMPT
        };
        match rl.readline(prompt) {
            Ok(mut line) => {
                line.push('\n');
                let fed = reader.feed(ctx, &line, &mut |ctx, expr| {
                    let value = ctx.eval(expr)?;
                    if !value.is_nil() {
                        println!("{}", ctx.stringify(&value)?);
                    }
                    Ok(())
                });
                if let Err(e) = fed {
                    if matches!(e, LispError::Exit(_)) {
                        break Err(e);
                    }
                    eprintln!("{}", e);
                    ctx.clear_stack();
                    reader = Reader::new();
                }
            }
            Err(ReadlineError::Interrupted) => {
                ctx.clear_stack();
                reader = Reader::new();
            }
            Err(ReadlineError::Eof) => break Ok(()),
            Err(e) => {
                eprintln!("{}", e);
                break Ok(());
            }
        }
    };
    let _ = rl.save_history(HISTORY_FILE);
    println!("bye");
    outcome
}

fn exit_code(outcome: Result<(), LispError>) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(LispError::Exit(ExitStatus::Code(code))) => ExitCode::from((code & 0xff) as u8),
        Err(LispError::Exit(ExitStatus::Message(message))) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
