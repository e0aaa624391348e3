// ABOUTME: Character-at-a-time reader turning source text into datums

use crate::error::LispError;
use crate::eval::Context;
use crate::value::{cons, ListBuilder, Symbol, Value};

/// Callback receiving each completed top-level datum.
pub type Sink<'a> = &'a mut dyn FnMut(&mut Context, Value) -> Result<(), LispError>;

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    /// Building a bare token (or between tokens)
    Sym,
    /// Skipping to end of line after `;`
    Comment,
    /// Inside a string literal
    Str,
    /// One character after a backslash in a string
    Esc,
    /// One character after `,`, deciding between `,` and `,@`
    Comma,
}

/// Pending reader-quote wrappers. A `Boundary` entry marks an open list so
/// wrappers never leak across it.
enum QuoteEntry {
    Boundary,
    Wrap(Symbol),
}

/// Incremental push reader. Feed it text a chunk at a time (a REPL feeds one
/// line per call, so an open list may span lines) and call `finish` at end
/// of input; every completed top-level datum goes to the sink.
pub struct Reader {
    state: State,
    token: String,
    /// expected closer for each open `(` or `[`
    parens: Vec<char>,
    quotes: Vec<QuoteEntry>,
    lists: Vec<ListBuilder>,
}

impl Default for Reader {
    fn default() -> Self {
        Reader::new()
    }
}

impl Reader {
    pub fn new() -> Reader {
        Reader {
            state: State::Sym,
            token: String::new(),
            parens: Vec::new(),
            quotes: Vec::new(),
            lists: Vec::new(),
        }
    }

    /// True when no datum is partially read (useful for REPL prompts).
    pub fn at_top_level(&self) -> bool {
        self.parens.is_empty()
            && self.quotes.is_empty()
            && self.token.is_empty()
            && self.state == State::Sym
    }

    fn state(&self) -> State {
        self.state
    }

    fn set_state(&mut self, s: State) {
        self.state = s;
    }

    pub fn feed(
        &mut self,
        ctx: &mut Context,
        text: &str,
        sink: Sink,
    ) -> Result<(), LispError> {
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            let consumed = match self.state() {
                State::Sym => {
                    self.do_sym(ctx, ch, sink)?;
                    true
                }
                State::Comment => {
                    if ch == '\n' || ch == '\r' {
                        self.set_state(State::Sym);
                    }
                    true
                }
                State::Str => {
                    self.do_string(ctx, ch, sink)?;
                    true
                }
                State::Esc => {
                    self.do_escape(ch)?;
                    true
                }
                // `,@` consumes the `@`; anything else is re-read as part of
                // the next token
                State::Comma => self.do_comma(ctx, ch),
            };
            if consumed {
                i += 1;
            }
        }
        Ok(())
    }

    /// Signal end of input: flush any pending token and require every
    /// construct to be closed.
    pub fn finish(&mut self, ctx: &mut Context, sink: Sink) -> Result<(), LispError> {
        match self.state() {
            State::Sym | State::Comment => {}
            State::Str | State::Esc => {
                return Err(LispError::syntax("eof inside string literal"));
            }
            State::Comma => return Err(LispError::syntax("eof after ,")),
        }
        self.complete_token(ctx, sink)?;
        if let Some(closer) = self.parens.last() {
            return Err(LispError::syntax(format!("eof expecting {:?}", closer)));
        }
        if !self.quotes.is_empty() {
            return Err(LispError::syntax("unclosed quasiquote"));
        }
        Ok(())
    }

    fn do_sym(&mut self, ctx: &mut Context, ch: char, sink: Sink) -> Result<(), LispError> {
        match ch {
            '(' | '[' => {
                self.complete_token(ctx, sink)?;
                self.parens.push(if ch == '(' { ')' } else { ']' });
                self.quotes.push(QuoteEntry::Boundary);
                self.lists.push(ListBuilder::new());
                Ok(())
            }
            ')' | ']' => {
                self.complete_token(ctx, sink)?;
                let closer = self
                    .parens
                    .pop()
                    .ok_or_else(|| LispError::syntax(format!("too many {:?}", ch)))?;
                if closer != ch {
                    return Err(LispError::syntax(format!("unexpected {:?}", ch)));
                }
                self.quotes.pop();
                let builder = self
                    .lists
                    .pop()
                    .ok_or_else(|| LispError::syntax("unbalanced list"))?;
                self.emit(ctx, sink, builder.finish())
            }
            ' ' | '\n' | '\r' | '\t' => self.complete_token(ctx, sink),
            ';' => {
                self.complete_token(ctx, sink)?;
                self.set_state(State::Comment);
                Ok(())
            }
            '"' | '\'' | '`' | ',' => {
                if !self.token.is_empty() {
                    return Err(LispError::syntax(format!("{:?} not a delimiter", ch)));
                }
                match ch {
                    '"' => self.set_state(State::Str),
                    '\'' => self.quotes.push(QuoteEntry::Wrap(ctx.quotes.quote.clone())),
                    '`' => self
                        .quotes
                        .push(QuoteEntry::Wrap(ctx.quotes.quasiquote.clone())),
                    _ => self.set_state(State::Comma),
                }
                Ok(())
            }
            _ => {
                self.token.push(ch);
                Ok(())
            }
        }
    }

    fn do_string(&mut self, ctx: &mut Context, ch: char, sink: Sink) -> Result<(), LispError> {
        match ch {
            '"' => {
                let text = std::mem::take(&mut self.token);
                self.set_state(State::Sym);
                self.emit(ctx, sink, Value::string(text))
            }
            '\\' => {
                self.set_state(State::Esc);
                Ok(())
            }
            _ => {
                self.token.push(ch);
                Ok(())
            }
        }
    }

    fn do_escape(&mut self, ch: char) -> Result<(), LispError> {
        let c = match ch {
            '\\' => '\\',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '"' => '"',
            _ => return Err(LispError::syntax(format!("bad escape {:?}", ch))),
        };
        self.token.push(c);
        self.set_state(State::Str);
        Ok(())
    }

    fn do_comma(&mut self, ctx: &mut Context, ch: char) -> bool {
        self.set_state(State::Sym);
        if ch == '@' {
            self.quotes
                .push(QuoteEntry::Wrap(ctx.quotes.unquote_splicing.clone()));
            true
        } else {
            self.quotes
                .push(QuoteEntry::Wrap(ctx.quotes.unquote.clone()));
            false
        }
    }

    /// Classify and deliver the pending token, if any.
    fn complete_token(&mut self, ctx: &mut Context, sink: Sink) -> Result<(), LispError> {
        if self.token.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.token);
        let datum = classify_token(ctx, &text);
        self.emit(ctx, sink, datum)
    }

    /// Apply pending quote wrappers down to the nearest list boundary, then
    /// deliver to the innermost open list or the sink.
    fn emit(&mut self, ctx: &mut Context, sink: Sink, x: Value) -> Result<(), LispError> {
        let mut x = x;
        while let Some(QuoteEntry::Wrap(_)) = self.quotes.last() {
            if let Some(QuoteEntry::Wrap(sym)) = self.quotes.pop() {
                x = cons(Value::Symbol(sym), cons(x, Value::Nil));
            }
        }
        match self.lists.last_mut() {
            Some(builder) => {
                builder.push(x);
                Ok(())
            }
            None => sink(ctx, x),
        }
    }
}

/// A token whose first character could begin a number is tried as an integer
/// (with `0x`/`0o`/`0b` auto-base detection), then as a float; everything
/// else is a symbol.
fn classify_token(ctx: &mut Context, text: &str) -> Value {
    let first = match text.chars().next() {
        Some(c) => c.to_ascii_lowercase(),
        None => return Value::Symbol(ctx.symbol(text)),
    };
    if matches!(first, '0'..='9' | '-' | '.' | '+' | 'a'..='f') {
        if let Some(i) = parse_int_auto(text) {
            return Value::Int(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::Symbol(ctx.symbol(text))
}

fn parse_int_auto(text: &str) -> Option<i64> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'+' => (false, &text[1..]),
        b'-' => (true, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()?
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Read a complete source text, delivering each top-level datum to the sink.
pub fn read(ctx: &mut Context, text: &str, sink: Sink) -> Result<(), LispError> {
    let mut reader = Reader::new();
    reader.feed(ctx, text, sink)?;
    reader.finish(ctx, sink)
}

/// Read a complete source text into a vector of datums.
pub fn read_all(ctx: &mut Context, text: &str) -> Result<Vec<Value>, LispError> {
    let mut out = Vec::new();
    read(ctx, text, &mut |_, datum| {
        out.push(datum);
        Ok(())
    })?;
    Ok(out)
}
