//! Shared helpers for integration tests.
//!
//! `read` is a minimal s-expression reader so tests can be written as
//! source text: integers, symbols, parenthesised lists and `'x` for
//! `(quote x)`. It is deliberately strict and panics on malformed input.

#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use parthial_eval::{default_globals, EvalContext, Globals, LispError, Value};

/// Parse a single expression.
pub fn read(source: &str) -> Value {
    let mut chars = source.chars().peekable();
    let value = read_value(&mut chars);
    skip_whitespace(&mut chars);
    assert!(chars.peek().is_none(), "trailing input in {source:?}");
    value
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_value(chars: &mut Peekable<Chars<'_>>) -> Value {
    skip_whitespace(chars);
    match chars.peek().copied() {
        Some('(') => {
            chars.next();
            let mut items = Vec::new();
            loop {
                skip_whitespace(chars);
                match chars.peek() {
                    Some(')') => {
                        chars.next();
                        return Value::list(items);
                    }
                    Some(_) => items.push(read_value(chars)),
                    None => panic!("unclosed list"),
                }
            }
        }
        Some('\'') => {
            chars.next();
            Value::list(vec![Value::symbol("quote"), read_value(chars)])
        }
        Some(')') => panic!("unexpected `)`"),
        Some(_) => {
            let mut atom = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' {
                    break;
                }
                atom.push(c);
                chars.next();
            }
            match atom.parse::<i64>() {
                Ok(n) => Value::int(n),
                Err(_) => Value::symbol(atom),
            }
        }
        None => panic!("unexpected end of input"),
    }
}

pub fn globals() -> Arc<Globals> {
    Arc::new(default_globals())
}

pub fn context() -> EvalContext {
    EvalContext::new(globals())
}

/// Read and run `source` in `ctx`.
pub fn eval_in(ctx: &mut EvalContext, source: &str) -> Result<Value, LispError> {
    ctx.run(read(source)).map(|out| out.value)
}

/// Read and run `source` in a fresh default context.
pub fn eval(source: &str) -> Result<Value, LispError> {
    eval_in(&mut context(), source)
}
