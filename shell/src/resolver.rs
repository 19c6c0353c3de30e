//! Expansion of raw tokens into final argument strings.
//!
//! Quote removal, command substitution and wildcard expansion all happen here,
//! one token at a time.

use crate::error::{Result, ShellError};
use crate::glob::GlobArgument;
use crate::lexer::Token;
use std::path::Path;
use std::str::Chars;
use tracing::trace;

/// What the resolver needs from the interpreter that owns it.
pub trait Substitution {
    /// Interprets `line` against empty input and returns its captured output.
    fn substitute(&mut self, line: &str) -> Result<String>;

    /// Directory against which relative glob patterns are expanded.
    fn current_dir(&self) -> &Path;
}

/// Turns raw tokens into argument strings.
///
/// Holds a reference to its host so that back-quoted spans re-enter the full
/// interpretation pipeline synchronously.
pub struct ArgumentResolver<'h, S: ?Sized> {
    host: &'h mut S,
}

impl<'h, S: Substitution + ?Sized> ArgumentResolver<'h, S> {
    pub fn new(host: &'h mut S) -> Self {
        ArgumentResolver { host }
    }

    pub fn current_dir(&self) -> &Path {
        self.host.current_dir()
    }

    /// Resolves every token in order, flattening the expansions.
    pub fn resolve(&mut self, tokens: &[Token]) -> Result<Vec<String>> {
        let mut args = Vec::with_capacity(tokens.len());
        for token in tokens {
            args.extend(self.resolve_token(token)?);
        }
        Ok(args)
    }

    /// Resolves a single token, which may expand to any number of arguments.
    pub fn resolve_token(&mut self, token: &Token) -> Result<Vec<String>> {
        let units = self.split_units(token.as_str())?;
        let current_dir = self.host.current_dir();
        let mut args = Vec::with_capacity(units.len());
        for unit in units {
            if unit.has_wildcard() {
                args.extend(unit.glob_files(current_dir));
            } else {
                args.push(unit.into_literal());
            }
        }
        trace!(token = %token, expanded = ?args, "resolved token");
        Ok(args)
    }

    fn split_units(&mut self, raw: &str) -> Result<Vec<GlobArgument>> {
        let mut units = Vec::new();
        let mut current = GlobArgument::new();
        // An argument exists once anything (even an empty quote pair) was seen.
        let mut started = false;
        let mut chars = raw.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '\'' => {
                    let quoted = take_until(&mut chars, '\'')
                        .ok_or_else(|| ShellError::syntax("unmatched single quote"))?;
                    current.merge_str(&quoted);
                    started = true;
                }
                '"' => {
                    self.resolve_double_quoted(&mut chars, &mut current)?;
                    started = true;
                }
                '`' => {
                    let line = take_until(&mut chars, '`')
                        .ok_or_else(|| ShellError::syntax("unmatched backquote"))?;
                    let output = self.run_substitution(&line)?;
                    let mut words = output.split_whitespace().peekable();
                    // No words: the surrounding text stays one argument.
                    if words.peek().is_none() {
                        continue;
                    }
                    if started {
                        units.push(std::mem::take(&mut current));
                        started = false;
                    }
                    units.extend(words.map(GlobArgument::from_pattern));
                }
                '*' => {
                    current.append_wildcard();
                    started = true;
                }
                c => {
                    current.append(c);
                    started = true;
                }
            }
        }

        if started {
            units.push(current);
        }
        Ok(units)
    }

    fn resolve_double_quoted(
        &mut self,
        chars: &mut Chars<'_>,
        current: &mut GlobArgument,
    ) -> Result<()> {
        while let Some(ch) = chars.next() {
            match ch {
                '"' => return Ok(()),
                '`' => {
                    let line = take_until(chars, '`')
                        .ok_or_else(|| ShellError::syntax("unmatched backquote"))?;
                    let output = self.run_substitution(&line)?;
                    current.merge_str(&output);
                }
                c => current.append(c),
            }
        }
        Err(ShellError::syntax("unmatched double quote").into())
    }

    fn run_substitution(&mut self, line: &str) -> Result<String> {
        if line.trim().is_empty() {
            return Ok(String::new());
        }
        trace!(line, "command substitution");
        let output = self.host.substitute(line)?;
        Ok(output.trim_end_matches(['\n', '\r']).to_string())
    }
}

fn take_until(chars: &mut Chars<'_>, end: char) -> Option<String> {
    let mut taken = String::new();
    for ch in chars.by_ref() {
        if ch == end {
            return Some(taken);
        }
        taken.push(ch);
    }
    None
}
