use crate::error::{EMPTY_ARGUMENTS, Error, Result, ShellError};
use crate::env::resolve_in;
use crate::io_adapters::{InputStream, OutputStream};
use crate::lexer::{RedirectKind, Token};
use crate::resolver::{ArgumentResolver, Substitution};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::debug;

/// Effective streams of a call plus the tokens left once redirections are removed.
pub struct Redirection<'a> {
    pub input: InputStream<'a>,
    pub output: OutputStream<'a>,
    pub args: Vec<Token>,
}

/// Strips `<` / `>` operators and their targets from a call's tokens.
pub struct RedirectionHandler;

impl RedirectionHandler {
    /// Scans `args` left to right, resolving each redirection target through
    /// `resolver`.
    ///
    /// Every operator must be followed by a target that expands to exactly one
    /// path. When an operator appears several times the last occurrence wins;
    /// earlier targets are validated but never opened. Without any operator the
    /// caller's streams are handed back unchanged.
    pub fn extract<'a, S: Substitution + ?Sized>(
        args: &[Token],
        stdin: &'a mut dyn Read,
        stdout: &'a mut dyn Write,
        resolver: &mut ArgumentResolver<'_, S>,
    ) -> Result<Redirection<'a>> {
        if args.is_empty() {
            return Err(ShellError::syntax(EMPTY_ARGUMENTS).into());
        }

        let mut remaining = Vec::with_capacity(args.len());
        // (target as written after expansion, path to open)
        let mut input_target: Option<(String, PathBuf)> = None;
        let mut output_target: Option<(String, PathBuf)> = None;

        let mut tokens = args.iter();
        while let Some(token) = tokens.next() {
            let Some(kind) = token.redirect_kind() else {
                remaining.push(token.clone());
                continue;
            };
            let target = match tokens.next() {
                Some(target) if target.redirect_kind().is_none() => target,
                _ => {
                    return Err(ShellError::syntax(format!(
                        "missing redirection target after '{}'",
                        kind.symbol()
                    ))
                    .into());
                }
            };

            let mut resolved = resolver.resolve_token(target)?;
            if resolved.len() != 1 {
                return Err(ShellError::syntax(format!(
                    "ambiguous redirection target '{target}'"
                ))
                .into());
            }
            let shown = resolved.remove(0);
            let path = resolve_in(resolver.current_dir(), &shown);
            debug!(symbol = %kind.symbol(), path = %path.display(), "redirection");
            match kind {
                RedirectKind::Input => input_target = Some((shown, path)),
                RedirectKind::Output => output_target = Some((shown, path)),
            }
        }

        let input = match input_target {
            Some((shown, path)) => match File::open(&path) {
                Ok(file) => InputStream::Owned(BufReader::new(file)),
                Err(source) => return Err(redirect_error(shown, source)),
            },
            None => InputStream::Inherited(stdin),
        };
        let output = match output_target {
            Some((shown, path)) => match File::create(&path) {
                Ok(file) => OutputStream::Owned(BufWriter::new(file)),
                Err(source) => return Err(redirect_error(shown, source)),
            },
            None => OutputStream::Inherited(stdout),
        };

        Ok(Redirection {
            input,
            output,
            args: remaining,
        })
    }
}

fn redirect_error(target: String, source: io::Error) -> Error {
    ShellError::Redirect {
        path: PathBuf::from(target),
        source,
    }
    .into()
}
