//! An embeddable shell-like command interpreter.
//!
//! A line is split into lexemes, parsed into a command tree of calls, pipes
//! and sequences, then evaluated against a registry of in-process
//! applications. Arguments go through quote removal, backquote command
//! substitution and glob expansion before an application sees them; `<` and
//! `>` redirect a call's streams to files.
//!
//! The main entry point is [`Shell`]. The public modules [`command`] and
//! [`env`] expose the types needed to register your own applications.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
mod glob;
mod interpreter;
mod io_adapters;
mod lexer;
mod parser;
mod redirection;
mod resolver;

pub use command::{Application, ApplicationRegistry};
pub use env::Environment;
pub use error::{AppError, Error, Result, ShellError};
pub use glob::GlobArgument;
pub use interpreter::Shell;
pub use io_adapters::{InputStream, OutputStream};
pub use lexer::{RedirectKind, Token};
pub use parser::{Call, Command, parse};
pub use redirection::{Redirection, RedirectionHandler};
pub use resolver::{ArgumentResolver, Substitution};
