use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Message used whenever a call node reaches evaluation without any words.
pub const EMPTY_ARGUMENTS: &str = "empty argument list";

/// Errors raised by the interpreter itself rather than by an application.
///
/// Only [`ShellError::Syntax`] is considered fatal by a sequence; the other
/// kinds are contained per step like application failures.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Malformed input: unbalanced quotes, dangling operators, empty calls,
    /// ambiguous or missing redirection targets.
    #[error("{0}")]
    Syntax(String),

    /// The first word of a call does not name a registered application.
    #[error("{0}: Invalid app")]
    InvalidApp(String),

    /// A redirection target could not be opened.
    #[error("{}: {}", path.display(), describe_io(source))]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing to the caller's output stream failed.
    #[error("output: {0}")]
    Stream(#[from] io::Error),
}

impl ShellError {
    pub fn syntax(message: impl Into<String>) -> Self {
        ShellError::Syntax(message.into())
    }
}

/// Failure raised by an application for a domain-specific condition.
///
/// Displays as `<app>: <message>`.
#[derive(Debug, Error)]
#[error("{app}: {message}")]
pub struct AppError {
    pub app: String,
    pub message: String,
}

impl AppError {
    pub fn new(app: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            app: app.into(),
            message: message.into(),
        }
    }
}

/// `anyhow`-style context helpers turning foreign errors into [`AppError`]s.
pub trait AppResultExt<T> {
    /// Attributes the error to `app`, keeping its own message.
    fn app_context(self, app: &str) -> Result<T, AppError>;

    /// Attributes the error to `app`, prefixing the message with `what()`.
    fn with_app_context<C, F>(self, app: &str, what: F) -> Result<T, AppError>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

impl<T> AppResultExt<T> for Result<T, io::Error> {
    fn app_context(self, app: &str) -> Result<T, AppError> {
        self.map_err(|e| AppError::new(app, describe_io(&e)))
    }

    fn with_app_context<C, F>(self, app: &str, what: F) -> Result<T, AppError>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| AppError::new(app, format!("{}: {}", what(), describe_io(&e))))
    }
}

/// Short, platform-neutral wording for the I/O failures users actually hit.
pub(crate) fn describe_io(error: &io::Error) -> String {
    match error.kind() {
        io::ErrorKind::NotFound => "No such file or directory".to_string(),
        io::ErrorKind::PermissionDenied => "Permission denied".to_string(),
        io::ErrorKind::AlreadyExists => "File exists".to_string(),
        io::ErrorKind::IsADirectory => "Is a directory".to_string(),
        io::ErrorKind::NotADirectory => "Not a directory".to_string(),
        io::ErrorKind::InvalidData => "invalid UTF-8 input".to_string(),
        _ => error.to_string(),
    }
}

/// Any error that can escape the interpretation of a line.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error(transparent)]
    App(#[from] AppError),
}

impl Error {
    /// True for grammar-level failures, which abort a whole sequence.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Shell(ShellError::Syntax(_)))
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Shell(ShellError::Stream(error))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_app_names_the_application() {
        let err = Error::from(ShellError::InvalidApp("frobnicate".into()));
        assert_eq!(err.to_string(), "frobnicate: Invalid app");
        assert!(!err.is_syntax());
    }

    #[test]
    fn app_error_is_prefixed_with_its_name() {
        let err = AppError::new("cut", "option -b is required");
        assert_eq!(err.to_string(), "cut: option -b is required");
    }

    #[test]
    fn io_context_is_attributed_to_the_app() {
        let res: io::Result<()> = Err(io::Error::from(io::ErrorKind::NotFound));
        let err = res.with_app_context("cat", || "missing.txt").unwrap_err();
        assert_eq!(err.to_string(), "cat: missing.txt: No such file or directory");
    }

    #[test]
    fn only_syntax_errors_are_syntax_level() {
        assert!(Error::from(ShellError::syntax("unmatched quote")).is_syntax());
        assert!(!Error::from(AppError::new("wc", "boom")).is_syntax());
    }
}
