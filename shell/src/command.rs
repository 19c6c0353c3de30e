use crate::env::Environment;
use crate::error::AppError;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Object-safe trait for anything a call node can dispatch to.
///
/// Applications run in-process against the call's effective streams. Failures
/// are reported as [`AppError`]s carrying the application's name.
pub trait Application {
    fn run(
        &self,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError>;
}

impl<F> Application for F
where
    F: Fn(&[String], &mut dyn Read, &mut dyn Write, &mut Environment) -> Result<(), AppError>,
{
    fn run(
        &self,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        self(args, stdin, stdout, env)
    }
}

/// Maps application names to their implementation.
///
/// Populated by the host before interpretation starts; the interpreter only
/// ever looks names up.
#[derive(Default)]
pub struct ApplicationRegistry {
    apps: BTreeMap<String, Box<dyn Application>>,
}

impl ApplicationRegistry {
    /// A registry with no applications at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding every built-in application and its unsafe `_name` variant.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        crate::builtin::register_all(&mut registry);
        registry
    }

    /// Registers `app` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, app: Box<dyn Application>) {
        self.apps.insert(name.into(), app);
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn Application> {
        self.apps.get(name).map(|app| app.as_ref())
    }
}
