//! Applications shipped with the shell.
//!
//! Most are parsed with [`argh`] (`FromArgs`) and run in-process against the
//! call's streams. Each one is also registered as `_<name>`, an unsafe variant
//! that prints its failure to the output stream instead of raising it.

mod fs;
mod text;

use crate::command::{Application, ApplicationRegistry};
use crate::env::Environment;
use crate::error::{AppError, AppResultExt};
use argh::{EarlyExit, FromArgs};
use std::io::{Read, Write};
use std::marker::PhantomData;

use fs::{Cd, Find, Ls, Mkdir, Pwd};
use text::{Cat, Cut, Echo, Grep, Head, Sort, Tail, Tee, Uniq, Wc};

/// Built-in commands known to the shell at compile time.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cat" or "cd".
    fn name() -> &'static str;

    /// Executes the command using the provided streams and environment.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError>;
}

/// Parses raw arguments into `T` and runs it.
pub(crate) struct Factory<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> Application for Factory<T> {
    fn run(
        &self,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[T::name()], &args) {
            Ok(cmd) => cmd.execute(stdin, stdout, env),
            // --help
            Err(EarlyExit {
                output,
                status: Ok(()),
            }) => stdout.write_all(output.as_bytes()).app_context(T::name()),
            Err(EarlyExit {
                output,
                status: Err(()),
            }) => Err(AppError::new(T::name(), output.trim_end())),
        }
    }
}

/// Runs the wrapped application, reporting any failure on its output stream.
struct Unsafe {
    name: String,
    inner: Box<dyn Application>,
}

impl Application for Unsafe {
    fn run(
        &self,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        match self.inner.run(args, stdin, stdout, env) {
            Ok(()) => Ok(()),
            Err(e) => writeln!(stdout, "{e}").app_context(&self.name),
        }
    }
}

#[derive(FromArgs)]
/// leave the shell after the current line.
pub(crate) struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        env.should_exit = true;
        Ok(())
    }
}

fn register<F>(registry: &mut ApplicationRegistry, name: &str, make: F)
where
    F: Fn() -> Box<dyn Application>,
{
    registry.register(name, make());
    registry.register(
        format!("_{name}"),
        Box::new(Unsafe {
            name: format!("_{name}"),
            inner: make(),
        }),
    );
}

fn register_builtin<T: BuiltinCommand + 'static>(registry: &mut ApplicationRegistry) {
    register(registry, T::name(), || Box::new(Factory::<T>::default()));
}

pub(crate) fn register_all(registry: &mut ApplicationRegistry) {
    register(registry, "echo", || Box::new(Echo));
    register(registry, "find", || Box::new(Find));
    register_builtin::<Pwd>(registry);
    register_builtin::<Cd>(registry);
    register_builtin::<Ls>(registry);
    register_builtin::<Mkdir>(registry);
    register_builtin::<Cat>(registry);
    register_builtin::<Head>(registry);
    register_builtin::<Tail>(registry);
    register_builtin::<Grep>(registry);
    register_builtin::<Sort>(registry);
    register_builtin::<Uniq>(registry);
    register_builtin::<Cut>(registry);
    register_builtin::<Wc>(registry);
    register_builtin::<Tee>(registry);
    register_builtin::<Exit>(registry);
}

/// Reads `file` (relative to the current directory) or, when absent, all of stdin.
pub(crate) fn read_input(
    app: &str,
    file: Option<&str>,
    stdin: &mut dyn Read,
    env: &Environment,
) -> Result<String, AppError> {
    match file {
        Some(name) => {
            let path = env.resolve_path(name);
            if path.is_dir() {
                return Err(AppError::new(app, format!("{name}: Is a directory")));
            }
            std::fs::read_to_string(&path).with_app_context(app, || name)
        }
        None => {
            let mut buf = String::new();
            stdin.read_to_string(&mut buf).app_context(app)?;
            Ok(buf)
        }
    }
}

/// Writes each line followed by a newline.
pub(crate) fn write_lines<'l>(
    app: &str,
    stdout: &mut dyn Write,
    lines: impl IntoIterator<Item = &'l str>,
) -> Result<(), AppError> {
    for line in lines {
        writeln!(stdout, "{line}").app_context(app)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(app: &dyn Application, args: &[&str], input: &str) -> (Result<(), AppError>, String) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let mut env = Environment::with_current_dir("/");
        let mut out = Vec::new();
        let res = app.run(
            &args,
            &mut Cursor::new(input.as_bytes().to_vec()),
            &mut out,
            &mut env,
        );
        (res, String::from_utf8(out).unwrap())
    }

    #[test]
    fn factory_parses_flags() {
        let (res, out) = run(&Factory::<Sort>::default(), &["-r"], "a\nc\nb\n");
        assert!(res.is_ok());
        assert_eq!(out, "c\nb\na\n");
    }

    #[test]
    fn factory_reports_bad_flags_as_app_error() {
        let (res, out) = run(&Factory::<Sort>::default(), &["-z"], "");
        let err = res.unwrap_err();
        assert_eq!(err.app, "sort");
        assert!(out.is_empty());
    }

    #[test]
    fn unsafe_variant_prints_instead_of_failing() {
        let app = Unsafe {
            name: "_cat".into(),
            inner: Box::new(Factory::<Cat>::default()),
        };
        let (res, out) = run(&app, &["/definitely/not/here.txt"], "");
        assert!(res.is_ok());
        assert_eq!(out, "cat: /definitely/not/here.txt: No such file or directory\n");
    }

    #[test]
    fn exit_sets_flag() {
        let mut env = Environment::with_current_dir("/");
        Factory::<Exit>::default()
            .run(&[], &mut std::io::empty(), &mut Vec::new(), &mut env)
            .unwrap();
        assert!(env.should_exit);
    }
}
