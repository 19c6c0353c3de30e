use crate::command::ApplicationRegistry;
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::io_adapters::{InputStream, OutputStream};
use crate::lexer::Token;
use crate::parser::{self, Call, Command};
use crate::redirection::{Redirection, RedirectionHandler};
use crate::resolver::{ArgumentResolver, Substitution};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// A shell interpreter: parses lines, expands them and runs the resulting
/// command tree against a registry of in-process applications.
///
/// Example
/// ```
/// use shell_interpreter::Shell;
/// let mut sh = Shell::default();
/// let mut out = Vec::new();
/// sh.interpret_with_input("echo hello world", &mut std::io::empty(), &mut out).unwrap();
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Shell {
    env: Environment,
    registry: ApplicationRegistry,
}

impl Shell {
    /// Create a new shell with a custom set of applications.
    pub fn new(registry: ApplicationRegistry) -> Self {
        Self::with_environment(Environment::new(), registry)
    }

    pub fn with_environment(env: Environment, registry: ApplicationRegistry) -> Self {
        Self { env, registry }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Parses and executes one line against process stdin and `stdout`.
    pub fn interpret(&mut self, line: &str, stdout: &mut dyn Write) -> Result<()> {
        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        self.interpret_with_input(line, &mut stdin, stdout)
    }

    /// Parses and executes one line against the given streams.
    pub fn interpret_with_input(
        &mut self,
        line: &str,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Result<()> {
        let command = parser::parse(line)?;
        Session {
            env: &mut self.env,
            registry: &self.registry,
        }
        .eval(&command, stdin, stdout)
    }

    /// Interactive read-eval-print loop.
    ///
    /// Errors escaping a line are reported on stderr; the loop ends on EOF,
    /// Ctrl-C, or once `exit` has run.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = io::stdout();

        while !self.env.should_exit {
            let prompt = format!("{}> ", self.env.current_dir.display());
            match rl.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;
                    if let Err(err) = self.interpret(&line, &mut stdout) {
                        stdout.flush()?;
                        eprintln!("shell: {err}");
                    }
                    stdout.flush()?;
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }
}

impl Default for Shell {
    /// A shell over the process environment with every built-in application.
    fn default() -> Self {
        Self::new(ApplicationRegistry::with_builtins())
    }
}

/// Evaluation state for one top-level line, shared with nested substitutions.
struct Session<'s> {
    env: &'s mut Environment,
    registry: &'s ApplicationRegistry,
}

impl Session<'_> {
    fn eval(
        &mut self,
        command: &Command,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Result<()> {
        match command {
            Command::Call(call) => self.eval_call(call, stdin, stdout),
            Command::Pipe { stages } => self.eval_pipe(stages, stdin, stdout),
            Command::Sequence { steps } => self.eval_sequence(steps, stdin, stdout),
        }
    }

    /// Runs one application. Streams opened by redirection are released on
    /// every path before returning.
    fn eval_call(
        &mut self,
        call: &Call,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Result<()> {
        let Redirection {
            mut input,
            mut output,
            args,
        } = RedirectionHandler::extract(
            call.args(),
            stdin,
            stdout,
            &mut ArgumentResolver::new(self),
        )?;

        let result = self.dispatch(&args, &mut input, &mut output);
        drop(input);
        let closed = output.close();
        result?;
        closed?;
        Ok(())
    }

    fn dispatch(
        &mut self,
        tokens: &[Token],
        input: &mut InputStream<'_>,
        output: &mut OutputStream<'_>,
    ) -> Result<()> {
        let argv = ArgumentResolver::new(self).resolve(tokens)?;
        let Some((name, args)) = argv.split_first() else {
            debug!("call resolved to no arguments");
            return Ok(());
        };

        let registry = self.registry;
        let app = registry
            .lookup(name)
            .ok_or_else(|| ShellError::InvalidApp(name.clone()))?;
        debug!(app = %name, ?args, "dispatch");
        app.run(args, input, output, self.env)?;
        Ok(())
    }

    /// Stages run left to right with fully buffered output in between. The
    /// first failure aborts the remaining stages.
    fn eval_pipe(
        &mut self,
        stages: &[Call],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Result<()> {
        let Some((last, init)) = stages.split_last() else {
            return Err(ShellError::syntax("empty pipeline").into());
        };

        let mut previous_output: Option<Vec<u8>> = None;
        for stage in init {
            let mut captured = Vec::new();
            match previous_output.take() {
                Some(buffer) => self.eval_call(stage, &mut buffer.as_slice(), &mut captured)?,
                None => self.eval_call(stage, stdin, &mut captured)?,
            }
            previous_output = Some(captured);
        }

        match previous_output {
            Some(buffer) => self.eval_call(last, &mut buffer.as_slice(), stdout),
            None => self.eval_call(last, stdin, stdout),
        }
    }

    /// Steps run left to right. Failures other than syntax errors are written
    /// to the output as `shell: <error>` and the next step runs.
    fn eval_sequence(
        &mut self,
        steps: &[Command],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Result<()> {
        for step in steps {
            match self.eval(step, stdin, stdout) {
                Ok(()) => {}
                Err(err) if err.is_syntax() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "sequence step failed");
                    writeln!(stdout, "shell: {err}")?;
                }
            }
        }
        Ok(())
    }
}

impl Substitution for Session<'_> {
    fn substitute(&mut self, line: &str) -> Result<String> {
        let command = parser::parse(line)?;
        let mut captured = Vec::new();
        self.eval(&command, &mut io::empty(), &mut captured)?;
        Ok(String::from_utf8_lossy(&captured).into_owned())
    }

    fn current_dir(&self) -> &Path {
        &self.env.current_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Application;
    use crate::error::{AppError, Error};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn shell() -> Shell {
        Shell::with_environment(
            Environment::with_current_dir("/"),
            ApplicationRegistry::with_builtins(),
        )
    }

    fn run(shell: &mut Shell, line: &str) -> (Result<()>, String) {
        let mut out = Vec::new();
        let res = shell.interpret_with_input(line, &mut io::empty(), &mut out);
        (res, String::from_utf8(out).unwrap())
    }

    /// Records the order in which applications ran.
    struct Probe {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
    }

    impl Application for Probe {
        fn run(
            &self,
            _args: &[String],
            stdin: &mut dyn Read,
            stdout: &mut dyn Write,
            _env: &mut Environment,
        ) -> std::result::Result<(), AppError> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                return Err(AppError::new(self.name, "failed"));
            }
            let mut input = String::new();
            stdin.read_to_string(&mut input).unwrap();
            writeln!(stdout, "{input}{}", self.name).unwrap();
            Ok(())
        }
    }

    fn probed_shell(log: &Rc<RefCell<Vec<&'static str>>>) -> Shell {
        let mut registry = ApplicationRegistry::with_builtins();
        for (name, fail) in [("first", false), ("middle", true), ("last", false)] {
            registry.register(
                name,
                Box::new(Probe {
                    name,
                    log: Rc::clone(log),
                    fail,
                }),
            );
        }
        Shell::with_environment(Environment::with_current_dir("/"), registry)
    }

    #[test]
    fn test_echo_pipe_wc_output() {
        let (res, out) = run(&mut shell(), "echo \"22\" | wc");
        res.unwrap();
        assert_eq!(out, "1 1 3\n");
    }

    #[test]
    fn pipe_feeds_each_stage() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (res, out) = run(&mut probed_shell(&log), "first | last");
        res.unwrap();
        assert_eq!(out, "first\nlast\n");
    }

    #[test]
    fn pipe_fails_fast() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (res, out) = run(&mut probed_shell(&log), "first | middle | last");
        assert!(matches!(res, Err(Error::App(ref e)) if e.app == "middle"));
        assert_eq!(*log.borrow(), vec!["first", "middle"]);
        assert!(out.is_empty());
    }

    #[test]
    fn sequence_continues_after_invalid_app() {
        let (res, out) = run(&mut shell(), "invalidcmd; echo ok");
        res.unwrap();
        assert_eq!(out, "shell: invalidcmd: Invalid app\nok\n");
    }

    #[test]
    fn sequence_continues_after_app_error() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (res, out) = run(&mut probed_shell(&log), "middle; last");
        res.unwrap();
        assert_eq!(out, "shell: middle: failed\nlast\n");
    }

    #[test]
    fn sequence_aborts_on_syntax_error() {
        let (res, out) = run(&mut shell(), "echo a; echo b >; echo c");
        assert!(res.unwrap_err().is_syntax());
        assert_eq!(out, "a\n");
    }

    #[test]
    fn invalid_app_outside_sequence_propagates() {
        let (res, _) = run(&mut shell(), "nosuchthing arg");
        assert_eq!(res.unwrap_err().to_string(), "nosuchthing: Invalid app");
    }

    #[test]
    fn substitution_reenters_the_pipeline() {
        let (res, out) = run(&mut shell(), "echo `echo a b | wc -w`");
        res.unwrap();
        assert_eq!(out, "2\n");
    }

    #[test]
    fn substitution_error_propagates_unwrapped() {
        let (res, _) = run(&mut shell(), "echo `nosuchthing`");
        assert!(matches!(
            res,
            Err(Error::Shell(ShellError::InvalidApp(ref n))) if n == "nosuchthing"
        ));
    }

    #[test]
    fn substitution_uses_empty_stdin() {
        let mut out = Vec::new();
        let mut stdin: &[u8] = b"outer input\n";
        shell()
            .interpret_with_input("echo `cat`x", &mut stdin, &mut out)
            .unwrap();
        assert_eq!(out, b"x\n");
    }

    #[test]
    fn redirection_only_call_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in.txt"), "data").unwrap();
        let mut shell = Shell::with_environment(
            Environment::with_current_dir(dir.path()),
            ApplicationRegistry::with_builtins(),
        );
        let (res, out) = run(&mut shell, "< in.txt");
        res.unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn cd_changes_directory_for_later_steps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("inner")).unwrap();
        std::fs::write(dir.path().join("inner/f.txt"), "").unwrap();
        let mut shell = Shell::with_environment(
            Environment::with_current_dir(dir.path()),
            ApplicationRegistry::with_builtins(),
        );
        let (res, out) = run(&mut shell, "cd inner; echo *.txt");
        res.unwrap();
        assert_eq!(out, "f.txt\n");
    }

    #[test]
    fn unsafe_stage_does_not_abort_pipe() {
        let (res, out) = run(&mut shell(), "_cat /no/such/file | wc -l");
        res.unwrap();
        assert_eq!(out, "1\n");
    }

    #[test]
    fn exit_sets_flag_on_shell() {
        let mut shell = shell();
        let (res, _) = run(&mut shell, "exit");
        res.unwrap();
        assert!(shell.env().should_exit);
    }
}
