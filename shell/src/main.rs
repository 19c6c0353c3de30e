use argh::FromArgs;
use shell_interpreter::Shell;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Interactive shell with in-process applications.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit.
    command: Option<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_env("SHELL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args: Args = argh::from_env();
    let mut shell = Shell::default();

    let Some(line) = args.command else {
        shell.repl()?;
        return Ok(ExitCode::SUCCESS);
    };

    let mut stdout = io::stdout();
    let result = shell.interpret(&line, &mut stdout);
    stdout.flush()?;
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("shell: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
