use super::{BuiltinCommand, write_lines};
use crate::command::Application;
use crate::env::Environment;
use crate::error::{AppError, AppResultExt};
use crate::glob::GlobArgument;
use argh::FromArgs;
use regex::Regex;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(FromArgs)]
/// print the current working directory to standard output.
pub(crate) struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        writeln!(stdout, "{}", env.current_dir.display()).app_context(Self::name())
    }
}

#[derive(FromArgs)]
/// change the current working directory.
pub(crate) struct Cd {
    #[argh(positional)]
    /// directory to switch to; defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let target = match self.target {
            Some(t) if !t.is_empty() => t,
            _ => match env.get_var("HOME") {
                Some(home) => home.to_string(),
                None => return Err(AppError::new("cd", "missing argument")),
            },
        };

        let new_dir = env.resolve_path(&target);
        if !new_dir.is_dir() {
            return Err(AppError::new("cd", format!("{target}: No such directory")));
        }
        env.current_dir = fs::canonicalize(&new_dir).with_app_context("cd", || &target)?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// list the entries of a directory.
pub(crate) struct Ls {
    #[argh(positional)]
    /// directory to list; defaults to the current directory.
    pub dir: Option<String>,
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let dir = match &self.dir {
            Some(d) => env.resolve_path(d),
            None => env.current_dir.clone(),
        };
        let shown = self.dir.as_deref().unwrap_or(".");
        if !dir.is_dir() {
            return Err(AppError::new("ls", format!("{shown}: No such directory")));
        }

        let mut names: Vec<String> = fs::read_dir(&dir)
            .with_app_context("ls", || shown)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();

        if !names.is_empty() {
            writeln!(stdout, "{}", names.join("\t")).app_context("ls")?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// create directories.
pub(crate) struct Mkdir {
    #[argh(switch, short = 'p')]
    /// create missing parent directories and ignore existing ones.
    pub parents: bool,

    #[argh(positional, greedy)]
    /// directories to create.
    pub dirs: Vec<String>,
}

impl BuiltinCommand for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        if self.dirs.is_empty() {
            return Err(AppError::new("mkdir", "missing operand"));
        }
        for dir in &self.dirs {
            let path = env.resolve_path(dir);
            let created = if self.parents {
                fs::create_dir_all(&path)
            } else {
                fs::create_dir(&path)
            };
            created.with_app_context("mkdir", || dir)?;
        }
        Ok(())
    }
}

/// `find [PATH] -name PATTERN`: recursively list files whose name matches a glob.
///
/// Parsed by hand since `-name` is not a short flag.
pub(crate) struct Find;

impl Find {
    fn parse(args: &[String]) -> Result<(&str, &str), AppError> {
        match args {
            [flag, pattern] if flag == "-name" => Ok((".", pattern.as_str())),
            [root, flag, pattern] if flag == "-name" => Ok((root.as_str(), pattern.as_str())),
            _ => Err(AppError::new("find", "usage: find [PATH] -name PATTERN")),
        }
    }

    fn walk(
        dir: &Path,
        shown: &str,
        pattern: &Regex,
        found: &mut Vec<String>,
    ) -> Result<(), AppError> {
        let mut entries: Vec<(String, PathBuf, bool)> = fs::read_dir(dir)
            .with_app_context("find", || shown)?
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                // Symlinks are listed but never followed.
                let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
                (entry.file_name().to_string_lossy().into_owned(), entry.path(), is_dir)
            })
            .collect();
        entries.sort();

        for (name, path, is_dir) in entries {
            let display = format!("{}/{name}", shown.trim_end_matches('/'));
            if pattern.is_match(&name) {
                found.push(display.clone());
            }
            if is_dir {
                Self::walk(&path, &display, pattern, found)?;
            }
        }
        Ok(())
    }
}

impl Application for Find {
    fn run(
        &self,
        args: &[String],
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let (root, pattern) = Self::parse(args)?;
        let dir = env.resolve_path(root);
        if !dir.is_dir() {
            return Err(AppError::new("find", format!("{root}: No such directory")));
        }

        let matcher = GlobArgument::from_pattern(pattern)
            .compile()
            .ok_or_else(|| AppError::new("find", format!("invalid pattern '{pattern}'")))?;
        let mut found = Vec::new();
        Self::walk(&dir, root, &matcher, &mut found)?;
        write_lines("find", stdout, found.iter().map(String::as_str))
    }
}
