use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Mutable state shared by every node of a command tree.
///
/// The environment contains:
/// - `current_dir`: the working directory used to resolve relative paths in globs,
///   redirections and applications. Only `cd` changes it.
/// - `vars`: a snapshot of the process environment (`cd` without an operand reads `HOME`).
/// - `should_exit`: set by the `exit` application; the REPL checks it after each line.
///
/// The process working directory is never touched; paths are always resolved
/// against `current_dir`.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: stdenv::vars().collect(),
            current_dir,
            should_exit: false,
        }
    }

    /// An environment rooted at `dir` with no variables.
    pub fn with_current_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: dir.into(),
            should_exit: false,
        }
    }

    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Resolve `path` against the current directory unless it is already absolute.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        resolve_in(&self.current_dir, path)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn resolve_in(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::with_current_dir("/");

        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE"));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(!env.should_exit);
    }

    #[test]
    fn test_resolve_path_relative_and_absolute() {
        let env = Environment::with_current_dir("/tmp/work");
        assert_eq!(env.resolve_path("a.txt"), PathBuf::from("/tmp/work/a.txt"));
        assert_eq!(env.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
