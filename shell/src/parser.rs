use crate::error::ShellError;
use crate::lexer::{self, Lexeme, Token};
use tracing::debug;

/// A single application invocation, still in raw (unexpanded) form.
///
/// Redirection operators and their targets stay inside `args`; they are
/// interpreted at evaluation time by the redirection handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    args: Vec<Token>,
}

impl Call {
    pub fn new(args: Vec<Token>) -> Self {
        Call { args }
    }

    pub fn args(&self) -> &[Token] {
        &self.args
    }
}

/// Node of the command tree produced by [`parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One application invocation.
    Call(Call),
    /// Calls whose captured output feeds the next stage's input. Fails fast.
    Pipe { stages: Vec<Call> },
    /// Independent steps run in order. Non-syntax failures are reported and skipped.
    Sequence { steps: Vec<Command> },
}

impl Command {
    /// Number of call nodes in the tree.
    pub fn call_count(&self) -> usize {
        match self {
            Command::Call(_) => 1,
            Command::Pipe { stages } => stages.len(),
            Command::Sequence { steps } => steps.iter().map(Command::call_count).sum(),
        }
    }
}

struct CommandBuilder {
    lexemes: Vec<Lexeme>,
    pos: usize,
}

impl CommandBuilder {
    fn from(lexemes: Vec<Lexeme>) -> Self {
        CommandBuilder { lexemes, pos: 0 }
    }

    fn build(mut self) -> Result<Command, ShellError> {
        let command = self.parse_sequence()?;

        // Ensure we consumed all lexemes
        if let Some(lexeme) = self.peek() {
            return Err(unexpected(Some(lexeme)));
        }

        Ok(command)
    }

    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn consume(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    /// sequence := pipeline (';' pipeline)*
    fn parse_sequence(&mut self) -> Result<Command, ShellError> {
        let mut steps = vec![self.parse_pipeline()?];

        while let Some(Lexeme::Semicolon) = self.peek() {
            self.consume();
            if self.peek().is_none() {
                return Err(ShellError::syntax("expected command after ';'"));
            }
            steps.push(self.parse_pipeline()?);
        }

        if steps.len() == 1 {
            Ok(steps.remove(0))
        } else {
            Ok(Command::Sequence { steps })
        }
    }

    /// pipeline := call ('|' call)*
    fn parse_pipeline(&mut self) -> Result<Command, ShellError> {
        let mut stages = vec![self.parse_call()?];

        while let Some(Lexeme::Pipe) = self.peek() {
            self.consume();
            if self.peek().is_none() {
                return Err(ShellError::syntax("expected command after '|'"));
            }
            stages.push(self.parse_call()?);
        }

        if stages.len() == 1 {
            Ok(Command::Call(stages.remove(0)))
        } else {
            Ok(Command::Pipe { stages })
        }
    }

    /// call := token+
    fn parse_call(&mut self) -> Result<Call, ShellError> {
        let mut args = Vec::new();

        while let Some(Lexeme::Word(token)) = self.peek() {
            args.push(token.clone());
            self.consume();
        }

        if args.is_empty() {
            return Err(unexpected(self.peek()));
        }
        if args.iter().all(|token| token.redirect_kind().is_some()) {
            return Err(ShellError::syntax(format!(
                "missing redirection target after '{}'",
                args[args.len() - 1]
            )));
        }

        Ok(Call::new(args))
    }
}

fn unexpected(lexeme: Option<&Lexeme>) -> ShellError {
    match lexeme {
        Some(Lexeme::Pipe) => ShellError::syntax("syntax error near unexpected token '|'"),
        Some(Lexeme::Semicolon) => ShellError::syntax("syntax error near unexpected token ';'"),
        Some(Lexeme::Word(token)) => {
            ShellError::syntax(format!("syntax error near unexpected token '{token}'"))
        }
        None => ShellError::syntax("unexpected end of input"),
    }
}

/// Parses a raw line into a command tree without expanding anything.
///
/// Fails on empty input, unbalanced quotes or backquotes, dangling or doubled
/// separators, and calls made only of redirection operators. No partial tree
/// is ever returned.
pub fn parse(line: &str) -> Result<Command, ShellError> {
    if line.trim().is_empty() {
        return Err(ShellError::syntax("empty command"));
    }
    let lexemes = lexer::split_into_lexemes(line)?;
    let command = CommandBuilder::from(lexemes).build()?;
    debug!(calls = command.call_count(), "parsed command line");
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(words: &[&str]) -> Call {
        Call::new(words.iter().map(|w| Token::new(*w)).collect())
    }

    #[test]
    fn simple_call() {
        let command = parse("echo hello world").unwrap();
        assert_eq!(command, Command::Call(call(&["echo", "hello", "world"])));
    }

    #[test]
    fn pipe_of_three_stages() {
        let command = parse("cat f | sort | uniq").unwrap();
        assert_eq!(
            command,
            Command::Pipe {
                stages: vec![call(&["cat", "f"]), call(&["sort"]), call(&["uniq"])]
            }
        );
        assert_eq!(command.call_count(), 3);
    }

    #[test]
    fn sequence_binds_looser_than_pipe() {
        let command = parse("echo a | cat; echo b").unwrap();
        assert_eq!(
            command,
            Command::Sequence {
                steps: vec![
                    Command::Pipe {
                        stages: vec![call(&["echo", "a"]), call(&["cat"])]
                    },
                    Command::Call(call(&["echo", "b"])),
                ]
            }
        );
        assert_eq!(command.call_count(), 3);
    }

    #[test]
    fn redirections_stay_inside_the_call() {
        let command = parse("cat < in.txt > out.txt").unwrap();
        assert_eq!(
            command,
            Command::Call(call(&["cat", "<", "in.txt", ">", "out.txt"]))
        );
    }

    #[test]
    fn redirection_with_target_but_no_command_parses() {
        assert!(parse("< in.txt").is_ok());
    }

    #[test]
    fn quoted_separator_does_not_split() {
        let command = parse("echo 'a;b' \"c|d\" `echo e; echo f`").unwrap();
        assert_eq!(command.call_count(), 1);
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in [
            "", "   ", "\n", ";", "| x", "x ||", "x | | y", "<", "> <", "echo a;", "; echo a",
            "echo a |", "echo 'a", "echo \"a", "echo `a", "a && b",
        ] {
            let err = parse(line);
            assert!(
                matches!(err, Err(ShellError::Syntax(_))),
                "expected syntax error for {line:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn empty_input_message() {
        assert_eq!(parse("").unwrap_err().to_string(), "empty command");
    }
}
