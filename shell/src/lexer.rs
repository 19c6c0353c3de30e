//! Quote-aware word splitting of a raw command line.
//!
//! The lexer only decides *where* tokens and operators are; quotes and
//! backquotes are kept verbatim inside tokens so that expansion can happen
//! later, once the shape of the command tree is known.

use crate::error::ShellError;
use std::fmt;
use tracing::trace;

/// A whitespace-delimited slice of the raw line, quotes and backquotes included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Token(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The redirection this token stands for, if it is a bare `<` or `>`.
    pub fn redirect_kind(&self) -> Option<RedirectKind> {
        match self.0.as_str() {
            "<" => Some(RedirectKind::Input),
            ">" => Some(RedirectKind::Output),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `<`: read standard input from a file.
    Input,
    /// `>`: write standard output to a file, truncating it.
    Output,
}

impl RedirectKind {
    pub fn symbol(self) -> char {
        match self {
            RedirectKind::Input => '<',
            RedirectKind::Output => '>',
        }
    }
}

/// Output of the lexer: words and the two separators the grammar knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme {
    Word(Token),
    /// `|`
    Pipe,
    /// `;`
    Semicolon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Bare,
    InSingle,
    InDouble,
}

struct LexingFsm {
    input: Vec<char>,
    pos: usize,
    state: QuoteState,
    // Open backquote spans. Never incremented while in single quotes.
    backquotes: usize,
    buffer: String,
}

impl LexingFsm {
    fn new(line: &str) -> Self {
        LexingFsm {
            input: line.chars().collect(),
            pos: 0,
            state: QuoteState::Bare,
            backquotes: 0,
            buffer: String::new(),
        }
    }

    fn make_lexemes(mut self) -> Result<Vec<Lexeme>, ShellError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            if self.backquotes > 0 {
                self.handle_backquoted(ch);
                continue;
            }
            match self.state {
                QuoteState::Bare => self.handle_bare(ch, &mut out)?,
                QuoteState::InSingle => self.handle_single_quote(ch),
                QuoteState::InDouble => self.handle_double_quote(ch),
            }
        }

        if self.backquotes > 0 {
            return Err(ShellError::syntax("unmatched backquote"));
        }
        match self.state {
            QuoteState::InSingle => return Err(ShellError::syntax("unmatched single quote")),
            QuoteState::InDouble => return Err(ShellError::syntax("unmatched double quote")),
            QuoteState::Bare => {}
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn finish_word(&mut self, out: &mut Vec<Lexeme>) {
        if !self.buffer.is_empty() {
            out.push(Lexeme::Word(Token(std::mem::take(&mut self.buffer))));
        }
    }

    fn handle_bare(&mut self, ch: char, out: &mut Vec<Lexeme>) -> Result<(), ShellError> {
        match ch {
            c if c.is_whitespace() => self.finish_word(out),
            '|' => {
                self.finish_word(out);
                out.push(Lexeme::Pipe);
            }
            ';' => {
                self.finish_word(out);
                out.push(Lexeme::Semicolon);
            }
            '<' | '>' => {
                self.finish_word(out);
                out.push(Lexeme::Word(Token(ch.to_string())));
            }
            '&' => return Err(ShellError::syntax("unexpected '&'")),
            '\'' => {
                self.buffer.push(ch);
                self.state = QuoteState::InSingle;
            }
            '"' => {
                self.buffer.push(ch);
                self.state = QuoteState::InDouble;
            }
            '`' => {
                self.buffer.push(ch);
                self.backquotes += 1;
            }
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) {
        self.buffer.push(ch);
        if ch == '\'' {
            self.state = QuoteState::Bare;
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        self.buffer.push(ch);
        match ch {
            '"' => self.state = QuoteState::Bare,
            '`' => self.backquotes += 1,
            _ => {}
        }
    }

    // Backquoted text is opaque: separators, whitespace and quotes are kept.
    fn handle_backquoted(&mut self, ch: char) {
        self.buffer.push(ch);
        if ch == '`' {
            self.backquotes -= 1;
        }
    }
}

/// Splits `line` into words and separators, validating quote balance.
pub fn split_into_lexemes(line: &str) -> Result<Vec<Lexeme>, ShellError> {
    let lexemes = LexingFsm::new(line).make_lexemes()?;
    trace!(count = lexemes.len(), "lexed line");
    Ok(lexemes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Lexeme {
        Lexeme::Word(Token::new(s))
    }

    #[test]
    fn splits_on_whitespace_and_separators() {
        let lexemes = split_into_lexemes("cat a.txt | grep x;echo  done").unwrap();
        assert_eq!(
            lexemes,
            vec![
                word("cat"),
                word("a.txt"),
                Lexeme::Pipe,
                word("grep"),
                word("x"),
                Lexeme::Semicolon,
                word("echo"),
                word("done"),
            ]
        );
    }

    #[test]
    fn quoted_separators_do_not_split() {
        let lexemes = split_into_lexemes("echo 'a; b' \"c | d\"").unwrap();
        assert_eq!(lexemes, vec![word("echo"), word("'a; b'"), word("\"c | d\"")]);
    }

    #[test]
    fn backquoted_span_stays_in_one_token() {
        let lexemes = split_into_lexemes("echo a`echo b; echo c`d").unwrap();
        assert_eq!(lexemes, vec![word("echo"), word("a`echo b; echo c`d")]);
    }

    #[test]
    fn backquote_inside_double_quotes_may_contain_quotes() {
        let lexemes = split_into_lexemes("echo \"x `echo \"y\"` z\"").unwrap();
        assert_eq!(lexemes, vec![word("echo"), word("\"x `echo \"y\"` z\"")]);
    }

    #[test]
    fn backquote_is_literal_inside_single_quotes() {
        let lexemes = split_into_lexemes("echo '`'").unwrap();
        assert_eq!(lexemes, vec![word("echo"), word("'`'")]);
    }

    #[test]
    fn redirection_operators_are_standalone_tokens() {
        let lexemes = split_into_lexemes("echo a>b <c").unwrap();
        assert_eq!(
            lexemes,
            vec![word("echo"), word("a"), word(">"), word("b"), word("<"), word("c")]
        );
    }

    #[test]
    fn unbalanced_quotes_are_rejected() {
        assert!(split_into_lexemes("echo 'abc").is_err());
        assert!(split_into_lexemes("echo \"abc").is_err());
        assert!(split_into_lexemes("echo `abc").is_err());
        assert!(split_into_lexemes("echo \"`abc\"").is_err());
    }

    #[test]
    fn ampersand_is_rejected() {
        assert!(split_into_lexemes("echo a && echo b").is_err());
        assert!(split_into_lexemes("echo '&&'").is_ok());
    }
}
