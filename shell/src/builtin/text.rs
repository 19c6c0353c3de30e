use super::{BuiltinCommand, read_input, write_lines};
use crate::command::Application;
use crate::env::Environment;
use crate::error::{AppError, AppResultExt};
use argh::FromArgs;
use regex::RegexBuilder;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};

/// Writes its arguments separated by single spaces, then a newline.
///
/// Not parsed with argh: every argument, dashes included, is printed.
pub(crate) struct Echo;

impl Application for Echo {
    fn run(
        &self,
        args: &[String],
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<(), AppError> {
        writeln!(stdout, "{}", args.join(" ")).app_context("echo")
    }
}

#[derive(FromArgs)]
/// print file(s) to stdout.
pub(crate) struct Cat {
    #[argh(positional, greedy)]
    /// files to concatenate; reads stdin when none are given.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        if self.files.is_empty() {
            io::copy(stdin, stdout).app_context("cat")?;
            return Ok(());
        }
        for name in &self.files {
            let path = env.resolve_path(name);
            if path.is_dir() {
                return Err(AppError::new("cat", format!("{name}: Is a directory")));
            }
            let bytes = fs::read(&path).with_app_context("cat", || name)?;
            stdout.write_all(&bytes).app_context("cat")?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// print the first lines of a file or stdin.
pub(crate) struct Head {
    #[argh(option, short = 'n', default = "10")]
    /// number of lines to print.
    pub lines: usize,

    #[argh(positional)]
    /// file to read; defaults to stdin.
    pub file: Option<String>,
}

impl BuiltinCommand for Head {
    fn name() -> &'static str {
        "head"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let text = read_input("head", self.file.as_deref(), stdin, env)?;
        write_lines("head", stdout, text.lines().take(self.lines))
    }
}

#[derive(FromArgs)]
/// print the last lines of a file or stdin.
pub(crate) struct Tail {
    #[argh(option, short = 'n', default = "10")]
    /// number of lines to print.
    pub lines: usize,

    #[argh(positional)]
    /// file to read; defaults to stdin.
    pub file: Option<String>,
}

impl BuiltinCommand for Tail {
    fn name() -> &'static str {
        "tail"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let text = read_input("tail", self.file.as_deref(), stdin, env)?;
        let lines: Vec<&str> = text.lines().collect();
        let skip = lines.len().saturating_sub(self.lines);
        write_lines("tail", stdout, lines[skip..].iter().copied())
    }
}

#[derive(FromArgs)]
/// print lines matching a pattern.
pub(crate) struct Grep {
    #[argh(positional)]
    /// the pattern to search for (a regular expression).
    pub pattern: String,

    #[argh(positional, greedy)]
    /// files to search; reads stdin when none are given.
    pub files: Vec<String>,

    #[argh(switch, short = 'w')]
    /// match only whole words.
    pub word_regexp: bool,

    #[argh(switch, short = 'i')]
    /// ignore case distinctions.
    pub ignore_case: bool,
}

impl BuiltinCommand for Grep {
    fn name() -> &'static str {
        "grep"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let pattern = if self.word_regexp {
            format!(r"\b(?:{})\b", self.pattern)
        } else {
            self.pattern.clone()
        };
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .map_err(|_| AppError::new("grep", format!("invalid pattern '{}'", self.pattern)))?;

        if self.files.is_empty() {
            let text = read_input("grep", None, stdin, env)?;
            return write_lines("grep", stdout, text.lines().filter(|line| re.is_match(line)));
        }

        // Read everything first so a missing file produces no partial output.
        let mut sources = Vec::with_capacity(self.files.len());
        for name in &self.files {
            sources.push((name, read_input("grep", Some(name.as_str()), stdin, env)?));
        }
        let prefixed = sources.len() > 1;
        for (name, text) in &sources {
            for line in text.lines().filter(|line| re.is_match(line)) {
                if prefixed {
                    writeln!(stdout, "{name}:{line}").app_context("grep")?;
                } else {
                    writeln!(stdout, "{line}").app_context("grep")?;
                }
            }
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// sort lines of a file or stdin.
pub(crate) struct Sort {
    #[argh(switch, short = 'r')]
    /// reverse the result.
    pub reverse: bool,

    #[argh(positional)]
    /// file to read; defaults to stdin.
    pub file: Option<String>,
}

impl BuiltinCommand for Sort {
    fn name() -> &'static str {
        "sort"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let text = read_input("sort", self.file.as_deref(), stdin, env)?;
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort_unstable();
        if self.reverse {
            lines.reverse();
        }
        write_lines("sort", stdout, lines)
    }
}

#[derive(FromArgs)]
/// collapse adjacent duplicate lines.
pub(crate) struct Uniq {
    #[argh(switch, short = 'i')]
    /// ignore case when comparing lines.
    pub ignore_case: bool,

    #[argh(positional)]
    /// file to read; defaults to stdin.
    pub file: Option<String>,
}

impl BuiltinCommand for Uniq {
    fn name() -> &'static str {
        "uniq"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let text = read_input("uniq", self.file.as_deref(), stdin, env)?;
        let same = |a: &str, b: &str| {
            if self.ignore_case {
                a.to_lowercase() == b.to_lowercase()
            } else {
                a == b
            }
        };

        let mut kept: Vec<&str> = Vec::new();
        for line in text.lines() {
            if !kept.last().is_some_and(|prev| same(*prev, line)) {
                kept.push(line);
            }
        }
        write_lines("uniq", stdout, kept)
    }
}

#[derive(FromArgs)]
/// select bytes from each line.
pub(crate) struct Cut {
    #[argh(option, short = 'b')]
    /// comma separated byte positions or ranges: N, N-M, N-, -M (1-based).
    pub bytes: Option<String>,

    #[argh(positional)]
    /// file to read; defaults to stdin.
    pub file: Option<String>,
}

/// Inclusive 1-based byte range; `end` is `None` for open ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteRange {
    start: usize,
    end: Option<usize>,
}

impl ByteRange {
    fn parse(item: &str) -> Option<ByteRange> {
        let position = |s: &str| s.parse::<usize>().ok().filter(|n| *n > 0);
        let range = match item.split_once('-') {
            None => {
                let n = position(item)?;
                ByteRange { start: n, end: Some(n) }
            }
            Some(("", "")) => return None,
            Some(("", end)) => ByteRange { start: 1, end: Some(position(end)?) },
            Some((start, "")) => ByteRange { start: position(start)?, end: None },
            Some((start, end)) => ByteRange {
                start: position(start)?,
                end: Some(position(end)?),
            },
        };
        match range.end {
            Some(end) if end < range.start => None,
            _ => Some(range),
        }
    }

    fn contains(&self, position: usize) -> bool {
        position >= self.start && self.end.is_none_or(|end| position <= end)
    }
}

impl BuiltinCommand for Cut {
    fn name() -> &'static str {
        "cut"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let Some(list) = self.bytes.as_deref() else {
            return Err(AppError::new("cut", "option -b is required"));
        };
        let ranges = list
            .split(',')
            .map(ByteRange::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| AppError::new("cut", format!("invalid byte list '{list}'")))?;

        let text = read_input("cut", self.file.as_deref(), stdin, env)?;
        for line in text.lines() {
            let selected: Vec<u8> = line
                .bytes()
                .enumerate()
                .filter(|(i, _)| ranges.iter().any(|r| r.contains(i + 1)))
                .map(|(_, b)| b)
                .collect();
            writeln!(stdout, "{}", String::from_utf8_lossy(&selected)).app_context("cut")?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// count lines, words and characters.
pub(crate) struct Wc {
    #[argh(switch, short = 'l')]
    /// print the line count.
    pub lines: bool,

    #[argh(switch, short = 'w')]
    /// print the word count.
    pub words: bool,

    #[argh(switch, short = 'm')]
    /// print the character count.
    pub chars: bool,

    #[argh(positional, greedy)]
    /// files to count; reads stdin when none are given.
    pub files: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    lines: usize,
    words: usize,
    chars: usize,
}

impl Counts {
    fn of(text: &str) -> Counts {
        Counts {
            lines: text.matches('\n').count(),
            words: text.split_whitespace().count(),
            chars: text.chars().count(),
        }
    }

    fn add(&mut self, other: Counts) {
        self.lines += other.lines;
        self.words += other.words;
        self.chars += other.chars;
    }
}

impl Wc {
    fn format(&self, counts: Counts, label: Option<&str>) -> String {
        let all = !(self.lines || self.words || self.chars);
        let mut fields = Vec::with_capacity(4);
        if all || self.lines {
            fields.push(counts.lines.to_string());
        }
        if all || self.words {
            fields.push(counts.words.to_string());
        }
        if all || self.chars {
            fields.push(counts.chars.to_string());
        }
        if let Some(label) = label {
            fields.push(label.to_string());
        }
        fields.join(" ")
    }
}

impl BuiltinCommand for Wc {
    fn name() -> &'static str {
        "wc"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        if self.files.is_empty() {
            let text = read_input("wc", None, stdin, env)?;
            return writeln!(stdout, "{}", self.format(Counts::of(&text), None)).app_context("wc");
        }

        let mut total = Counts::default();
        for name in &self.files {
            let counts = Counts::of(&read_input("wc", Some(name.as_str()), stdin, env)?);
            total.add(counts);
            writeln!(stdout, "{}", self.format(counts, Some(name.as_str()))).app_context("wc")?;
        }
        if self.files.len() > 1 {
            writeln!(stdout, "{}", self.format(total, Some("total"))).app_context("wc")?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// copy stdin to stdout and to files.
pub(crate) struct Tee {
    #[argh(switch, short = 'a')]
    /// append to the files instead of truncating them.
    pub append: bool,

    #[argh(positional, greedy)]
    /// files to write.
    pub files: Vec<String>,
}

impl BuiltinCommand for Tee {
    fn name() -> &'static str {
        "tee"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), AppError> {
        let mut input = Vec::new();
        stdin.read_to_end(&mut input).app_context("tee")?;

        for name in &self.files {
            let path = env.resolve_path(name);
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .append(self.append)
                .truncate(!self.append)
                .open(&path)
                .with_app_context("tee", || name)?;
            file.write_all(&input).with_app_context("tee", || name)?;
        }
        stdout.write_all(&input).app_context("tee")
    }
}
