use crate::env::resolve_in;
use regex::Regex;
use std::fs;
use std::path::{MAIN_SEPARATOR, Path};
use tracing::{debug, trace};

/// An argument under construction, kept both as literal text and as an
/// equivalent regular expression.
///
/// Literal characters are escaped into the regex; wildcards become "any run of
/// characters except the path separator", so a `*` never crosses a directory
/// boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobArgument {
    literal: String,
    regex: String,
    // Byte offset in `literal` of the first wildcard, if any.
    first_wildcard: Option<usize>,
}

impl GlobArgument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an argument from text where every unquoted `*` is a wildcard.
    pub fn from_pattern(pattern: &str) -> Self {
        let mut arg = Self::new();
        for ch in pattern.chars() {
            if ch == '*' {
                arg.append_wildcard();
            } else {
                arg.append(ch);
            }
        }
        arg
    }

    pub fn append(&mut self, ch: char) {
        self.literal.push(ch);
        let mut buf = [0u8; 4];
        self.regex.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
    }

    pub fn append_wildcard(&mut self) {
        if self.first_wildcard.is_none() {
            self.first_wildcard = Some(self.literal.len());
        }
        self.literal.push('*');
        self.regex.push_str(&segment_wildcard());
    }

    /// Appends `text` as fully literal input.
    pub fn merge_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.append(ch);
        }
    }

    pub fn merge(&mut self, other: GlobArgument) {
        if self.first_wildcard.is_none() {
            self.first_wildcard = other.first_wildcard.map(|at| at + self.literal.len());
        }
        self.literal.push_str(&other.literal);
        self.regex.push_str(&other.regex);
    }

    /// True iff a wildcard unit was appended.
    pub fn has_wildcard(&self) -> bool {
        self.first_wildcard.is_some()
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn into_literal(self) -> String {
        self.literal
    }

    /// The anchored regex for this argument. `None` only if the pattern fails to compile.
    pub(crate) fn compile(&self) -> Option<Regex> {
        match Regex::new(&format!("^(?:{})$", self.regex)) {
            Ok(re) => Some(re),
            Err(e) => {
                debug!(pattern = %self.literal, error = %e, "glob regex did not compile");
                None
            }
        }
    }

    /// Whether `text` matches this argument in full.
    pub fn matches(&self, text: &str) -> bool {
        self.compile().is_some_and(|re| re.is_match(text))
    }

    /// Expands the argument against the filesystem.
    ///
    /// Without wildcards the literal is returned as is. Otherwise the entries of
    /// the directory named by the wildcard-free prefix are matched against the
    /// pattern; matching paths are returned sorted. A pattern that matches
    /// nothing (or whose directory does not exist) yields the literal itself, so
    /// the result is never empty.
    pub fn glob_files(&self, current_dir: &Path) -> Vec<String> {
        let Some(first_wildcard) = self.first_wildcard else {
            return vec![self.literal.clone()];
        };

        let prefix_len = self.literal[..first_wildcard]
            .rfind(MAIN_SEPARATOR)
            .map_or(0, |at| at + MAIN_SEPARATOR.len_utf8());
        let prefix = &self.literal[..prefix_len];
        let base = if prefix.is_empty() {
            current_dir.to_path_buf()
        } else {
            resolve_in(current_dir, prefix)
        };

        let Some(re) = self.compile() else {
            return vec![self.literal.clone()];
        };
        let entries = match fs::read_dir(&base) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(dir = %base.display(), error = %e, "glob base not listable");
                return vec![self.literal.clone()];
            }
        };

        let mut matches: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| format!("{prefix}{}", entry.file_name().to_string_lossy()))
            .filter(|candidate| re.is_match(candidate))
            .collect();
        matches.sort();

        trace!(pattern = %self.literal, found = matches.len(), "glob expanded");
        if matches.is_empty() {
            vec![self.literal.clone()]
        } else {
            matches
        }
    }
}

fn segment_wildcard() -> String {
    let mut buf = [0u8; 4];
    format!("[^{}]*", regex::escape(MAIN_SEPARATOR.encode_utf8(&mut buf)))
}
