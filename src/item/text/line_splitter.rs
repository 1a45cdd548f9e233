//! Line boundary detection over decoded text.

use std::{collections::VecDeque, mem};

/// Incremental line splitter.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`. A `\r` that closes one chunk and
/// a `\n` that opens the next still count as a single `\r\n` terminator.
#[derive(Debug, Default)]
pub struct LineSplitter {
    line: String,
    after_cr: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next piece of text, pushing every completed line onto `lines`.
    pub fn feed(&mut self, text: &str, lines: &mut VecDeque<String>) {
        let mut rest = text;

        if self.after_cr && !rest.is_empty() {
            self.after_cr = false;
            rest = rest.strip_prefix('\n').unwrap_or(rest);
        }

        while let Some(pos) = rest.find(['\r', '\n']) {
            self.line.push_str(&rest[..pos]);
            lines.push_back(mem::take(&mut self.line));

            let terminator = rest.as_bytes()[pos];
            rest = &rest[pos + 1..];

            if terminator == b'\r' {
                if rest.is_empty() {
                    self.after_cr = true;
                } else {
                    rest = rest.strip_prefix('\n').unwrap_or(rest);
                }
            }
        }

        self.line.push_str(rest);
    }

    /// Ends the stream, returning the last line if it had no terminator.
    ///
    /// A terminator at the very end of the stream does not open a new line, so
    /// nothing is returned in that case.
    pub fn finish(&mut self) -> Option<String> {
        self.after_cr = false;
        if self.line.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.line))
        }
    }
}

/// Splits a complete text into lines.
///
/// # Examples
///
/// ```
/// use batch_lines::item::text::line_splitter::split_lines;
///
/// assert_eq!(split_lines("a\r\nb\rc\n"), vec!["a", "b", "c"]);
/// assert_eq!(split_lines("\n"), vec![""]);
/// assert!(split_lines("").is_empty());
/// ```
pub fn split_lines(text: &str) -> Vec<String> {
    let mut splitter = LineSplitter::new();
    let mut lines = VecDeque::new();
    splitter.feed(text, &mut lines);
    lines.extend(splitter.finish());
    lines.into()
}
