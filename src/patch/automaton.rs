//! Character-level automaton driving `patch_file`.
//!
//! The automaton consumes the configuration file one byte at a time and
//! copies every byte to the output, except for the value of the target tag,
//! which is swallowed and replaced. It tracks just enough of the grammar
//! (keywords, quoting, escapes, continuations, comments and the section
//! stack) to recognize the target tag without building a tree.

use crate::errors::ConfigFileError;
use crate::format::decode::{is_space, process_escape};
use crate::patch::matcher::SectionMatcher;
use std::io::Write;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Start of line, collecting indentation.
    Line,
    /// Reading a bare tag or keyword.
    Tag,
    /// Reading a quoted tag or keyword.
    QuotedTag,
    /// Whitespace between `section` and the section name.
    SectionWs,
    Section,
    QuotedSection,
    /// Whitespace between a tag and its value.
    ValueWs,
    /// Saw `+` after a tag.
    ValueWsPlus,
    /// Saw `+=` after a tag; expecting `(`.
    ValueWsPlusEqual,
    Value,
    /// Leading whitespace of a value continuation line.
    ValueSkipWs,
    /// Swallowing the target tag's old value.
    SkipValue,
    Comment,
    /// After a keyword; only whitespace or a comment may follow.
    SkipLine,
}

pub struct Automaton<'a> {
    state: State,
    file: &'a str,
    line: usize,
    matcher: SectionMatcher<'a>,
    replacement: &'a str,
    /// Indentation of the current physical line.
    whitespace: Vec<u8>,
    tag: Vec<u8>,
    section: Vec<u8>,
    /// Trailing whitespace swallowed from the old value, put back in front
    /// of a trailing comment.
    pending: Vec<u8>,
    escaped: bool,
    quote: Option<u8>,
    copy: bool,
    replaced: Vec<usize>,
}

impl<'a> Automaton<'a> {
    pub fn new(matcher: SectionMatcher<'a>, replacement: &'a str, file: &'a str) -> Self {
        Self {
            state: State::Line,
            file,
            line: 1,
            matcher,
            replacement,
            whitespace: Vec::new(),
            tag: Vec::new(),
            section: Vec::new(),
            pending: Vec::new(),
            escaped: false,
            quote: None,
            copy: true,
            replaced: Vec::new(),
        }
    }

    fn malformed(&self, message: &str) -> ConfigFileError {
        ConfigFileError::malformed(message, self.line, self.file)
    }

    fn write<W: Write>(&self, out: &mut W, bytes: &[u8]) -> Result<(), ConfigFileError> {
        out.write_all(bytes)
            .map_err(|source| ConfigFileError::io(self.file, source))
    }

    /// An unescaped newline: move to the next line.
    fn next_line(&mut self) {
        self.line += 1;
        self.whitespace.clear();
        self.quote = None;
        self.state = State::Line;
    }

    /// Track a quote character inside a value.
    fn toggle_quote(&mut self, c: u8) {
        match self.quote {
            Some(open) if open == c => self.quote = None,
            None => self.quote = Some(c),
            Some(_) => {}
        }
    }

    pub fn feed<W: Write>(&mut self, c: u8, out: &mut W) -> Result<(), ConfigFileError> {
        match self.state {
            State::Line => {
                if c == b'\n' {
                    self.next_line();
                } else if c == b'#' {
                    self.state = State::Comment;
                } else if c == b'"' || c == b'\'' {
                    self.quote = Some(c);
                    self.tag.clear();
                    self.state = State::QuotedTag;
                } else if is_space(c) {
                    self.whitespace.push(c);
                } else {
                    self.tag.clear();
                    self.state = State::Tag;
                    if c == b'\\' {
                        self.escaped = true;
                    } else {
                        self.tag.push(c);
                    }
                }
            }

            State::Tag => {
                if self.escaped {
                    if c == b'\n' {
                        self.line += 1;
                    } else {
                        self.tag.push(process_escape(c));
                    }
                    self.escaped = false;
                } else if c == b'\\' {
                    self.escaped = true;
                } else if is_space(c) {
                    self.finish_bare_tag(c, out)?;
                } else {
                    self.tag.push(c);
                }
            }

            State::QuotedTag => {
                if self.escaped {
                    if c == b'\n' {
                        self.line += 1;
                    } else {
                        self.tag.push(process_escape(c));
                    }
                    self.escaped = false;
                } else if c == b'\\' {
                    self.escaped = true;
                } else if Some(c) != self.quote {
                    if c == b'\n' {
                        self.line += 1;
                    }
                    self.tag.push(c);
                } else {
                    self.quote = None;
                    self.finish_quoted_tag(c, out)?;
                }
            }

            State::SectionWs => {
                if c == b'\n' || c == b'#' {
                    return Err(self.malformed("Missing section name"));
                } else if c == b'"' || c == b'\'' {
                    self.quote = Some(c);
                    self.section.clear();
                    self.state = State::QuotedSection;
                } else if !is_space(c) {
                    self.section.clear();
                    self.state = State::Section;
                    if c == b'\\' {
                        self.escaped = true;
                    } else {
                        self.section.push(c);
                    }
                }
            }

            State::Section => {
                if self.escaped {
                    if c == b'\n' {
                        self.line += 1;
                    } else {
                        self.section.push(process_escape(c));
                    }
                    self.escaped = false;
                } else if c == b'\\' {
                    self.escaped = true;
                } else if c == b'\n' || c == b'#' {
                    while self.section.last().is_some_and(|b| is_space(*b)) {
                        self.section.pop();
                    }
                    self.matcher.enter(&self.section);
                    if c == b'#' {
                        self.state = State::Comment;
                    } else {
                        self.next_line();
                    }
                } else {
                    self.section.push(c);
                }
            }

            State::QuotedSection => {
                if self.escaped {
                    if c == b'\n' {
                        self.line += 1;
                    } else {
                        self.section.push(process_escape(c));
                    }
                    self.escaped = false;
                } else if c == b'\\' {
                    self.escaped = true;
                } else if Some(c) == self.quote {
                    self.quote = None;
                    self.matcher.enter(&self.section);
                    self.state = State::SkipLine;
                } else {
                    if c == b'\n' {
                        self.line += 1;
                    }
                    self.section.push(c);
                }
            }

            State::ValueWs => {
                if c == b'\n' {
                    self.next_line();
                } else if c == b'#' {
                    self.state = State::Comment;
                } else if c == b'+' {
                    self.state = State::ValueWsPlus;
                } else if !is_space(c) {
                    self.state = State::Value;
                    self.value_byte(c);
                }
            }

            State::ValueWsPlus => {
                if c == b'=' {
                    self.state = State::ValueWsPlusEqual;
                } else {
                    return Err(self.malformed("Malformed += list continuation"));
                }
            }

            State::ValueWsPlusEqual => {
                if c == b'(' {
                    self.state = State::Value;
                } else if c == b'\n' || !is_space(c) {
                    return Err(self.malformed("Malformed += list continuation"));
                }
            }

            State::Value => {
                if self.escaped {
                    if c == b'\n' {
                        self.line += 1;
                        self.state = State::ValueSkipWs;
                    }
                    self.escaped = false;
                } else if c == b'\n' {
                    self.next_line();
                } else if c == b'#' && self.quote.is_none() {
                    self.state = State::Comment;
                } else {
                    self.value_byte(c);
                }
            }

            State::ValueSkipWs => {
                if c == b'\n' {
                    self.next_line();
                } else if c == b'#' && self.quote.is_none() {
                    self.state = State::Comment;
                } else if !is_space(c) {
                    self.state = State::Value;
                    self.value_byte(c);
                }
            }

            State::SkipValue => {
                if self.escaped {
                    if c == b'\n' {
                        self.line += 1;
                    }
                    self.escaped = false;
                    if is_space(c) {
                        self.pending.push(c);
                    }
                } else if c == b'\\' {
                    self.escaped = true;
                    self.pending.clear();
                } else if c == b'\n' {
                    // Keep the line ending of CRLF files.
                    if self.pending.last() == Some(&b'\r') {
                        self.write(out, b"\r")?;
                    }
                    self.pending.clear();
                    self.copy = true;
                    self.next_line();
                } else if c == b'#' && self.quote.is_none() {
                    self.copy = true;
                    let pending = std::mem::take(&mut self.pending);
                    self.write(out, &pending)?;
                    self.state = State::Comment;
                } else {
                    if c == b'"' || c == b'\'' {
                        self.toggle_quote(c);
                    }
                    if is_space(c) {
                        self.pending.push(c);
                    } else {
                        self.pending.clear();
                    }
                }
            }

            State::Comment => {
                if c == b'\n' {
                    self.next_line();
                }
            }

            State::SkipLine => {
                if c == b'\n' {
                    self.next_line();
                } else if c == b'#' {
                    self.state = State::Comment;
                } else if !is_space(c) {
                    return Err(self.malformed("Dangling bits at line end"));
                }
            }
        }

        if self.copy {
            self.write(out, &[c])?;
        }
        Ok(())
    }

    /// A byte of a copied-through value other than an unescaped newline or
    /// comment start.
    fn value_byte(&mut self, c: u8) {
        if c == b'\\' {
            self.escaped = true;
        } else if c == b'"' || c == b'\'' {
            self.toggle_quote(c);
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.tag.eq_ignore_ascii_case(keyword.as_bytes())
    }

    fn finish_bare_tag<W: Write>(&mut self, c: u8, out: &mut W) -> Result<(), ConfigFileError> {
        if self.is_keyword("section") {
            if c == b'\n' {
                return Err(self.malformed("Missing section name"));
            }
            self.state = State::SectionWs;
            return Ok(());
        }

        if self.is_keyword("endsection") {
            self.leave_section()?;
            if c == b'\n' {
                self.next_line();
            } else {
                self.state = State::SkipLine;
            }
            return Ok(());
        }

        if self.matcher.is_target(&self.tag) {
            self.replace_value(None, out)?;
            if c != b'\n' {
                self.pending.push(c);
            }
        } else {
            self.state = State::ValueWs;
        }
        if c == b'\n' {
            self.copy = true;
            self.next_line();
        }
        Ok(())
    }

    fn finish_quoted_tag<W: Write>(
        &mut self,
        quote: u8,
        out: &mut W,
    ) -> Result<(), ConfigFileError> {
        if self.is_keyword("section") {
            self.state = State::SectionWs;
        } else if self.is_keyword("endsection") {
            self.leave_section()?;
            self.state = State::SkipLine;
        } else if self.matcher.is_target(&self.tag) {
            self.replace_value(Some(quote), out)?;
        } else {
            self.state = State::ValueWs;
        }
        Ok(())
    }

    fn leave_section(&mut self) -> Result<(), ConfigFileError> {
        if self.matcher.leave() {
            Ok(())
        } else {
            Err(self.malformed("Extra endsection command"))
        }
    }

    /// Emit the replacement value and start swallowing the old one. The byte
    /// that ended the tag has not been written yet; a closing quote is
    /// written here.
    fn replace_value<W: Write>(
        &mut self,
        closing_quote: Option<u8>,
        out: &mut W,
    ) -> Result<(), ConfigFileError> {
        debug!(
            file = self.file,
            line = self.line,
            section = %self.matcher.open_sections().collect::<Vec<_>>().join("/"),
            "replacing tag value"
        );
        if let Some(quote) = closing_quote {
            self.write(out, &[quote])?;
        }
        self.write(out, b" ")?;
        for (index, chunk) in self.replacement.split('\n').enumerate() {
            if index > 0 {
                self.write(out, b"\n")?;
                self.write(out, &self.whitespace)?;
            }
            self.write(out, chunk.as_bytes())?;
        }
        self.replaced.push(self.line);
        self.pending.clear();
        self.copy = false;
        self.state = State::SkipValue;
        Ok(())
    }

    /// Finish at end of input; returns the lines where the target was
    /// replaced.
    pub fn finish(self) -> Result<Vec<usize>, ConfigFileError> {
        match self.state {
            State::QuotedTag | State::QuotedSection => {
                Err(self.malformed("Unterminated quoted name"))
            }
            _ => Ok(self.replaced),
        }
    }
}
