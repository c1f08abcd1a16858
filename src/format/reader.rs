//! Physical-to-logical line assembly.
//!
//! A physical line ending in a backslash continues onto the next one. Leading
//! whitespace of every physical line is dropped, and continuation lines that
//! start with `#` vanish unless they open the logical line.

use crate::errors::ConfigFileError;
use crate::format::decode::is_space;
use std::io::BufRead;

pub struct LogicalLines<R> {
    reader: R,
    file: String,
    line_number: usize,
    max_line_length: usize,
    buffer: Vec<u8>,
}

impl<R: BufRead> LogicalLines<R> {
    pub fn new(reader: R, file: impl Into<String>, max_line_length: usize) -> Self {
        Self {
            reader,
            file: file.into(),
            line_number: 0,
            max_line_length,
            buffer: Vec::new(),
        }
    }

    /// Number of the last physical line read.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next logical line, or `None` at end of input.
    ///
    /// Lines are returned as raw bytes; the format does not require any
    /// particular encoding.
    pub fn next_line(&mut self) -> Result<Option<Vec<u8>>, ConfigFileError> {
        let mut line = Vec::new();
        let mut first = true;

        loop {
            self.buffer.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buffer)
                .map_err(|source| ConfigFileError::io(&self.file, source))?;
            if read == 0 {
                if first {
                    return Ok(None);
                }
                break;
            }
            self.line_number += 1;

            if self.buffer.len() > self.max_line_length {
                return Err(self.malformed("Line too long"));
            }
            if self.buffer.last() != Some(&b'\n') {
                return Err(self.malformed("Line not terminated by newline"));
            }

            let mut content = &self.buffer[..self.buffer.len() - 1];
            let continued = content.last() == Some(&b'\\');
            if continued {
                content = &content[..content.len() - 1];
            }
            let start = content
                .iter()
                .position(|byte| !is_space(*byte))
                .unwrap_or(content.len());
            let content = &content[start..];

            if first || content.first() != Some(&b'#') {
                line.extend_from_slice(content);
            }

            if !continued {
                break;
            }
            first = false;
        }

        Ok(Some(line))
    }

    pub fn malformed(&self, message: &str) -> ConfigFileError {
        ConfigFileError::malformed(message, self.line_number, &self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &str) -> Result<Vec<String>, ConfigFileError> {
        let mut reader = LogicalLines::new(input.as_bytes(), "test.cfg", 1024);
        let mut out = Vec::new();
        while let Some(line) = reader.next_line()? {
            out.push(String::from_utf8_lossy(&line).into_owned());
        }
        Ok(out)
    }

    #[test]
    fn test_plain_lines() {
        assert_eq!(lines("a 1\n  b 2\n").unwrap(), vec!["a 1", "b 2"]);
    }

    #[test]
    fn test_continuation_joins_lines() {
        assert_eq!(
            lines("list (1, \\\n    2, \\\n    3)\nnext x\n").unwrap(),
            vec!["list (1, 2, 3)", "next x"]
        );
    }

    #[test]
    fn test_comment_continuation_lines_vanish() {
        assert_eq!(
            lines("list (1, \\\n# dropped \\\n  2)\n").unwrap(),
            vec!["list (1, 2)"]
        );
    }

    #[test]
    fn test_first_comment_line_kept() {
        assert_eq!(
            lines("# heading \\\nstill comment\n").unwrap(),
            vec!["# heading still comment"]
        );
    }

    #[test]
    fn test_missing_final_newline() {
        let err = lines("a 1\nb 2").unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_line_too_long() {
        let mut input = "x ".to_string();
        input.push_str(&"y".repeat(40));
        input.push('\n');
        let mut reader = LogicalLines::new(input.as_bytes(), "test.cfg", 16);
        let err = reader.next_line().unwrap_err();
        assert!(err.to_string().starts_with("Line too long in line 1"));
    }

    #[test]
    fn test_line_numbers_track_physical_lines() {
        let mut reader = LogicalLines::new("a \\\nb\nc\n".as_bytes(), "t", 1024);
        reader.next_line().unwrap();
        assert_eq!(reader.line_number(), 2);
        reader.next_line().unwrap();
        assert_eq!(reader.line_number(), 3);
        assert!(reader.next_line().unwrap().is_none());
    }

    #[test]
    fn test_non_utf8_bytes_pass_through() {
        let input = b"# Gr\xF6sse\nname Stra\xDFe\n";
        let mut reader = LogicalLines::new(&input[..], "latin1.cfg", 1024);
        assert_eq!(reader.next_line().unwrap().unwrap(), b"# Gr\xF6sse".to_vec());
        assert_eq!(reader.next_line().unwrap().unwrap(), b"name Stra\xDFe".to_vec());
        assert!(reader.next_line().unwrap().is_none());
    }
}
