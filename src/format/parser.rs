use crate::errors::ConfigFileError;
use crate::format::decode::{decode_string, trim_end_space, trim_start_space, DecodeError};
use crate::format::reader::LogicalLines;
use crate::format::ParseOptions;
use crate::store::{SectionId, SectionTree};
use std::io::BufRead;
use tracing::debug;

/// Parse configuration text from `reader` into `tree`, starting at the root.
///
/// Existing sections and tags are reused and overwritten, so the same
/// function serves both a fresh load and a layered merge. On error the tree
/// may hold a partial result; callers that need atomicity parse into a copy.
pub fn parse_into<R: BufRead>(
    tree: &mut SectionTree,
    reader: R,
    file: &str,
    options: &ParseOptions,
) -> Result<(), ConfigFileError> {
    let mut lines = LogicalLines::new(reader, file, options.max_line_length);
    let mut section = tree.root();
    let mut logical_lines = 0usize;

    while let Some(raw) = lines.next_line()? {
        logical_lines += 1;
        // Comment text is never decoded; only the rest of the line has to
        // be readable, and invalid sequences in it become U+FFFD.
        let line = String::from_utf8_lossy(strip_comment(&raw));
        let line = trim_end_space(&line);
        if line.is_empty() {
            continue;
        }
        section = apply_line(tree, section, line, &lines)?;
    }

    debug!(
        file,
        physical_lines = lines.line_number(),
        logical_lines,
        "parsed configuration"
    );
    Ok(())
}

/// Apply one comment-free, right-trimmed logical line; returns the section
/// that is current afterwards.
fn apply_line<R: BufRead>(
    tree: &mut SectionTree,
    section: SectionId,
    line: &str,
    lines: &LogicalLines<R>,
) -> Result<SectionId, ConfigFileError> {
    let (token, consumed) = decode_string(line).map_err(|err| decode_error(err, lines))?;
    let rest = trim_start_space(&line[consumed..]);

    if token.eq_ignore_ascii_case("section") {
        let name = if rest.starts_with('"') {
            decode_string(rest)
                .map_err(|err| decode_error(err, lines))?
                .0
        } else {
            rest.to_string()
        };
        if name.is_empty() {
            return Err(lines.malformed("Missing section name after section command"));
        }
        return Ok(tree.add_subsection(section, &name));
    }

    if token.eq_ignore_ascii_case("endsection") {
        return tree
            .parent(section)
            .ok_or_else(|| lines.malformed("Extra endsection command"));
    }

    if rest.is_empty() {
        tree.remove_tag(section, &token);
    } else if let Some(appended) = rest.strip_prefix("+=") {
        let appended = trim_start_space(appended);
        if !appended.is_empty() {
            let current = tree
                .tag_values(section)
                .iter()
                .find(|tv| tv.tag == token)
                .map_or_else(|| "()".to_string(), |tv| tv.value.clone());
            let spliced = splice_list(&current, appended)
                .ok_or_else(|| lines.malformed("+= operator used on non-list"))?;
            tree.add_tag_value(section, &token, &spliced);
        }
    } else {
        tree.add_tag_value(section, &token, rest);
    }
    Ok(section)
}

/// Append the items of list `appended` to list `current`.
///
/// Both are expected to be single-level `(...)` lists; nested lists are
/// spliced textually.
pub fn splice_list(current: &str, appended: &str) -> Option<String> {
    let head = current.strip_suffix(')')?;
    let items = appended.strip_prefix('(')?;
    let mut spliced = String::with_capacity(head.len() + items.len() + 2);
    spliced.push_str(head);
    if !head.ends_with('(') {
        spliced.push_str(", ");
    }
    spliced.push_str(items);
    Some(spliced)
}

/// Cut a logical line at its first unescaped `#`.
fn strip_comment(line: &[u8]) -> &[u8] {
    let mut escaped = false;
    for (index, &byte) in line.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == b'#' {
            return &line[..index];
        }
    }
    line
}

fn decode_error<R: BufRead>(err: DecodeError, lines: &LogicalLines<R>) -> ConfigFileError {
    let message = match err {
        DecodeError::UnterminatedQuote { .. } => "Unterminated quoted string",
        DecodeError::Empty => "Missing token",
    };
    lines.malformed(message)
}
