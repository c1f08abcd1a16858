//! In-place rewriting of a single tag value.
//!
//! [`patch_file`] streams a configuration file through the [`Automaton`] into
//! a temp file next to it and renames the result over the original. Only the
//! target tag's value changes; comments, quoting, whitespace and ordering of
//! everything else are copied through byte for byte. No in-memory tree is
//! built, and a failure leaves the original untouched.

pub mod automaton;
pub mod matcher;

pub use automaton::Automaton;
pub use matcher::{SectionMatcher, TagPath};

use crate::commit::AtomicFile;
use crate::errors::ConfigFileError;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// fsync the temp file before the rename.
    pub sync: bool,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self { sync: true }
    }
}

/// Result of a patch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchOutcome reports whether the tag was found"]
pub enum PatchOutcome {
    /// The value was replaced on these (1-based) lines.
    Replaced { lines: Vec<usize> },
    /// The tag path does not occur; the output equals the input.
    NotFound,
}

impl PatchOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, PatchOutcome::Replaced { .. })
    }
}

/// Rewrite `path` so that the tag at `tag_path` has value `new_value`.
pub fn patch_file(
    path: impl AsRef<Path>,
    tag_path: &str,
    new_value: &str,
) -> Result<PatchOutcome, ConfigFileError> {
    patch_file_with(path, tag_path, new_value, &PatchOptions::default())
}

pub fn patch_file_with(
    path: impl AsRef<Path>,
    tag_path: &str,
    new_value: &str,
    options: &PatchOptions,
) -> Result<PatchOutcome, ConfigFileError> {
    let path = path.as_ref();
    let file_name = path.display().to_string();

    let mut temp = AtomicFile::create(path)?;
    let input = File::open(path).map_err(|source| ConfigFileError::io(path, source))?;

    let outcome = patch_stream(BufReader::new(input), &mut temp, tag_path, new_value, &file_name)?;
    temp.commit(options.sync)?;

    debug!(file = %file_name, tag_path, ?outcome, "patched configuration file");
    Ok(outcome)
}

/// Run the patch automaton from `input` to `output`.
pub fn patch_stream<R: Read, W: Write>(
    input: R,
    output: &mut W,
    tag_path: &str,
    new_value: &str,
    file_name: &str,
) -> Result<PatchOutcome, ConfigFileError> {
    let path = TagPath::parse(tag_path);
    let mut automaton = Automaton::new(SectionMatcher::new(&path), new_value, file_name);

    for byte in input.bytes() {
        let byte = byte.map_err(|source| ConfigFileError::io(file_name, source))?;
        automaton.feed(byte, output)?;
    }

    let lines = automaton.finish()?;
    if lines.is_empty() {
        warn!(file = file_name, tag_path, "tag not found; file left unchanged");
        Ok(PatchOutcome::NotFound)
    } else {
        Ok(PatchOutcome::Replaced { lines })
    }
}

/// Patch configuration text held in memory.
pub fn patch_str(
    input: &str,
    tag_path: &str,
    new_value: &str,
) -> Result<(String, PatchOutcome), ConfigFileError> {
    let mut output = Vec::with_capacity(input.len() + new_value.len());
    let outcome = patch_stream(input.as_bytes(), &mut output, tag_path, new_value, "<memory>")?;
    Ok((String::from_utf8_lossy(&output).into_owned(), outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_patch_file_rewrites_value() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vrui.cfg");
        fs::write(&file, "section Video\n\twidth 800 # screen width\nendsection\n").unwrap();

        let outcome = patch_file(&file, "/Video/width", "1024").unwrap();
        assert_eq!(outcome, PatchOutcome::Replaced { lines: vec![2] });
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "section Video\n\twidth 1024 # screen width\nendsection\n"
        );
    }

    #[test]
    fn test_patch_file_missing_tag_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vrui.cfg");
        let input = "# comment\nsection Video\n  width   800\nendsection\n";
        fs::write(&file, input).unwrap();

        let outcome = patch_file(&file, "/Video/height", "600").unwrap();
        assert_eq!(outcome, PatchOutcome::NotFound);
        assert_eq!(fs::read_to_string(&file).unwrap(), input);
    }

    #[test]
    fn test_patch_file_error_leaves_original() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.cfg");
        let input = "a 1\nendsection\n";
        fs::write(&file, input).unwrap();

        let err = patch_file(&file, "a", "2").unwrap_err();
        assert!(matches!(err, ConfigFileError::Malformed { line: 2, .. }));
        assert_eq!(fs::read_to_string(&file).unwrap(), input);

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_patch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("absent.cfg");
        let err = patch_file(&file, "a", "2").unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_patch_str() {
        let (out, outcome) = patch_str("a 1\n", "a", "2").unwrap();
        assert_eq!(out, "a 2\n");
        assert!(outcome.is_replaced());
    }
}
