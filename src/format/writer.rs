use crate::store::{SectionId, SectionTree};
use std::io::{self, Write};

/// Write the body of `section` at nesting depth `level`, subsections first,
/// and clear the edit flag of every section written.
///
/// Values are written verbatim. Values the parser cannot read back as
/// written do not survive a save/load cycle: an empty value (the tag is
/// removed on load), a value containing an unescaped `#` (cut at the
/// comment), and surrounding whitespace (trimmed).
pub fn write_section<W: Write>(
    tree: &mut SectionTree,
    section: SectionId,
    level: usize,
    out: &mut W,
) -> io::Result<()> {
    let prefix = "\t".repeat(level);
    let mut wrote_something = false;

    for child in tree.subsections(section).to_vec() {
        if wrote_something {
            writeln!(out, "{prefix}")?;
        }
        writeln!(out, "{prefix}section {}", tree.name(child))?;
        write_section(tree, child, level + 1, out)?;
        writeln!(out, "{prefix}endsection")?;
        wrote_something = true;
    }

    for tv in tree.tag_values(section) {
        if wrote_something {
            writeln!(out, "{prefix}")?;
            wrote_something = false;
        }
        writeln!(out, "{prefix}{} {}", tv.tag, tv.value)?;
    }

    tree.mark_saved(section);
    Ok(())
}

/// Serialize a whole tree into a string.
pub fn to_string(tree: &mut SectionTree) -> String {
    let mut out = Vec::new();
    let root = tree.root();
    // Writes into a Vec cannot fail.
    let _ = write_section(tree, root, 0, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}
