//! Section match frames for the patch automaton.
//!
//! Each `section` entered pushes a frame recording how many components of the
//! target tag path the enclosing sections have matched. A frame with no match
//! marks a subtree that cannot contain the target.

use tracing::trace;

/// A `/`-separated tag path, split into section components and a final tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPath {
    components: Vec<String>,
}

impl TagPath {
    /// Parse a tag path. Leading slashes are ignored: the path is always
    /// matched from the top level of the file.
    pub fn parse(input: &str) -> Self {
        Self {
            components: input
                .trim_start_matches('/')
                .split('/')
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn tag(&self) -> &str {
        self.components.last().map_or("", String::as_str)
    }

    /// Number of section components before the tag.
    pub fn depth(&self) -> usize {
        self.components.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MatchFrame {
    name: String,
    /// Number of leading path components matched by the sections up to and
    /// including this one; `None` once the path diverged.
    matched: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SectionMatcher<'a> {
    path: &'a TagPath,
    frames: Vec<MatchFrame>,
}

impl<'a> SectionMatcher<'a> {
    pub fn new(path: &'a TagPath) -> Self {
        Self {
            path,
            frames: vec![MatchFrame {
                name: String::new(),
                matched: Some(0),
            }],
        }
    }

    fn top(&self) -> &MatchFrame {
        &self.frames[self.frames.len() - 1]
    }

    /// Number of open sections.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn enter(&mut self, name: &[u8]) {
        let matched = match self.top().matched {
            Some(count)
                if count < self.path.depth()
                    && self.path.components[count].as_bytes() == name =>
            {
                Some(count + 1)
            }
            _ => None,
        };
        let name = String::from_utf8_lossy(name).into_owned();
        trace!(section = %name, ?matched, "entered section");
        self.frames.push(MatchFrame { name, matched });
    }

    /// Close the innermost section; false if no section is open.
    pub fn leave(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }
        self.frames.pop();
        true
    }

    /// True if the innermost section is the target's parent and `tag` is the
    /// target tag.
    pub fn is_target(&self, tag: &[u8]) -> bool {
        self.top().matched == Some(self.path.depth()) && self.path.tag().as_bytes() == tag
    }

    /// Names of the open sections, outermost first.
    pub fn open_sections(&self) -> impl Iterator<Item = &str> {
        self.frames[1..].iter().map(|frame| frame.name.as_str())
    }
}
