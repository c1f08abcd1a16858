//! Arena-backed section tree.
//!
//! Sections live in a slot arena and refer to each other through
//! [`SectionId`] handles. A section owns its children through the ordered
//! `children` list; the `parent` handle is a non-owning back reference used
//! for `..` navigation and path reconstruction only.

use crate::errors::ConfigFileError;
use serde::Serialize;

/// Handle to a section inside a [`SectionTree`].
///
/// Handles carry a generation so that a handle to a removed section never
/// aliases a section created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagValue {
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone)]
struct SectionNode {
    name: String,
    parent: Option<SectionId>,
    children: Vec<SectionId>,
    values: Vec<TagValue>,
    edited: bool,
}

impl SectionNode {
    fn new(name: &str, parent: Option<SectionId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            values: Vec::new(),
            edited: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<SectionNode>,
}

/// Nested, owned view of a section used for JSON dumps and structural
/// comparison of two trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSnapshot {
    pub name: String,
    pub sections: Vec<SectionSnapshot>,
    pub values: Vec<TagValue>,
}

#[derive(Debug, Clone)]
pub struct SectionTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: SectionId,
}

impl Default for SectionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionTree {
    /// Create a tree holding only an empty root section.
    pub fn new() -> Self {
        let root = SectionId {
            index: 0,
            generation: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(SectionNode::new("", None)),
            }],
            free: Vec::new(),
            root,
        }
    }

    pub fn root(&self) -> SectionId {
        self.root
    }

    /// Returns true if the handle still refers to a live section.
    pub fn contains(&self, id: SectionId) -> bool {
        self.slots
            .get(id.index)
            .is_some_and(|slot| slot.generation == id.generation && slot.node.is_some())
    }

    /// # Panics
    ///
    /// Panics if `id` refers to a removed section.
    fn node(&self, id: SectionId) -> &SectionNode {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .unwrap_or_else(|| panic!("section handle {id:?} refers to a removed section"))
    }

    fn node_mut(&mut self, id: SectionId) -> &mut SectionNode {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .unwrap_or_else(|| panic!("section handle {id:?} refers to a removed section"))
    }

    fn alloc(&mut self, node: SectionNode) -> SectionId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                SectionId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                SectionId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Release a section and all of its descendants.
    fn release(&mut self, id: SectionId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let slot = &mut self.slots[next.index];
            if let Some(node) = slot.node.take() {
                pending.extend(node.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(next.index);
        }
    }

    pub fn name(&self, id: SectionId) -> &str {
        &self.node(id).name
    }

    pub fn parent(&self, id: SectionId) -> Option<SectionId> {
        self.node(id).parent
    }

    pub fn subsections(&self, id: SectionId) -> &[SectionId] {
        &self.node(id).children
    }

    pub fn tag_values(&self, id: SectionId) -> &[TagValue] {
        &self.node(id).values
    }

    pub fn find_subsection(&self, id: SectionId, name: &str) -> Option<SectionId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|child| self.node(*child).name == name)
    }

    /// Return the child of that name, creating and appending it if missing.
    pub fn add_subsection(&mut self, id: SectionId, name: &str) -> SectionId {
        if let Some(existing) = self.find_subsection(id, name) {
            return existing;
        }
        let child = self.alloc(SectionNode::new(name, Some(id)));
        let node = self.node_mut(id);
        node.children.push(child);
        node.edited = true;
        child
    }

    pub fn remove_subsection(&mut self, id: SectionId, name: &str) {
        if let Some(child) = self.find_subsection(id, name) {
            self.node_mut(id).children.retain(|c| *c != child);
            self.release(child);
        }
        self.node_mut(id).edited = true;
    }

    /// Set a tag's value. New tags are appended; existing tags keep their
    /// position.
    pub fn add_tag_value(&mut self, id: SectionId, tag: &str, value: &str) {
        let node = self.node_mut(id);
        match node.values.iter_mut().find(|tv| tv.tag == tag) {
            Some(existing) => existing.value = value.to_string(),
            None => node.values.push(TagValue {
                tag: tag.to_string(),
                value: value.to_string(),
            }),
        }
        node.edited = true;
    }

    pub fn remove_tag(&mut self, id: SectionId, tag: &str) {
        let node = self.node_mut(id);
        node.values.retain(|tv| tv.tag != tag);
        node.edited = true;
    }

    /// Remove every subsection and tag of a section.
    pub fn clear(&mut self, id: SectionId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.release(child);
        }
        let node = self.node_mut(id);
        node.values.clear();
        node.edited = true;
    }

    /// Absolute path of a section; the root is `/`.
    pub fn path(&self, id: SectionId) -> String {
        let mut names = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            names.push(self.node(current).name.as_str());
            current = parent;
        }
        if names.is_empty() {
            return "/".to_string();
        }
        names.iter().rev().fold(String::new(), |mut path, name| {
            path.push('/');
            path.push_str(name);
            path
        })
    }

    /// True if this section or any descendant has been edited.
    pub fn is_edited(&self, id: SectionId) -> bool {
        let node = self.node(id);
        node.edited || node.children.iter().any(|child| self.is_edited(*child))
    }

    pub fn clear_edit_flag(&mut self, id: SectionId) {
        let node = self.node_mut(id);
        node.edited = false;
        let children = node.children.clone();
        for child in children {
            self.clear_edit_flag(child);
        }
    }

    /// Clear only this section's own edit flag.
    pub(crate) fn mark_saved(&mut self, id: SectionId) {
        self.node_mut(id).edited = false;
    }

    pub fn snapshot(&self, id: SectionId) -> SectionSnapshot {
        let node = self.node(id);
        SectionSnapshot {
            name: node.name.clone(),
            sections: node
                .children
                .iter()
                .map(|child| self.snapshot(*child))
                .collect(),
            values: node.values.clone(),
        }
    }

    // Path resolution.

    fn start<'p>(&self, base: SectionId, path: &'p str) -> (SectionId, &'p str) {
        match path.strip_prefix('/') {
            Some(rest) => (self.root, rest),
            None => (base, path),
        }
    }

    /// Strict (read) resolution of a path naming a section.
    pub fn find_section(&self, base: SectionId, path: &str) -> Option<SectionId> {
        self.get_section(base, path).ok()
    }

    /// Strict (read) resolution of a path naming a section.
    pub fn get_section(&self, base: SectionId, path: &str) -> Result<SectionId, ConfigFileError> {
        let (start, rest) = self.start(base, path);
        self.walk(start, rest.split('/'))
    }

    /// Strict (read) resolution of a tag path. Returns the section holding
    /// the tag and the tag's bare name.
    pub fn resolve<'p>(
        &self,
        base: SectionId,
        path: &'p str,
    ) -> Result<(SectionId, &'p str), ConfigFileError> {
        let (start, rest) = self.start(base, path);
        let (sections, tag) = split_tag(rest);
        let id = match sections {
            Some(sections) => self.walk(start, sections.split('/'))?,
            None => start,
        };
        Ok((id, tag))
    }

    fn walk<'p>(
        &self,
        mut id: SectionId,
        components: impl Iterator<Item = &'p str>,
    ) -> Result<SectionId, ConfigFileError> {
        for component in components {
            id = match component {
                "" | "." => id,
                ".." => self.parent(id).unwrap_or(id),
                name => self.find_subsection(id, name).ok_or_else(|| {
                    ConfigFileError::SectionNotFound {
                        path: join_path(&self.path(id), name),
                    }
                })?,
            };
        }
        Ok(id)
    }

    /// Creating (write) resolution of a path naming a section.
    pub fn get_or_create_section(&mut self, base: SectionId, path: &str) -> SectionId {
        let (start, rest) = self.start(base, path);
        self.walk_creating(start, rest.split('/'))
    }

    /// Creating (write) resolution of a tag path; missing intermediate
    /// sections are added.
    pub fn resolve_or_create<'p>(&mut self, base: SectionId, path: &'p str) -> (SectionId, &'p str) {
        let (start, rest) = self.start(base, path);
        let (sections, tag) = split_tag(rest);
        let id = match sections {
            Some(sections) => self.walk_creating(start, sections.split('/')),
            None => start,
        };
        (id, tag)
    }

    fn walk_creating<'p>(
        &mut self,
        mut id: SectionId,
        components: impl Iterator<Item = &'p str>,
    ) -> SectionId {
        for component in components {
            id = match component {
                "" | "." => id,
                ".." => self.parent(id).unwrap_or(id),
                name => self.add_subsection(id, name),
            };
        }
        id
    }

    // Tag access.

    fn lookup(&self, id: SectionId, tag: &str) -> Option<&str> {
        self.node(id)
            .values
            .iter()
            .find(|tv| tv.tag == tag)
            .map(|tv| tv.value.as_str())
    }

    pub fn has_tag(&self, base: SectionId, path: &str) -> Result<bool, ConfigFileError> {
        Ok(self.find_tag_value(base, path)?.is_some())
    }

    pub fn find_tag_value(
        &self,
        base: SectionId,
        path: &str,
    ) -> Result<Option<&str>, ConfigFileError> {
        let (id, tag) = self.resolve(base, path)?;
        Ok(self.lookup(id, tag))
    }

    pub fn retrieve_tag_value(&self, base: SectionId, path: &str) -> Result<&str, ConfigFileError> {
        let (id, tag) = self.resolve(base, path)?;
        self.lookup(id, tag)
            .ok_or_else(|| ConfigFileError::TagNotFound {
                tag: tag.to_string(),
                section: self.path(id),
            })
    }

    /// Read-only default lookup: a missing section or tag yields `default`
    /// and the tree is left untouched.
    pub fn retrieve_tag_value_or(&self, base: SectionId, path: &str, default: &str) -> String {
        match self.find_tag_value(base, path) {
            Ok(Some(value)) => value.to_string(),
            Ok(None) | Err(_) => default.to_string(),
        }
    }

    /// Memoizing default lookup: a missing tag is stored with `default` (and
    /// missing sections are created) so the default is persisted on save.
    pub fn retrieve_tag_value_or_insert(
        &mut self,
        base: SectionId,
        path: &str,
        default: &str,
    ) -> String {
        let (id, tag) = self.resolve_or_create(base, path);
        if let Some(value) = self.lookup(id, tag) {
            return value.to_string();
        }
        let node = self.node_mut(id);
        node.values.push(TagValue {
            tag: tag.to_string(),
            value: default.to_string(),
        });
        node.edited = true;
        default.to_string()
    }

    pub fn store_tag_value(&mut self, base: SectionId, path: &str, value: &str) {
        let (id, tag) = self.resolve_or_create(base, path);
        self.add_tag_value(id, tag, value);
    }
}

/// Split off the final slash-free component as a tag name.
fn split_tag(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('/') {
        Some((sections, tag)) => (Some(sections), tag),
        None => (None, path),
    }
}

fn join_path(section: &str, name: &str) -> String {
    if section == "/" {
        format!("/{name}")
    } else {
        format!("{section}/{name}")
    }
}
