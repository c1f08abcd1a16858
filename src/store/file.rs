use crate::commit::AtomicFile;
use crate::errors::ConfigFileError;
use crate::format::{parse_into, write_section, ParseOptions};
use crate::store::tree::{SectionId, SectionTree};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A configuration tree bound to a file, with a current section that
/// relative paths resolve against.
#[derive(Debug, Clone)]
pub struct ConfigurationFile {
    tree: SectionTree,
    file_name: Option<PathBuf>,
    current: SectionId,
    options: ParseOptions,
    sync: bool,
}

impl Default for ConfigurationFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationFile {
    /// An empty configuration not associated with any file.
    pub fn new() -> Self {
        let tree = SectionTree::new();
        let current = tree.root();
        Self {
            tree,
            file_name: None,
            current,
            options: ParseOptions::default(),
            sync: true,
        }
    }

    /// Load a configuration file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let mut config = Self::new();
        config.load(path)?;
        Ok(config)
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether commits fsync the temp file before renaming it.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn tree(&self) -> &SectionTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SectionTree {
        &mut self.tree
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    pub fn root(&self) -> SectionId {
        self.tree.root()
    }

    /// Replace the whole tree with the contents of `path`. The file name is
    /// remembered and the current section reset to the root.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigFileError> {
        let path = path.as_ref();
        let mut tree = SectionTree::new();
        read_into(&mut tree, path, &self.options)?;
        tree.clear_edit_flag(tree.root());

        self.current = tree.root();
        self.tree = tree;
        self.file_name = Some(path.to_path_buf());
        debug!(file = %path.display(), "loaded configuration");
        Ok(())
    }

    /// Parse `path` on top of the existing tree. On error the tree is left
    /// as it was.
    pub fn merge(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigFileError> {
        let path = path.as_ref();
        let mut staged = self.tree.clone();
        read_into(&mut staged, path, &self.options)?;
        self.tree = staged;
        debug!(file = %path.display(), "merged configuration");
        Ok(())
    }

    /// Merge configuration text held in memory.
    pub fn merge_str(&mut self, text: &str, name: &str) -> Result<(), ConfigFileError> {
        let mut staged = self.tree.clone();
        parse_into(&mut staged, text.as_bytes(), name, &self.options)?;
        self.tree = staged;
        Ok(())
    }

    /// Rewrite the file this configuration was loaded from.
    pub fn save(&mut self) -> Result<(), ConfigFileError> {
        let path = self.file_name.clone().ok_or(ConfigFileError::NoFileName)?;
        self.write_to(&path)
    }

    /// Write to `path` and make it the configuration's file name.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigFileError> {
        let path = path.as_ref().to_path_buf();
        self.write_to(&path)?;
        self.file_name = Some(path);
        Ok(())
    }

    fn write_to(&mut self, path: &Path) -> Result<(), ConfigFileError> {
        let mut out = AtomicFile::create(path)?;
        self.write(&mut out)
            .map_err(|source| ConfigFileError::io(path, source))?;
        out.commit(self.sync)?;
        debug!(file = %path.display(), "saved configuration");
        Ok(())
    }

    /// Serialize the whole tree, clearing all edit flags.
    pub fn write<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        let root = self.tree.root();
        write_section(&mut self.tree, root, 0, out)
    }

    pub fn is_edited(&self) -> bool {
        self.tree.is_edited(self.tree.root())
    }

    // Current section.

    pub fn current_section(&self) -> SectionId {
        self.current
    }

    pub fn current_path(&self) -> String {
        self.tree.path(self.current)
    }

    /// Move the current section; the path must exist.
    pub fn set_current_section(&mut self, path: &str) -> Result<(), ConfigFileError> {
        self.current = self.tree.get_section(self.current, path)?;
        Ok(())
    }

    /// Resolve a section relative to the current one.
    pub fn section(&self, path: &str) -> Result<SectionId, ConfigFileError> {
        self.tree.get_section(self.current, path)
    }

    /// Names of the current section's subsections (suffixed with `/`),
    /// followed by its tag names.
    pub fn list(&self) -> Vec<String> {
        let sections = self
            .tree
            .subsections(self.current)
            .iter()
            .map(|id| format!("{}/", self.tree.name(*id)));
        let tags = self
            .tree
            .tag_values(self.current)
            .iter()
            .map(|tv| tv.tag.clone());
        sections.chain(tags).collect()
    }

    // Path-addressed access, relative to the current section.

    pub fn has_tag(&self, path: &str) -> Result<bool, ConfigFileError> {
        self.tree.has_tag(self.current, path)
    }

    pub fn find_tag_value(&self, path: &str) -> Result<Option<&str>, ConfigFileError> {
        self.tree.find_tag_value(self.current, path)
    }

    pub fn retrieve_tag_value(&self, path: &str) -> Result<&str, ConfigFileError> {
        self.tree.retrieve_tag_value(self.current, path)
    }

    pub fn retrieve_tag_value_or(&self, path: &str, default: &str) -> String {
        self.tree.retrieve_tag_value_or(self.current, path, default)
    }

    pub fn retrieve_tag_value_or_insert(&mut self, path: &str, default: &str) -> String {
        self.tree
            .retrieve_tag_value_or_insert(self.current, path, default)
    }

    pub fn store_tag_value(&mut self, path: &str, value: &str) {
        self.tree.store_tag_value(self.current, path, value);
    }

    pub fn remove_tag(&mut self, path: &str) -> Result<(), ConfigFileError> {
        let (id, tag) = self.tree.resolve(self.current, path)?;
        self.tree.remove_tag(id, tag);
        Ok(())
    }

    pub fn remove_subsection(&mut self, name: &str) {
        self.tree.remove_subsection(self.current, name);
    }

    /// Remove all contents of the section at `path`.
    pub fn clear_section(&mut self, path: &str) -> Result<(), ConfigFileError> {
        let id = self.tree.get_section(self.current, path)?;
        self.tree.clear(id);
        if !self.tree.contains(self.current) {
            self.current = id;
        }
        Ok(())
    }
}

fn read_into(
    tree: &mut SectionTree,
    path: &Path,
    options: &ParseOptions,
) -> Result<(), ConfigFileError> {
    let file = File::open(path).map_err(|source| ConfigFileError::io(path, source))?;
    parse_into(
        tree,
        BufReader::new(file),
        &path.display().to_string(),
        options,
    )
}
