//! The in-memory configuration tree.

pub mod file;
pub mod tree;

pub use file::ConfigurationFile;
pub use tree::{SectionId, SectionSnapshot, SectionTree, TagValue};
