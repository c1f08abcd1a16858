//! confpatch: hierarchical, human-editable configuration files
//!
//! A configuration is a tree of named sections holding ordered tag/value
//! pairs, stored in a line-oriented text format with comments, quoting,
//! line continuations and a `+=` list-append operator.
//!
//! # Architecture
//!
//! - [`store`]: the section tree, path resolution (`/`, `.`, `..`) and the
//!   [`ConfigurationFile`] facade tracking a file name and current section.
//! - [`format`]: the parser behind `load`/`merge` and the serializer behind
//!   `save`.
//! - [`patch`]: [`patch_file`], which rewrites one tag's value directly in
//!   the file without building a tree, leaving every other byte untouched.
//!
//! # Safety
//!
//! - `save` and `patch_file` write a temp file next to the target and rename
//!   it over the original (tempfile + fsync + rename)
//! - Malformed input aborts the whole operation; nothing partial is committed
//! - No locking: concurrent writers can lose updates between read and rename
//!
//! # Example
//!
//! ```no_run
//! use confpatch::{patch_file, ConfigurationFile};
//!
//! # fn main() -> Result<(), confpatch::ConfigFileError> {
//! let mut config = ConfigurationFile::open("vrui.cfg")?;
//! let fps = config.retrieve_tag_value_or_insert("/Video/fps", "60");
//! println!("fps = {fps}");
//!
//! // Change one value on disk, keeping comments and layout.
//! let outcome = patch_file("vrui.cfg", "/Video/width", "1024")?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod cmdline;
pub mod commit;
pub mod errors;
pub mod format;
pub mod patch;
pub mod settings;
pub mod store;

// Re-exports
pub use cmdline::merge_command_line;
pub use errors::ConfigFileError;
pub use format::{ParseOptions, DEFAULT_MAX_LINE_LENGTH};
pub use patch::{patch_file, patch_file_with, patch_str, PatchOptions, PatchOutcome};
pub use settings::{Settings, SettingsError};
pub use store::{ConfigurationFile, SectionId, SectionSnapshot, SectionTree, TagValue};
