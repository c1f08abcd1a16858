//! The line-oriented configuration text format.
//!
//! ```text
//! section Video
//!     width 800            # trailing comment
//!     modes (640x480, \
//!            800x600)
//!     modes += (1024x768)
//! endsection
//! ```

pub mod decode;
pub mod parser;
pub mod reader;
pub mod writer;

pub use decode::{decode_string, DecodeError};
pub use parser::{parse_into, splice_list};
pub use reader::LogicalLines;
pub use writer::write_section;

/// Physical line limit, newline included.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_line_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}
