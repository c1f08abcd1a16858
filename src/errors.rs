use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("{message} in line {line} of file {file}")]
    Malformed {
        message: String,
        line: usize,
        file: String,
    },

    #[error("Configuration file section \"{path}\" not found")]
    SectionNotFound { path: String },

    #[error("Configuration file tag \"{tag}\" not found in section \"{section}\"")]
    TagNotFound { tag: String, section: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to replace {} with patched file: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no file name associated with this configuration")]
    NoFileName,
}

impl ConfigFileError {
    pub(crate) fn malformed(message: impl Into<String>, line: usize, file: &str) -> Self {
        ConfigFileError::Malformed {
            message: message.into(),
            line,
            file: file.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigFileError::Io {
            path: path.into(),
            source,
        }
    }

    /// Line number for malformed-file errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            ConfigFileError::Malformed { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = ConfigFileError::malformed("Extra endsection command", 7, "vrui.cfg");
        assert_eq!(
            err.to_string(),
            "Extra endsection command in line 7 of file vrui.cfg"
        );
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn test_not_found_display() {
        let err = ConfigFileError::TagNotFound {
            tag: "width".to_string(),
            section: "/Video".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration file tag \"width\" not found in section \"/Video\""
        );
        assert_eq!(err.line(), None);
    }
}
