//! Merging `-tag value` command-line pairs into a configuration.

use crate::store::ConfigurationFile;
use tracing::debug;

/// Store every `-tag value` pair of `args` (after the program name) in the
/// configuration, resolving `tag` from the root. Returns the remaining
/// arguments in order; a trailing `-tag` without a value is dropped.
pub fn merge_command_line(config: &mut ConfigurationFile, args: Vec<String>) -> Vec<String> {
    let root = config.root();
    let mut remaining = Vec::with_capacity(args.len());
    let mut args = args.into_iter();
    if let Some(program) = args.next() {
        remaining.push(program);
    }

    while let Some(arg) = args.next() {
        if !arg.starts_with('-') {
            remaining.push(arg);
            continue;
        }
        let tag = &arg[1..];
        match args.next() {
            Some(value) => {
                debug!(tag, value = %value, "command-line override");
                config
                    .tree_mut()
                    .store_tag_value(root, &format!("/{tag}"), &value);
            }
            None => debug!(tag, "dropping command-line tag without value"),
        }
    }
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pairs_are_stored_and_removed() {
        let mut config = ConfigurationFile::new();
        let rest = merge_command_line(
            &mut config,
            args(&["prog", "input.txt", "-Video/width", "1024", "out.txt", "-verbose", "1"]),
        );
        assert_eq!(rest, args(&["prog", "input.txt", "out.txt"]));
        assert_eq!(config.retrieve_tag_value("/Video/width").unwrap(), "1024");
        assert_eq!(config.retrieve_tag_value("/verbose").unwrap(), "1");
    }

    #[test]
    fn test_trailing_tag_dropped() {
        let mut config = ConfigurationFile::new();
        let rest = merge_command_line(&mut config, args(&["prog", "file", "-lonely"]));
        assert_eq!(rest, args(&["prog", "file"]));
        assert!(config.tree().tag_values(config.root()).is_empty());
    }

    #[test]
    fn test_resolves_from_root_regardless_of_current_section() {
        let mut config = ConfigurationFile::new();
        config.store_tag_value("/A/x", "0");
        config.set_current_section("A").unwrap();
        merge_command_line(&mut config, args(&["prog", "-x", "5"]));
        assert_eq!(config.retrieve_tag_value("/x").unwrap(), "5");
        assert_eq!(config.retrieve_tag_value("/A/x").unwrap(), "0");
    }

    #[test]
    fn test_value_starting_with_dash_is_consumed() {
        let mut config = ConfigurationFile::new();
        let rest = merge_command_line(&mut config, args(&["prog", "-offset", "-5"]));
        assert_eq!(rest, args(&["prog"]));
        assert_eq!(config.retrieve_tag_value("/offset").unwrap(), "-5");
    }
}
