use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use confpatch::settings::{self, Settings};
use confpatch::{patch_file_with, patch_str, ConfigurationFile, PatchOutcome};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "confpatch")]
#[command(about = "Read, merge and patch hierarchical configuration files", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to $CONFPATCH_SETTINGS or ~/.config/confpatch/settings.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of a tag
    Get {
        file: PathBuf,

        /// Tag path, e.g. /Video/width
        tag_path: String,

        /// Value to print if the tag is missing
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Change a tag's value in place, keeping comments and layout
    Set {
        file: PathBuf,

        tag_path: String,

        value: String,

        /// Dry run - show the change without writing the file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// List the subsections and tags of a section
    List {
        file: PathBuf,

        /// Section path (defaults to the root section)
        section: Option<String>,
    },

    /// Print the parsed configuration in canonical form
    Dump {
        file: PathBuf,

        /// Emit the section tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge overlay files onto a base configuration
    Merge {
        base: PathBuf,

        #[arg(required = true)]
        overlays: Vec<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse configuration files and report syntax errors
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// File extension to look for when walking directories
        #[arg(long, default_value = "cfg")]
        ext: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = settings::discover(cli.settings.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Get {
            file,
            tag_path,
            default,
        } => cmd_get(&settings, &file, &tag_path, default.as_deref()),

        Commands::Set {
            file,
            tag_path,
            value,
            dry_run,
            diff,
        } => cmd_set(&settings, &file, &tag_path, &value, dry_run, diff),

        Commands::List { file, section } => cmd_list(&settings, &file, section.as_deref()),

        Commands::Dump { file, json } => cmd_dump(&settings, &file, json),

        Commands::Merge {
            base,
            overlays,
            output,
        } => cmd_merge(&settings, &base, &overlays, output.as_deref()),

        Commands::Check { paths, ext } => cmd_check(&settings, &paths, &ext),
    }
}

/// Helper: Load a configuration file with the parser settings applied.
fn load(settings: &Settings, file: &Path) -> Result<ConfigurationFile> {
    let mut config = ConfigurationFile::new()
        .with_options(settings.parse_options())
        .with_sync(settings.patch.sync);
    config
        .load(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    Ok(config)
}

/// Helper: Closest existing tag name in the section `tag_path` points into.
fn suggest_tag(config: &ConfigurationFile, tag_path: &str) -> Option<String> {
    let (dir, tag) = match tag_path.rsplit_once('/') {
        Some(("", tag)) => ("/", tag),
        Some((dir, tag)) => (dir, tag),
        None => (".", tag_path),
    };
    let section = config.section(dir).ok()?;

    config
        .tree()
        .tag_values(section)
        .iter()
        .map(|tv| (strsim::levenshtein(tag, &tv.tag), &tv.tag))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name.clone())
}

fn cmd_get(settings: &Settings, file: &Path, tag_path: &str, default: Option<&str>) -> Result<()> {
    let config = load(settings, file)?;

    match config.find_tag_value(tag_path) {
        Ok(Some(value)) => println!("{}", value),
        Ok(None) | Err(_) => match default {
            Some(default) => println!("{}", default),
            None => {
                eprintln!("{} tag {} not found", "Error:".red().bold(), tag_path);
                if let Some(name) = suggest_tag(&config, tag_path) {
                    eprintln!("  did you mean {}?", name.yellow());
                }
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn cmd_set(
    settings: &Settings,
    file: &Path,
    tag_path: &str,
    value: &str,
    dry_run: bool,
    diff: bool,
) -> Result<()> {
    if dry_run {
        let original = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let (patched, outcome) = patch_str(&original, tag_path, value)?;
        report_outcome(file, tag_path, &outcome, true)?;
        display_diff(file, &original, &patched);
        return Ok(());
    }

    let original = if diff {
        Some(
            fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?,
        )
    } else {
        None
    };

    let outcome = patch_file_with(file, tag_path, value, &settings.patch_options())?;
    report_outcome(file, tag_path, &outcome, false)?;

    if let Some(original) = original {
        let patched = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        display_diff(file, &original, &patched);
    }

    Ok(())
}

fn report_outcome(file: &Path, tag_path: &str, outcome: &PatchOutcome, dry_run: bool) -> Result<()> {
    match outcome {
        PatchOutcome::Replaced { lines } => {
            let lines: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
            let verb = if dry_run { "Would patch" } else { "Patched" };
            println!(
                "{} {} in {} (line {})",
                verb.green(),
                tag_path,
                file.display(),
                lines.join(", ")
            );
            Ok(())
        }
        PatchOutcome::NotFound => {
            anyhow::bail!("Tag {} not found in {}", tag_path, file.display())
        }
    }
}

fn cmd_list(settings: &Settings, file: &Path, section: Option<&str>) -> Result<()> {
    let mut config = load(settings, file)?;
    if let Some(section) = section {
        config.set_current_section(section)?;
    }

    for entry in config.list() {
        if entry.ends_with('/') {
            println!("{}", entry.cyan());
        } else {
            println!("{}", entry);
        }
    }

    Ok(())
}

fn cmd_dump(settings: &Settings, file: &Path, json: bool) -> Result<()> {
    let mut config = load(settings, file)?;

    if json {
        let snapshot = config.tree().snapshot(config.root());
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        config.write(&mut out)?;
        out.flush()?;
    }

    Ok(())
}

fn cmd_merge(
    settings: &Settings,
    base: &Path,
    overlays: &[PathBuf],
    output: Option<&Path>,
) -> Result<()> {
    let mut config = load(settings, base)?;

    for overlay in overlays {
        config
            .merge(overlay)
            .with_context(|| format!("Failed to merge {}", overlay.display()))?;
        debug!(overlay = %overlay.display(), "merged overlay");
    }

    match output {
        Some(path) => {
            config
                .save_as(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} {} overlay(s) into {}",
                "Merged".green(),
                overlays.len(),
                path.display()
            );
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            config.write(&mut out)?;
            out.flush()?;
        }
    }

    Ok(())
}

/// Helper: Expand the given paths into the configuration files to check.
fn collect_files(paths: &[PathBuf], ext: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file()
                    && entry.path().extension().and_then(|e| e.to_str()) == Some(ext)
                {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn cmd_check(settings: &Settings, paths: &[PathBuf], ext: &str) -> Result<()> {
    let files = collect_files(paths, ext);
    if files.is_empty() {
        anyhow::bail!("No .{} files found", ext);
    }

    let mut failed = 0;
    for file in &files {
        let mut config = ConfigurationFile::new().with_options(settings.parse_options());
        match config.load(file) {
            Ok(()) => println!("  {} {}", "ok".green(), file.display()),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "FAIL".red(), file.display(), e);
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} ok", format!("{}", files.len() - failed).green());
    println!("  {} failed", format!("{}", failed).red());

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
