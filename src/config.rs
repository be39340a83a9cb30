//! Run configuration for dirsweep.
//!
//! The configuration file holds the rules every pass shares: the permission
//! mode files should carry, which characters are unsafe in filenames and what
//! replaces them, which suffixes mark a temporary file, and optional glob
//! patterns for files the scanner should never touch.
//!
//! # Configuration File Format
//!
//! JSON is the default format:
//!
//! ```json
//! {
//!     "file_attributes": "rw-r--r--",
//!     "troublesome_characters": ":\".;*?$#`|\\",
//!     "character_substitute": "_",
//!     "temporary_file_extensions": "*~, *.tmp",
//!     "exclude_patterns": []
//! }
//! ```
//!
//! A path ending in `.toml` is read and written as TOML with the same keys.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read or written.
    #[error("IO error on configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON/TOML or has the wrong shape.
    #[error("Invalid configuration in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
    /// `file_attributes` is not a 9-character rwx string.
    #[error("Invalid permission string '{0}': expected 9 characters from r, w, x, -")]
    InvalidPermissions(String),
    /// `character_substitute` is not exactly one character.
    #[error("Invalid character substitute '{0}': expected exactly one character")]
    InvalidSubstitute(String),
    /// An exclude pattern failed to compile.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },
}

/// Configuration as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Target permissions as an `ls`-style string, e.g. `rw-r--r--`.
    #[serde(default = "default_file_attributes")]
    pub file_attributes: String,

    /// Every character in this string is considered unsafe in a filename.
    #[serde(default = "default_troublesome_characters")]
    pub troublesome_characters: String,

    /// Replacement for each troublesome character.
    #[serde(default = "default_character_substitute")]
    pub character_substitute: String,

    /// Comma-separated suffix patterns, each optionally prefixed with `*`.
    #[serde(default = "default_temporary_file_extensions")]
    pub temporary_file_extensions: String,

    /// Glob patterns (matched against file name and full path) to leave alone.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_file_attributes() -> String {
    "rw-r--r--".to_string()
}

fn default_troublesome_characters() -> String {
    ":\".;*?$#`|\\".to_string()
}

fn default_character_substitute() -> String {
    "_".to_string()
}

fn default_temporary_file_extensions() -> String {
    "*~, *.tmp".to_string()
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            file_attributes: default_file_attributes(),
            troublesome_characters: default_troublesome_characters(),
            character_substitute: default_character_substitute(),
            temporary_file_extensions: default_temporary_file_extensions(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl SweepConfig {
    /// Loads the configuration at `path`, creating a default file if none exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file exists but cannot be read, or the
    /// default file cannot be written. Returns `ConfigError::Invalid` if the
    /// file does not parse.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            crate::output::OutputFormatter::warning(&format!(
                "Configuration file {} doesn't exist. Creating default configuration file...",
                path.display()
            ));
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = if is_toml(path) {
            toml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Writes this configuration to `path` in the format implied by its extension.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = if is_toml(path) {
            toml::to_string_pretty(self).map_err(|e| e.to_string())
        } else {
            serde_json::to_string_pretty(self).map_err(|e| e.to_string())
        };
        let serialized = serialized.map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;

        fs::write(path, serialized).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validates the raw configuration into the settings the engine runs with.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let mode = parse_permission_string(&self.file_attributes)?;

        let mut substitute_chars = self.character_substitute.chars();
        let substitute = match (substitute_chars.next(), substitute_chars.next()) {
            (Some(c), None) => c,
            _ => return Err(ConfigError::InvalidSubstitute(self.character_substitute)),
        };

        let exclude = self
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Settings {
            mode,
            troublesome: self.troublesome_characters.chars().collect(),
            substitute,
            temporary_suffixes: parse_temporary_suffixes(&self.temporary_file_extensions),
            exclude,
        })
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// Validated configuration, immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Target permission bits (owner/group/other rwx only).
    pub mode: u32,
    /// Characters replaced by the renamer.
    pub troublesome: Vec<char>,
    /// Replacement character.
    pub substitute: char,
    /// Suffixes marking a temporary file, with any leading `*` removed.
    pub temporary_suffixes: Vec<String>,
    /// Files matching any of these are skipped by every pass.
    pub exclude: Vec<Pattern>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: 0o644,
            troublesome: default_troublesome_characters().chars().collect(),
            substitute: '_',
            temporary_suffixes: parse_temporary_suffixes(&default_temporary_file_extensions()),
            exclude: Vec::new(),
        }
    }
}

/// Converts an `ls`-style permission string into numeric mode bits.
///
/// Each of the three groups sums 4 for `r`, 2 for `w` and 1 for `x`, and the
/// three sums are read as octal digits.
///
/// # Examples
///
/// ```
/// use dirsweep::config::parse_permission_string;
///
/// assert_eq!(parse_permission_string("rw-r--r--").unwrap(), 0o644);
/// assert_eq!(parse_permission_string("rwxr-x---").unwrap(), 0o750);
/// ```
pub fn parse_permission_string(attributes: &str) -> Result<u32, ConfigError> {
    let chars: Vec<char> = attributes.chars().collect();
    if chars.len() != 9 {
        return Err(ConfigError::InvalidPermissions(attributes.to_string()));
    }

    chars.chunks(3).try_fold(0u32, |mode, group| {
        let digit = group.iter().try_fold(0u32, |sum, c| match c {
            'r' => Ok(sum + 4),
            'w' => Ok(sum + 2),
            'x' => Ok(sum + 1),
            '-' => Ok(sum),
            _ => Err(ConfigError::InvalidPermissions(attributes.to_string())),
        })?;
        Ok(mode * 8 + digit)
    })
}

/// Splits the comma-separated suffix list, trimming whitespace and the
/// leading wildcard marker. Entries that end up empty are dropped, since an
/// empty suffix would match every file.
pub fn parse_temporary_suffixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim().trim_start_matches('*').to_string())
        .filter(|suffix| !suffix.is_empty())
        .collect()
}
