//! Runtime configuration for notes storage and file ceilings.
//!
//! Configuration is an explicitly constructed value: the api binary builds a
//! [`NotesConfig`] once (from the environment) and passes it into application
//! state. There is no lazily-initialized global.

use std::path::PathBuf;

use tracing::warn;

use crate::models::StorageMode;

/// Default maximum file size in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// Default extension allow-list for uploads.
pub const DEFAULT_ALLOWED_FILE_TYPES: &[&str] =
    &["pdf", "png", "jpg", "jpeg", "gif", "doc", "docx"];

/// Default maximum number of files per note entry.
pub const DEFAULT_MAX_FILES_PER_NOTE: usize = 5;

/// Maximum note text length in characters.
pub const DEFAULT_MAX_NOTE_TEXT_LEN: usize = 10_000;

/// Default root directory for filesystem-mode payloads.
pub const DEFAULT_STORAGE_ROOT: &str = "uploads/notes";

/// Where and how file payloads are stored.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Payload storage mode: base64 in the record, or files on disk.
    pub mode: StorageMode,
    /// Root directory for filesystem mode. Paths stored in records begin
    /// with this root; nothing may resolve outside it.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Jsonb,
            root: PathBuf::from(DEFAULT_STORAGE_ROOT),
        }
    }
}

/// Ceilings applied to note and upload validation.
#[derive(Debug, Clone)]
pub struct FileLimits {
    /// Maximum file size in megabytes.
    pub max_file_size_mb: u64,
    /// Allowed upload extensions.
    pub allowed_file_types: Vec<String>,
    /// Maximum files per single note entry.
    pub max_files_per_note: usize,
    /// Maximum note text length in characters.
    pub max_note_text_len: usize,
}

impl FileLimits {
    /// The file size ceiling in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Default for FileLimits {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            allowed_file_types: DEFAULT_ALLOWED_FILE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_files_per_note: DEFAULT_MAX_FILES_PER_NOTE,
            max_note_text_len: DEFAULT_MAX_NOTE_TEXT_LEN,
        }
    }
}

/// Complete notes configuration.
#[derive(Debug, Clone, Default)]
pub struct NotesConfig {
    pub storage: StorageConfig,
    pub files: FileLimits,
}

impl NotesConfig {
    /// Build configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `REFNOTE_STORAGE_MODE` — "jsonb" (default) or "filesystem"
    /// - `REFNOTE_STORAGE_ROOT` — root directory for filesystem mode
    /// - `REFNOTE_MAX_FILE_SIZE_MB`
    /// - `REFNOTE_ALLOWED_FILE_TYPES` — comma-separated extensions
    /// - `REFNOTE_MAX_FILES_PER_NOTE`
    ///
    /// Invalid values fall back to defaults with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(mode) = std::env::var("REFNOTE_STORAGE_MODE") {
            match StorageMode::parse(&mode) {
                Some(parsed) => config.storage.mode = parsed,
                None => warn!(
                    value = %mode,
                    "Unrecognized REFNOTE_STORAGE_MODE, using jsonb"
                ),
            }
        }
        if let Ok(root) = std::env::var("REFNOTE_STORAGE_ROOT") {
            if !root.trim().is_empty() {
                config.storage.root = PathBuf::from(root);
            }
        }
        if let Ok(raw) = std::env::var("REFNOTE_MAX_FILE_SIZE_MB") {
            match raw.parse::<u64>() {
                Ok(mb) if mb > 0 => config.files.max_file_size_mb = mb,
                _ => warn!(
                    value = %raw,
                    "Invalid REFNOTE_MAX_FILE_SIZE_MB, using {}",
                    DEFAULT_MAX_FILE_SIZE_MB
                ),
            }
        }
        if let Ok(raw) = std::env::var("REFNOTE_ALLOWED_FILE_TYPES") {
            let types = parse_type_list(&raw);
            if types.is_empty() {
                warn!(value = %raw, "Empty REFNOTE_ALLOWED_FILE_TYPES, using defaults");
            } else {
                config.files.allowed_file_types = types;
            }
        }
        if let Ok(raw) = std::env::var("REFNOTE_MAX_FILES_PER_NOTE") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.files.max_files_per_note = n,
                _ => warn!(
                    value = %raw,
                    "Invalid REFNOTE_MAX_FILES_PER_NOTE, using {}",
                    DEFAULT_MAX_FILES_PER_NOTE
                ),
            }
        }

        config
    }
}

/// Parse a comma-separated extension list, trimming whitespace and dropping
/// empty entries.
pub fn parse_type_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NotesConfig::default();
        assert_eq!(config.storage.mode, StorageMode::Jsonb);
        assert_eq!(config.storage.root, PathBuf::from("uploads/notes"));
        assert_eq!(config.files.max_file_size_mb, 10);
        assert_eq!(config.files.max_files_per_note, 5);
        assert_eq!(config.files.max_note_text_len, 10_000);
        assert!(config.files.allowed_file_types.contains(&"pdf".to_string()));
    }

    #[test]
    fn test_max_file_size_bytes() {
        let limits = FileLimits::default();
        assert_eq!(limits.max_file_size_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_parse_type_list() {
        assert_eq!(
            parse_type_list("pdf, PNG ,jpg,,"),
            vec!["pdf".to_string(), "png".to_string(), "jpg".to_string()]
        );
        assert!(parse_type_list("  ,").is_empty());
    }
}
