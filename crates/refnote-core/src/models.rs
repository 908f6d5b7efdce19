//! Data model for notes threads and their file attachments.
//!
//! A notes thread is one row per `ref_id` (the external entity the thread is
//! attached to) holding an append-only JSONB array of note entries. Entries
//! and their file descriptors are immutable once written; there is no edit or
//! delete path in the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FileLimits;
use crate::error::{Error, Result};

/// How a file reference is displayed: inline (images) or as a download link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedType {
    /// Rendered inline in the note body.
    Embed,
    /// Rendered as a downloadable attachment link.
    Attachment,
}

impl EmbedType {
    /// Parse from a form field value. Anything other than `"embed"` is
    /// treated as an attachment, matching the upload form's default.
    pub fn from_field(value: &str) -> Self {
        match value {
            "embed" => EmbedType::Embed,
            _ => EmbedType::Attachment,
        }
    }
}

impl std::fmt::Display for EmbedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbedType::Embed => write!(f, "embed"),
            EmbedType::Attachment => write!(f, "attachment"),
        }
    }
}

/// File attachment stored with a note entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteFile {
    /// Reference ID used in note_text markers (e.g. "0001"). Zero-padded,
    /// unique within the owning note's attachment list.
    pub file_no: String,
    /// How to display the file.
    pub embed_type: EmbedType,
    /// Original filename as uploaded.
    pub filename: String,
    /// Base64 payload (jsonb storage mode) or a disk path beginning with
    /// the storage root (filesystem storage mode). Disjoint by mode,
    /// never both.
    pub filedata: String,
    /// MIME type for rendering, derived from the filename extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}

/// A single note entry as persisted in the notes array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    /// ID of the user who created the note.
    pub author_id: String,
    /// Creation timestamp, immutable once written.
    pub created_at: DateTime<Utc>,
    /// Note content, may contain `<<embed:NNNN>>` / `<<attach:NNNN>>` markers.
    pub note_text: String,
    /// Files attached to this entry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_files: Option<Vec<NoteFile>>,
}

/// A note entry enriched with author profile data for display.
///
/// The profile fields are populated from the [`ProfileLookup`] collaborator
/// at read time and are never persisted.
///
/// [`ProfileLookup`]: crate::traits::ProfileLookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayNote {
    #[serde(flatten)]
    pub entry: NoteEntry,
    /// Author's display name ("Unknown User" when the lookup fails).
    pub author_name: String,
    /// Author's email address (empty when the lookup fails).
    pub author_email: String,
    /// Author's avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
}

/// One notes thread: the persisted row for a `ref_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesRecord {
    /// Row primary key.
    pub id: Uuid,
    /// External entity this thread is attached to. At most one row per ref_id.
    pub ref_id: String,
    /// Append-only list of note entries, in insertion order.
    pub notes: Vec<NoteEntry>,
    /// Denormalized length of `notes`; must equal `notes.len()` after every write.
    pub note_count: i32,
    /// Row version for the conditional-write append; advances on every write.
    pub version: i64,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last append timestamp.
    pub changed_at: Option<DateTime<Utc>>,
}

/// Input for creating a new note (POST body).
#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    /// Note text content.
    pub note_text: String,
    /// Optional file attachments, assembled by the upload endpoint.
    pub note_files: Option<Vec<NoteFile>>,
}

/// Author profile returned by the profile lookup collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Response body for fetching a notes thread.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotesResponse {
    pub success: bool,
    pub notes: Vec<DisplayNote>,
    pub note_count: i32,
}

/// Response body for appending a note.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddNoteResponse {
    pub success: bool,
    pub note: DisplayNote,
    pub note_count: i32,
}

/// Response body for a file upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file: NoteFile,
}

/// Where file payloads live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Payload inlined as base64 in the persisted record.
    Jsonb,
    /// Payload on disk; the record holds a path under the storage root.
    Filesystem,
}

impl StorageMode {
    /// Parse a config value, defaulting to jsonb for anything unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "jsonb" => Some(StorageMode::Jsonb),
            "filesystem" => Some(StorageMode::Filesystem),
            _ => None,
        }
    }
}

/// Validate a new note against the configured ceilings.
///
/// Checks `1 <= note_text length <= max_note_text_len` (in characters) and
/// `note_files length <= max_files_per_note`. The text is validated as
/// given; trimming happens at store time.
pub fn validate_new_note(
    note_text: &str,
    note_files: Option<&[NoteFile]>,
    limits: &FileLimits,
) -> Result<()> {
    if note_text.is_empty() {
        return Err(Error::InvalidInput("note_text is required".to_string()));
    }
    let len = note_text.chars().count();
    if len > limits.max_note_text_len {
        return Err(Error::InvalidInput(format!(
            "note_text exceeds maximum length of {} characters",
            limits.max_note_text_len
        )));
    }
    if let Some(files) = note_files {
        if files.len() > limits.max_files_per_note {
            return Err(Error::InvalidInput(format!(
                "Maximum {} files per note allowed",
                limits.max_files_per_note
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(no: &str) -> NoteFile {
        NoteFile {
            file_no: no.to_string(),
            embed_type: EmbedType::Attachment,
            filename: "doc.pdf".to_string(),
            filedata: "cGRm".to_string(),
            mime_type: Some("application/pdf".to_string()),
            file_size: Some(3),
        }
    }

    #[test]
    fn test_embed_type_serde_lowercase() {
        assert_eq!(serde_json::to_string(&EmbedType::Embed).unwrap(), "\"embed\"");
        assert_eq!(
            serde_json::to_string(&EmbedType::Attachment).unwrap(),
            "\"attachment\""
        );
        let parsed: EmbedType = serde_json::from_str("\"embed\"").unwrap();
        assert_eq!(parsed, EmbedType::Embed);
    }

    #[test]
    fn test_embed_type_from_field_defaults_to_attachment() {
        assert_eq!(EmbedType::from_field("embed"), EmbedType::Embed);
        assert_eq!(EmbedType::from_field("attachment"), EmbedType::Attachment);
        assert_eq!(EmbedType::from_field("bogus"), EmbedType::Attachment);
        assert_eq!(EmbedType::from_field(""), EmbedType::Attachment);
    }

    #[test]
    fn test_note_file_omits_optional_fields() {
        let mut f = file("0001");
        f.mime_type = None;
        f.file_size = None;
        let json = serde_json::to_string(&f).unwrap();
        assert!(!json.contains("mime_type"));
        assert!(!json.contains("file_size"));
    }

    #[test]
    fn test_display_note_flattens_entry_fields() {
        let note = DisplayNote {
            entry: NoteEntry {
                author_id: "u1".to_string(),
                created_at: Utc::now(),
                note_text: "hello".to_string(),
                note_files: None,
            },
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            author_avatar: None,
        };
        let json = serde_json::to_value(&note).unwrap();
        // Entry fields sit at the top level alongside the profile fields
        assert_eq!(json["note_text"], "hello");
        assert_eq!(json["author_id"], "u1");
        assert_eq!(json["author_name"], "Ada");
        assert!(json.get("author_avatar").is_none());
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        let limits = FileLimits::default();
        assert!(validate_new_note("", None, &limits).is_err());
    }

    #[test]
    fn test_validate_text_length_boundary() {
        let limits = FileLimits::default();
        let at_limit = "a".repeat(10_000);
        assert!(validate_new_note(&at_limit, None, &limits).is_ok());

        let over_limit = "a".repeat(10_001);
        let err = validate_new_note(&over_limit, None, &limits).unwrap_err();
        assert!(err.to_string().contains("maximum length"));
    }

    #[test]
    fn test_validate_file_count_boundary() {
        let limits = FileLimits::default();
        let five: Vec<NoteFile> = (1..=5).map(|i| file(&format!("{:04}", i))).collect();
        assert!(validate_new_note("ok", Some(&five), &limits).is_ok());

        let six: Vec<NoteFile> = (1..=6).map(|i| file(&format!("{:04}", i))).collect();
        let err = validate_new_note("ok", Some(&six), &limits).unwrap_err();
        assert!(err.to_string().contains("5 files"));
    }

    #[test]
    fn test_validate_counts_characters_not_bytes() {
        let limits = FileLimits::default();
        // 10,000 multibyte characters is within the ceiling even though the
        // byte length is larger.
        let text = "é".repeat(10_000);
        assert!(validate_new_note(&text, None, &limits).is_ok());
    }

    #[test]
    fn test_storage_mode_parse() {
        assert_eq!(StorageMode::parse("jsonb"), Some(StorageMode::Jsonb));
        assert_eq!(StorageMode::parse("filesystem"), Some(StorageMode::Filesystem));
        assert_eq!(StorageMode::parse("s3"), None);
    }

    #[test]
    fn test_note_entry_round_trips_through_json() {
        let entry = NoteEntry {
            author_id: "u1".to_string(),
            created_at: "2026-01-15T10:30:00Z".parse().unwrap(),
            note_text: "see <<attach:0001>>".to_string(),
            note_files: Some(vec![file("0001")]),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: NoteEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
