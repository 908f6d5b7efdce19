//! Notes thread repository: append-or-create upsert over one JSONB row
//! per ref_id.
//!
//! Appends are guarded by a row version: the UPDATE is conditional on the
//! version observed at read time, so a concurrent writer to the same ref_id
//! surfaces as [`Error::Conflict`] instead of silently losing notes or
//! corrupting `note_count`. Callers treat the conflict as retryable.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use refnote_core::{
    validate_new_note, Error, FileLimits, NewNote, NoteEntry, NoteFile, NotesRecord, Result,
};

/// PostgreSQL implementation of the notes store.
#[derive(Clone)]
pub struct PgNotesRepository {
    pool: Pool<Postgres>,
}

/// The write an append resolves to, decided from the current row state.
///
/// Kept as a pure value so the create-vs-append policy is testable without
/// a database.
#[derive(Debug)]
pub enum UpsertPlan {
    /// No row for this ref_id yet: insert one with a single-element list.
    Create { record: NotesRecord },
    /// Row exists: rewrite the notes array conditional on `seen_version`.
    Append {
        id: Uuid,
        seen_version: i64,
        notes: Vec<NoteEntry>,
        note_count: i32,
    },
}

/// Decide how to apply a new entry to the current (possibly absent) record.
///
/// On append, `note_count` is recomputed as the rewritten array length,
/// keeping the `note_count == notes.len()` invariant regardless of what the
/// stored count said.
pub fn plan_append(existing: Option<NotesRecord>, ref_id: &str, entry: NoteEntry) -> UpsertPlan {
    match existing {
        None => {
            let now = Utc::now();
            UpsertPlan::Create {
                record: NotesRecord {
                    id: Uuid::new_v4(),
                    ref_id: ref_id.to_string(),
                    notes: vec![entry],
                    note_count: 1,
                    version: 1,
                    created_at: now,
                    changed_at: None,
                },
            }
        }
        Some(record) => {
            let mut notes = record.notes;
            notes.push(entry);
            let note_count = notes.len() as i32;
            UpsertPlan::Append {
                id: record.id,
                seen_version: record.version,
                notes,
                note_count,
            }
        }
    }
}

/// Scan a notes array in order for the first file with the given file_no.
pub(crate) fn find_file_in(notes: &[NoteEntry], file_no: &str) -> Option<NoteFile> {
    notes
        .iter()
        .filter_map(|n| n.note_files.as_deref())
        .flatten()
        .find(|f| f.file_no == file_no)
        .cloned()
}

impl PgNotesRepository {
    /// Create a new PgNotesRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fetch the notes thread for a ref_id. Zero or one row expected.
    pub async fn fetch(&self, ref_id: &str) -> Result<Option<NotesRecord>> {
        sqlx::query(
            r#"SELECT id, ref_id, notes, note_count, version, created_at, changed_at
               FROM ref_note WHERE ref_id = $1"#,
        )
        .bind(ref_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| record_from_row(&row))
        .transpose()
    }

    /// Append a note to the thread for `ref_id`, creating the thread on
    /// first write.
    ///
    /// Validates the input against `limits`, trims the note text, and
    /// stamps `created_at` server-side. Returns the stored entry and the
    /// thread's note count after the write.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` when the text or file list exceeds a ceiling.
    /// - `Error::Conflict` when a concurrent writer advanced the row (or
    ///   created it first); the caller should re-read and retry.
    pub async fn add_note(
        &self,
        ref_id: &str,
        author_id: &str,
        new_note: NewNote,
        limits: &FileLimits,
    ) -> Result<(NoteEntry, i32)> {
        validate_new_note(&new_note.note_text, new_note.note_files.as_deref(), limits)?;

        let entry = NoteEntry {
            author_id: author_id.to_string(),
            created_at: Utc::now(),
            note_text: new_note.note_text.trim().to_string(),
            note_files: new_note.note_files,
        };

        let existing = self.fetch(ref_id).await?;
        match plan_append(existing, ref_id, entry.clone()) {
            UpsertPlan::Create { record } => {
                let notes_json = serde_json::to_value(&record.notes)?;
                let result = sqlx::query(
                    r#"INSERT INTO ref_note (id, ref_id, notes, note_count, version, created_at)
                       VALUES ($1, $2, $3, 1, 1, $4)
                       ON CONFLICT (ref_id) DO NOTHING"#,
                )
                .bind(record.id)
                .bind(&record.ref_id)
                .bind(&notes_json)
                .bind(record.created_at)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    // Another writer created the thread between our read and
                    // this insert.
                    return Err(Error::Conflict(format!(
                        "notes for ref_id {} were created concurrently",
                        ref_id
                    )));
                }

                debug!(ref_id = %ref_id, note_count = 1, "notes: created thread");
                Ok((entry, 1))
            }
            UpsertPlan::Append {
                id,
                seen_version,
                notes,
                note_count,
            } => {
                let notes_json = serde_json::to_value(&notes)?;
                let result = sqlx::query(
                    r#"UPDATE ref_note
                       SET notes = $1, note_count = $2, changed_at = NOW(),
                           version = version + 1
                       WHERE id = $3 AND version = $4"#,
                )
                .bind(&notes_json)
                .bind(note_count)
                .bind(id)
                .bind(seen_version)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(Error::Conflict(format!(
                        "notes for ref_id {} changed concurrently",
                        ref_id
                    )));
                }

                debug!(ref_id = %ref_id, note_count, "notes: appended entry");
                Ok((entry, note_count))
            }
        }
    }

    /// Find a file descriptor by file_no within a thread's notes, scanning
    /// entries in insertion order. Used by the download path.
    pub async fn find_file(&self, ref_id: &str, file_no: &str) -> Result<Option<NoteFile>> {
        let record = self.fetch(ref_id).await?;
        Ok(record.and_then(|r| find_file_in(&r.notes, file_no)))
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<NotesRecord> {
    let notes_json: serde_json::Value = row.get("notes");
    let notes: Vec<NoteEntry> = serde_json::from_value(notes_json)?;
    Ok(NotesRecord {
        id: row.get("id"),
        ref_id: row.get("ref_id"),
        notes,
        note_count: row.get("note_count"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        changed_at: row.get("changed_at"),
    })
}
