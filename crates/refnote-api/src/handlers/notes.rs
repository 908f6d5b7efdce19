//! Notes thread endpoints: fetch a thread and append to it.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use tracing::info;

use refnote_core::{AddNoteResponse, NewNote, NotesResponse};

use crate::handlers::enrich_note;
use crate::{ApiError, AppState};

/// GET /api/v1/notes/:ref_id
///
/// Returns the thread for `ref_id` with author-enriched entries. A ref_id
/// with no thread yet is not an error: it returns an empty list with
/// `note_count: 0`.
pub async fn get_notes(
    State(state): State<AppState>,
    Path(ref_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.db.notes.fetch(&ref_id).await?;

    let (entries, note_count) = match record {
        Some(record) => (record.notes, record.note_count),
        None => (Vec::new(), 0),
    };

    let mut notes = Vec::with_capacity(entries.len());
    for entry in entries {
        notes.push(enrich_note(entry, &state.profiles).await);
    }

    Ok(Json(NotesResponse {
        success: true,
        notes,
        note_count,
    }))
}

/// POST /api/v1/notes/:ref_id
///
/// Appends a note to the thread, creating the thread on first write.
/// Requires an authenticated caller; the author ID comes from the
/// authenticator, never from the request body.
pub async fn add_note(
    State(state): State<AppState>,
    Path(ref_id): Path<String>,
    headers: HeaderMap,
    Json(new_note): Json<NewNote>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = state
        .auth
        .authenticate(&headers)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not authenticated".to_string()))?;

    let (entry, note_count) = state
        .db
        .notes
        .add_note(&ref_id, &author_id, new_note, &state.config.files)
        .await?;

    info!(ref_id = %ref_id, author_id = %author_id, note_count, "note appended");

    let note = enrich_note(entry, &state.profiles).await;
    Ok(Json(AddNoteResponse {
        success: true,
        note,
        note_count,
    }))
}
