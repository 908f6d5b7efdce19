//! File upload and download endpoints.
//!
//! Upload accepts a multipart form and returns a complete file descriptor;
//! the client embeds the descriptor in a subsequent note append. Download
//! streams a stored payload back by `(ref_id, file_no)` and only exists in
//! filesystem storage mode: jsonb-mode payloads travel inline with the
//! thread and have nothing server-side to fetch.

use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use base64::Engine;
use serde::Deserialize;
use tracing::info;

use refnote_core::{
    format_size, is_allowed_type, mime_type_for, next_file_no, EmbedType, NoteFile, StorageMode,
    UploadResponse,
};

use crate::{ApiError, AppState};

/// Query parameters for the download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub ref_id: String,
    pub file_no: String,
}

/// POST /api/v1/notes/files
///
/// Multipart fields: `file` (required), `ref_id` (required), `embed_type`
/// (optional, defaults to attachment). Validates the extension allow-list
/// and the size ceiling, then either inlines the payload as base64 (jsonb
/// mode) or writes it under the storage root (filesystem mode).
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = state
        .auth
        .authenticate(&headers)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not authenticated".to_string()))?;

    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut ref_id: Option<String> = None;
    let mut embed_type = EmbedType::Attachment;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("file") => {
                filename = field.file_name().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            Some("ref_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read ref_id: {}", e)))?;
                ref_id = Some(value);
            }
            Some("embed_type") => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read embed_type: {}", e))
                })?;
                embed_type = EmbedType::from_field(&value);
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    let filename =
        filename.ok_or_else(|| ApiError::BadRequest("File has no filename".to_string()))?;
    let ref_id = ref_id
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("ref_id is required".to_string()))?;

    let limits = &state.config.files;
    if !is_allowed_type(&filename, &limits.allowed_file_types) {
        return Err(ApiError::BadRequest(format!(
            "File type not allowed. Allowed types: {}",
            limits.allowed_file_types.join(", ")
        )));
    }
    if data.len() as u64 > limits.max_file_size_bytes() {
        return Err(ApiError::BadRequest(format!(
            "File exceeds maximum size of {}",
            format_size(limits.max_file_size_bytes())
        )));
    }

    // Numbering restarts per note; the client renumbers when it assembles
    // the note's attachment list.
    let file_no = next_file_no(&[]);
    let mime_type = mime_type_for(&filename);
    let file_size = data.len() as i64;

    let filedata = match state.config.storage.mode {
        StorageMode::Jsonb => base64::engine::general_purpose::STANDARD.encode(&data),
        StorageMode::Filesystem => {
            state
                .files
                .store(&ref_id, &file_no, &filename, &data)
                .await?
        }
    };

    info!(
        ref_id = %ref_id,
        author_id = %author_id,
        file_no = %file_no,
        filename = %filename,
        size = file_size,
        "file uploaded"
    );

    Ok(Json(UploadResponse {
        success: true,
        file: NoteFile {
            file_no,
            embed_type,
            filename,
            filedata,
            mime_type: Some(mime_type.to_string()),
            file_size: Some(file_size),
        },
    }))
}

/// GET /api/v1/notes/files?ref_id=...&file_no=...
///
/// Streams a stored file payload with its original filename. Only available
/// in filesystem storage mode.
pub async fn download_file(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<impl IntoResponse, ApiError> {
    if state.config.storage.mode != StorageMode::Filesystem {
        return Err(ApiError::BadRequest(
            "File download is only available in filesystem storage mode".to_string(),
        ));
    }

    let file = state
        .db
        .notes
        .find_file(&params.ref_id, &params.file_no)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "File {} not found for ref {}",
                params.file_no, params.ref_id
            ))
        })?;

    let data = state.files.read(&file.filedata).await?;

    let content_type = file
        .mime_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let disposition = format!("attachment; filename=\"{}\"", file.filename);

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}
