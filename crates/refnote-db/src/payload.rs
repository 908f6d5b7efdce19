//! File payload resolution and the filesystem store.
//!
//! A [`NoteFile`]'s `filedata` field is either a base64 payload (jsonb
//! storage mode) or a path string beginning with the configured storage
//! root (filesystem mode). This module resolves a descriptor to its
//! payload and implements the disk side: atomic writes under
//! `{root}/{ref_id}/` and reads that refuse to leave the root.

use std::path::{Component, Path, PathBuf};

use base64::Engine;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use refnote_core::{sanitize_filename, Error, NoteFile, Result, StorageMode};

/// A resolved file payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePayload {
    /// Decoded file content, materialized fully in memory (jsonb mode).
    Bytes(Vec<u8>),
    /// Absolute location on disk under the storage root (filesystem mode).
    DiskPath(PathBuf),
}

/// Resolve a file descriptor to its payload for the given storage mode.
///
/// In jsonb mode the payload is the base64-decoded content; invalid base64
/// is an input error. In filesystem mode the stored path carries the root
/// prefix; the prefix is validated and the remainder is checked component
/// by component, so any path that would resolve outside the root is
/// rejected, not truncated.
pub fn resolve_file_payload(
    file: &NoteFile,
    mode: StorageMode,
    root: &Path,
) -> Result<FilePayload> {
    match mode {
        StorageMode::Jsonb => {
            let data = base64::engine::general_purpose::STANDARD
                .decode(&file.filedata)
                .map_err(|e| {
                    Error::InvalidInput(format!("filedata is not valid base64: {}", e))
                })?;
            Ok(FilePayload::Bytes(data))
        }
        StorageMode::Filesystem => {
            let path = resolve_stored_path(root, &file.filedata)?;
            Ok(FilePayload::DiskPath(path))
        }
    }
}

/// Resolve a stored path string against the root, rejecting escapes.
///
/// Stored paths begin with the root (the persisted form); the prefix is
/// stripped and the remainder validated. A bare relative path is accepted
/// the same way. Absolute paths outside the root and any `..`/root
/// components are refused outright rather than normalized away.
fn resolve_stored_path(root: &Path, stored: &str) -> Result<PathBuf> {
    let stored_path = Path::new(stored);
    let rel_path = match stored_path.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) if stored_path.is_absolute() => {
            return Err(Error::InvalidInput(format!(
                "file path {:?} is outside the storage root",
                stored
            )))
        }
        Err(_) => stored_path,
    };
    for component in rel_path.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(Error::InvalidInput(format!(
                    "file path {:?} escapes the storage root",
                    stored
                )))
            }
        }
    }
    Ok(root.join(rel_path))
}

/// Disk storage for filesystem-mode payloads.
///
/// Files live at `{root}/{ref_id}/{file_no}_{sanitized filename}`; records
/// hold that full root-prefixed path. Writes are atomic (temp file +
/// rename).
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an uploaded file and return the root-prefixed path to persist
    /// in the file descriptor.
    ///
    /// The enclosing directory is created if absent. Both `ref_id` and the
    /// filename are sanitized before they touch the path.
    pub async fn store(
        &self,
        ref_id: &str,
        file_no: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<String> {
        let safe_dir = sanitize_filename(ref_id);
        let safe_name = format!("{}_{}", file_no, sanitize_filename(filename));
        let rel = format!("{}/{}", safe_dir, safe_name);
        let full_path = resolve_stored_path(&self.root, &rel)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "storage: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "storage: File::create failed");
            e
        })?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &full_path).await?;

        // Set permissions to 0644 (rw-r--r--, no execute)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        let stored = full_path.display().to_string();
        debug!(path = %stored, size = data.len(), "storage: wrote file");
        Ok(stored)
    }

    /// Read a stored file by its persisted path.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` when the path escapes the root.
    /// - `Error::NotFound` when the file does not exist on disk.
    pub async fn read(&self, stored: &str) -> Result<Vec<u8>> {
        let full_path = resolve_stored_path(&self.root, stored)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("file {} not found", stored)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate that the store can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (permission errors, missing mounts) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.root.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refnote_core::EmbedType;

    fn jsonb_file(data: &str) -> NoteFile {
        NoteFile {
            file_no: "0001".to_string(),
            embed_type: EmbedType::Attachment,
            filename: "doc.pdf".to_string(),
            filedata: data.to_string(),
            mime_type: Some("application/pdf".to_string()),
            file_size: None,
        }
    }

    fn fs_file(path: &str) -> NoteFile {
        NoteFile {
            file_no: "0001".to_string(),
            embed_type: EmbedType::Attachment,
            filename: "doc.pdf".to_string(),
            filedata: path.to_string(),
            mime_type: None,
            file_size: None,
        }
    }

    #[test]
    fn test_resolve_jsonb_decodes_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let file = jsonb_file(&encoded);
        let payload =
            resolve_file_payload(&file, StorageMode::Jsonb, Path::new("/unused")).unwrap();
        assert_eq!(payload, FilePayload::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn test_resolve_jsonb_rejects_invalid_base64() {
        let file = jsonb_file("not!!base64%%");
        let err =
            resolve_file_payload(&file, StorageMode::Jsonb, Path::new("/unused")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_resolve_filesystem_accepts_root_prefixed_path() {
        // The persisted form: the root prefix followed by {ref_id}/{name}
        let file = fs_file("/srv/notes/field-1/0001_doc.pdf");
        let payload =
            resolve_file_payload(&file, StorageMode::Filesystem, Path::new("/srv/notes")).unwrap();
        assert_eq!(
            payload,
            FilePayload::DiskPath(PathBuf::from("/srv/notes/field-1/0001_doc.pdf"))
        );
    }

    #[test]
    fn test_resolve_filesystem_accepts_bare_relative_path() {
        let file = fs_file("field-1/0001_doc.pdf");
        let payload =
            resolve_file_payload(&file, StorageMode::Filesystem, Path::new("/srv/notes")).unwrap();
        assert_eq!(
            payload,
            FilePayload::DiskPath(PathBuf::from("/srv/notes/field-1/0001_doc.pdf"))
        );
    }

    #[test]
    fn test_resolve_filesystem_rejects_escape() {
        for bad in [
            "../secrets.txt",
            "a/../../b",
            "/etc/passwd",
            "/srv/../etc/passwd",
            "/srv/a/../../b",
        ] {
            let file = fs_file(bad);
            let err = resolve_file_payload(&file, StorageMode::Filesystem, Path::new("/srv"))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted {:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_store_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());

        let stored = store
            .store("field-1", "0001", "report.pdf", b"pdf bytes")
            .await
            .unwrap();
        assert_eq!(
            stored,
            dir.path().join("field-1/0001_report.pdf").display().to_string()
        );

        let data = store.read(&stored).await.unwrap();
        assert_eq!(data, b"pdf bytes");

        // No temp file left behind
        assert!(!dir.path().join("field-1/0001_report.tmp").exists());
    }

    #[tokio::test]
    async fn test_store_persists_root_prefixed_path() {
        // The descriptor value must begin with the configured root so the
        // stored record is self-describing about where the payload lives.
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());

        let stored = store
            .store("field-1", "0002", "scan.png", b"png bytes")
            .await
            .unwrap();
        assert!(
            Path::new(&stored).starts_with(dir.path()),
            "stored path {:?} does not begin with the root {:?}",
            stored,
            dir.path()
        );
    }

    #[tokio::test]
    async fn test_store_sanitizes_ref_id_and_filename() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());

        let stored = store
            .store("../sneaky", "0001", "my report?.pdf", b"x")
            .await
            .unwrap();
        assert_eq!(
            stored,
            dir.path()
                .join("___sneaky/0001_my_report_.pdf")
                .display()
                .to_string()
        );
        assert!(Path::new(&stored).exists());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        let err = store.read("field-1/0009_gone.pdf").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_rejects_escaping_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        let err = store.read("../outside.txt").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        store.validate().await.unwrap();
    }
}
