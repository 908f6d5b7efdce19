//! Filename and file-metadata helpers for note attachments.

/// Map a filename extension to a MIME type.
///
/// Unknown extensions fall back to `application/octet-stream`.
pub fn mime_type_for(filename: &str) -> &'static str {
    let ext = extension(filename);
    match ext.as_str() {
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "csv" => "text/csv",
        // Archives
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        _ => "application/octet-stream",
    }
}

/// Check a filename against an extension allow-list (case-insensitive).
pub fn is_allowed_type(filename: &str, allowed: &[String]) -> bool {
    let ext = extension(filename);
    if ext.is_empty() {
        return false;
    }
    allowed.iter().any(|a| a.trim().eq_ignore_ascii_case(&ext))
}

/// True for image extensions that can be embedded inline.
pub fn is_image(filename: &str) -> bool {
    matches!(
        extension(filename).as_str(),
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg"
    )
}

/// Format a byte count for display (B/KB/MB/GB, one decimal place).
pub fn format_size(bytes: u64) -> String {
    const K: f64 = 1024.0;
    if bytes == 0 {
        return "0 B".to_string();
    }
    let units = ["B", "KB", "MB", "GB"];
    let exp = ((bytes as f64).ln() / K.ln()).floor() as usize;
    let exp = exp.min(units.len() - 1);
    let value = bytes as f64 / K.powi(exp as i32);
    if exp == 0 {
        format!("{} B", bytes)
    } else {
        // Trim a trailing ".0" so 2048 renders as "2 KB", not "2.0 KB"
        let rounded = (value * 10.0).round() / 10.0;
        if (rounded - rounded.trunc()).abs() < f64::EPSILON {
            format!("{} {}", rounded.trunc() as u64, units[exp])
        } else {
            format!("{:.1} {}", rounded, units[exp])
        }
    }
}

/// Sanitize a filename for storage on disk.
///
/// Strips path components and replaces every character outside
/// `[A-Za-z0-9._-]` with `_`. Never returns an empty string.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return "unnamed_file".to_string();
    }
    sanitized
}

fn extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}
