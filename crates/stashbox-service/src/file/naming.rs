//! Upload filename sanitization and content-type resolution.

use stashbox_core::error::AppError;
use stashbox_core::result::AppResult;

/// Longest accepted filename, in characters.
const MAX_FILENAME_LEN: usize = 500;

/// Sanitize a client-supplied filename.
///
/// Backslashes are treated as path separators (Windows clients send
/// them), directory components are stripped down to the final one,
/// control characters are removed, and overlong names are truncated
/// while keeping the extension.
pub fn sanitize_filename(raw: &str) -> AppResult<String> {
    let normalized = raw.replace('\\', "/");
    let last = normalized.rsplit('/').next().unwrap_or("");

    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(AppError::validation("Invalid file name"));
    }

    if cleaned.chars().count() <= MAX_FILENAME_LEN {
        return Ok(cleaned.to_string());
    }

    let (stem, ext) = match cleaned.rfind('.') {
        Some(idx) if idx > 0 => (&cleaned[..idx], &cleaned[idx..]),
        _ => (cleaned, ""),
    };
    let keep = MAX_FILENAME_LEN.saturating_sub(ext.chars().count());
    let stem: String = stem.chars().take(keep).collect();
    Ok(format!("{stem}{ext}"))
}

/// Resolve the content type to record for an upload.
///
/// Magic bytes win over the filename extension, which wins over the
/// client's claimed type; `application/octet-stream` is the fallback.
pub fn resolve_content_type(data: &[u8], name: &str, claimed: Option<&str>) -> String {
    if let Some(sniffed) = sniff(data) {
        return sniffed.to_string();
    }
    if let Some(by_ext) = by_extension(name) {
        return by_ext.to_string();
    }
    if let Some(claimed) = claimed {
        let claimed = claimed.trim();
        if !claimed.is_empty() {
            return claimed.to_string();
        }
    }
    "application/octet-stream".to_string()
}

fn sniff(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"%PDF") {
        Some("application/pdf")
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if data.starts_with(b"\xff\xd8\xff") {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.starts_with(b"PK\x03\x04") {
        Some("application/zip")
    } else {
        None
    }
}

fn by_extension(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.').map(|(_, e)| e)?;
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "zip" => Some("application/zip"),
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "csv" => Some("text/csv"),
        "html" | "htm" => Some("text/html"),
        "json" => Some("application/json"),
        "xml" => Some("application/xml"),
        "mp3" => Some("audio/mpeg"),
        "mp4" => Some("video/mp4"),
        _ => None,
    }
}
