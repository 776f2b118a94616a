//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! ## Why download to a temp file?
//!
//! pdfium requires a file-system path — it cannot stream from a byte buffer.
//! Downloading to a `TempDir` gives us a path pdfium can open while ensuring
//! cleanup happens automatically when `ResolvedInput` is dropped, even if
//! the process panics. Both paths validate the PDF magic bytes (`%PDF`)
//! before returning so callers get a meaningful error rather than a pdfium
//! crash; for downloads this also catches the HTML error page a server may
//! serve with a 200 status.

use crate::error::StitchError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const FALLBACK_FILENAME: &str = "downloaded.pdf";

/// The resolved input — either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
///
/// URLs are downloaded to a temporary directory; local paths are validated
/// for existence, readability and PDF magic bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, StitchError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, StitchError> {
    let path = PathBuf::from(path_str);

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(StitchError::PermissionDenied { path });
        }
        Err(_) => return Err(StitchError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
        return Err(StitchError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, StitchError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| StitchError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            StitchError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    // Prefer the server-advertised filename, then the URL path, then a
    // fixed fallback. The name only matters for log readability and any
    // derived output filename.
    let filename = filename_from_headers(&response)
        .or_else(|| filename_from_url(url))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| StitchError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    // Validate before writing anything to disk.
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(StitchError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| StitchError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

// ── Filename derivation ──────────────────────────────────────────────────

fn filename_from_headers(response: &reqwest::Response) -> Option<String> {
    let value = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)?
        .to_str()
        .ok()?;
    filename_from_content_disposition(value)
}

/// Extract the plain `filename=` parameter from a Content-Disposition value.
/// The RFC 5987 `filename*=` form is rare from PDF hosts and is ignored.
fn filename_from_content_disposition(value: &str) -> Option<String> {
    let start = value.to_ascii_lowercase().find("filename=")?;
    let raw = value[start + "filename=".len()..]
        .split(';')
        .next()?
        .trim()
        .trim_matches('"');
    sanitise_filename(raw)
}

fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.contains('.') {
        sanitise_filename(last)
    } else {
        None
    }
}

/// Strip any path components a hostile server might smuggle in; the result
/// is joined onto the temp directory, so it must be a bare name.
fn sanitise_filename(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_falls_back_from_url_path() {
        assert_eq!(
            filename_from_url("https://example.com/papers/report.pdf"),
            Some("report.pdf".to_string())
        );
        assert_eq!(filename_from_url("https://example.com/"), None);
        assert_eq!(filename_from_url("https://example.com/papers"), None);
    }

    #[test]
    fn content_disposition_filename_wins_over_url() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="q3 report.pdf""#),
            Some("q3 report.pdf".to_string())
        );
        assert_eq!(
            filename_from_content_disposition("inline; filename=plain.pdf"),
            Some("plain.pdf".to_string())
        );
        assert_eq!(filename_from_content_disposition("attachment"), None);
    }

    #[test]
    fn smuggled_path_components_are_stripped() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="../../etc/doc.pdf""#),
            Some("doc.pdf".to_string())
        );
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="..""#),
            None
        );
    }

    #[test]
    fn missing_file_is_a_not_found_error() {
        let err = resolve_local("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, StitchError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_file_is_rejected_by_magic_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();
        let err = resolve_local(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, StitchError::NotAPdf { .. }));
    }
}
