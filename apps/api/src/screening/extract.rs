//! Resume text extraction for uploaded files.

use std::path::Path;

use crate::errors::AppError;

/// Extensions accepted by `extract_text`.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Pulls plain text out of an uploaded resume.
///
/// PDFs go through `pdf-extract`; `.txt` / `.md` must be UTF-8. Anything else,
/// or a file with no readable text, is a validation error.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let raw = match extension.as_str() {
        "pdf" => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| AppError::Validation(format!("Could not read PDF '{file_name}': {e}")))?,
        "txt" | "md" => String::from_utf8(bytes.to_vec()).map_err(|_| {
            AppError::Validation(format!("'{file_name}' is not valid UTF-8 text"))
        })?,
        _ => {
            return Err(AppError::Validation(format!(
                "Unsupported file type for '{file_name}'. Supported: {}",
                SUPPORTED_EXTENSIONS.join(", ")
            )))
        }
    };

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        return Err(AppError::Validation(format!(
            "No readable text found in '{file_name}'"
        )));
    }
    Ok(text)
}

/// Trims every line and collapses runs of blank lines into one.
fn normalize_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = false;
    for line in raw.lines().map(str::trim) {
        if line.is_empty() {
            blank_run = !out.is_empty();
            continue;
        }
        if blank_run {
            out.push('\n');
            blank_run = false;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_normalized() {
        let text = extract_text("resume.txt", b"  Jane Doe  \n\n\n\nRust, Go\n").unwrap();
        assert_eq!(text, "Jane Doe\n\nRust, Go");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(extract_text("RESUME.MD", b"# Jane").is_ok());
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let err = extract_text("resume.docx", b"binary").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("Unsupported")));
    }

    #[test]
    fn test_missing_extension_is_rejected() {
        assert!(matches!(
            extract_text("resume", b"text"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_file_is_rejected() {
        let err = extract_text("empty.txt", b" \n \n").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("No readable text")));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert!(matches!(
            extract_text("bad.txt", &[0xff, 0xfe, 0xfd]),
            Err(AppError::Validation(_))
        ));
    }
}
