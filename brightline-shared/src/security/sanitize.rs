/// Input screening and sanitization
///
/// Free-text form fields go through two steps:
///
/// 1. [`find_unsafe_input`] rejects text carrying script payloads (script
///    tags, `javascript:`/`vbscript:` URLs, HTML data URLs, inline event
///    handlers inside tags, NUL bytes). A hit is a security failure, not a
///    validation failure.
/// 2. [`sanitize_text`] normalizes whatever passes: control characters other
///    than newline and tab are dropped and surrounding whitespace is trimmed.
///    The text is otherwise kept as submitted; it is stored as JSON and sent
///    on as plain text, so HTML escaping is left to whatever renders it.
///
/// Uploads get [`sanitize_filename`] and [`check_upload_type`].

/// Why a value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsafeInput {
    ScriptTag,
    ScriptUrl,
    HtmlDataUrl,
    EventHandler,
    NulByte,
}

impl UnsafeInput {
    pub fn describe(&self) -> &'static str {
        match self {
            UnsafeInput::ScriptTag => "script tag",
            UnsafeInput::ScriptUrl => "script URL",
            UnsafeInput::HtmlDataUrl => "HTML data URL",
            UnsafeInput::EventHandler => "inline event handler",
            UnsafeInput::NulByte => "NUL byte",
        }
    }
}

/// Returns the first unsafe construct found in `value`, if any
pub fn find_unsafe_input(value: &str) -> Option<UnsafeInput> {
    if value.contains('\0') {
        return Some(UnsafeInput::NulByte);
    }

    // Collapse whitespace so "java\tscript:" and "< script" are still caught
    let folded: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    if folded.contains("<script") {
        return Some(UnsafeInput::ScriptTag);
    }
    if folded.contains("javascript:") || folded.contains("vbscript:") {
        return Some(UnsafeInput::ScriptUrl);
    }
    if folded.contains("data:text/html") {
        return Some(UnsafeInput::HtmlDataUrl);
    }
    if has_event_handler(&value.to_lowercase()) {
        return Some(UnsafeInput::EventHandler);
    }

    None
}

/// Looks for `on<letters>=` attributes inside `<...>` segments
fn has_event_handler(lower: &str) -> bool {
    let mut rest = lower;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let end = after.find('>').unwrap_or(after.len());
        let tag = &after[..end];

        let bytes = tag.as_bytes();
        let mut i = 0;
        while i + 2 < bytes.len() {
            let boundary = i == 0 || matches!(bytes[i - 1], b' ' | b'\t' | b'\n' | b'/' | b'"' | b'\'');
            if boundary && bytes[i] == b'o' && bytes[i + 1] == b'n' {
                let mut j = i + 2;
                while j < bytes.len() && bytes[j].is_ascii_lowercase() {
                    j += 1;
                }
                let name_len = j - (i + 2);
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if name_len > 0 && j < bytes.len() && bytes[j] == b'=' {
                    return true;
                }
            }
            i += 1;
        }

        rest = &after[end..];
    }

    false
}

/// Normalizes accepted free text for storage and forwarding
pub fn sanitize_text(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| matches!(c, '\n' | '\t') || !c.is_control())
        .collect()
}

/// Maximum stored filename length in bytes
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Reduces a client-supplied filename to a safe storage name
///
/// Keeps only the final path component, replaces anything outside
/// `[A-Za-z0-9._-]` with `_` and strips leading dots. Returns `None` when
/// nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() || trimmed.chars().all(|c| matches!(c, '_' | '.')) {
        return None;
    }

    let mut result = trimmed.to_string();
    if result.len() > MAX_FILENAME_LENGTH {
        // Keep the extension when truncating
        let ext = result.rsplit_once('.').map(|(_, e)| e.to_string()).filter(|e| e.len() < 16);
        match ext {
            Some(ext) => {
                result.truncate(MAX_FILENAME_LENGTH - ext.len() - 1);
                result.push('.');
                result.push_str(&ext);
            }
            None => result.truncate(MAX_FILENAME_LENGTH),
        }
    }

    Some(result)
}

/// Accepted upload types: extension → content type
pub const ALLOWED_UPLOAD_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
];

/// Why an upload's type was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadTypeError {
    #[error("file type {0} is not allowed")]
    NotAllowed(String),

    #[error("file has no extension")]
    MissingExtension,

    #[error("extension .{extension} does not match content type {content_type}")]
    ExtensionMismatch {
        extension: String,
        content_type: String,
    },
}

/// Checks a (sanitized) filename and declared content type against the allowlist
///
/// # Returns
///
/// The normalized content type (lowercase, parameters stripped)
pub fn check_upload_type(filename: &str, content_type: &str) -> Result<&'static str, UploadTypeError> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let allowed = ALLOWED_UPLOAD_TYPES
        .iter()
        .find(|(_, mime)| *mime == normalized)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| UploadTypeError::NotAllowed(normalized.clone()))?;

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .ok_or(UploadTypeError::MissingExtension)?;

    let matches = ALLOWED_UPLOAD_TYPES
        .iter()
        .any(|(ext, mime)| *ext == extension && *mime == allowed);
    if !matches {
        return Err(UploadTypeError::ExtensionMismatch {
            extension,
            content_type: allowed.to_string(),
        });
    }

    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_script_payloads() {
        assert_eq!(
            find_unsafe_input("hi <script>alert(1)</script>"),
            Some(UnsafeInput::ScriptTag)
        );
        assert_eq!(find_unsafe_input("< SCRIPT src=x>"), Some(UnsafeInput::ScriptTag));
        assert_eq!(
            find_unsafe_input("see JavaScript:alert(1)"),
            Some(UnsafeInput::ScriptUrl)
        );
        assert_eq!(
            find_unsafe_input("java\tscript:void(0)"),
            Some(UnsafeInput::ScriptUrl)
        );
        assert_eq!(
            find_unsafe_input("data:text/html;base64,PHNjcmlwdD4="),
            Some(UnsafeInput::HtmlDataUrl)
        );
        assert_eq!(
            find_unsafe_input("<img src=x onerror=alert(1)>"),
            Some(UnsafeInput::EventHandler)
        );
        assert_eq!(
            find_unsafe_input("<a href='#' onClick = 'x()'>"),
            Some(UnsafeInput::EventHandler)
        );
        assert_eq!(find_unsafe_input("a\0b"), Some(UnsafeInput::NulByte));
    }

    #[test]
    fn test_ordinary_text_passes() {
        for text in [
            "We need a new website by Q3.",
            "Budget is 10k-25k, one = two is fine",
            "conditions=ok",
            "Call me on 555-0100 <or email>",
            "a < b and c > d",
        ] {
            assert_eq!(find_unsafe_input(text), None, "{text}");
        }
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  hello  "), "hello");
        assert_eq!(sanitize_text("Tom & Jerry's \"shop\""), "Tom & Jerry's \"shop\"");
        assert_eq!(sanitize_text("a < b"), "a < b");
        assert_eq!(sanitize_text("line1\nline2\u{7}\r"), "line1\nline2");
        assert_eq!(sanitize_text("\u{1b}[31mred"), "[31mred");
        assert_eq!(sanitize_text(" o'brien@example.com "), "o'brien@example.com");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\My Plan (v2).docx").as_deref(),
            Some("My_Plan__v2_.docx")
        );
        assert_eq!(sanitize_filename(".htaccess").as_deref(), Some("htaccess"));
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename("???"), None);

        let long = format!("{}.pdf", "a".repeat(400));
        let sanitized = sanitize_filename(&long).unwrap();
        assert_eq!(sanitized.len(), MAX_FILENAME_LENGTH);
        assert!(sanitized.ends_with(".pdf"));
    }

    #[test]
    fn test_check_upload_type() {
        assert_eq!(check_upload_type("a.pdf", "application/pdf"), Ok("application/pdf"));
        assert_eq!(check_upload_type("a.JPG", "image/jpeg"), Ok("image/jpeg"));
        assert_eq!(
            check_upload_type("notes.txt", "Text/Plain; charset=utf-8"),
            Ok("text/plain")
        );

        assert_eq!(
            check_upload_type("a.exe", "application/x-msdownload"),
            Err(UploadTypeError::NotAllowed("application/x-msdownload".to_string()))
        );
        assert_eq!(
            check_upload_type("a", "application/pdf"),
            Err(UploadTypeError::MissingExtension)
        );
        assert!(matches!(
            check_upload_type("a.png", "application/pdf"),
            Err(UploadTypeError::ExtensionMismatch { .. })
        ));
    }
}
