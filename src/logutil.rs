//! Log sanitization helpers.
//!
//! Usernames and board names arrive straight off the wire, so anything we log
//! about them must stay on a single line and free of control characters.

/// Escape a client-supplied string for single-line logging.
///
/// Newlines, carriage returns and tabs become their two-character escapes,
/// backslashes are doubled, and any other control character is rendered as
/// `\xNN`. Strings longer than the preview cap are truncated with an ellipsis.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
