/// Flatten a transcript line for embedding in a prompt: double quotes become
/// single quotes, newlines become spaces, surrounding whitespace is trimmed.
pub fn sanitize_line(text: &str) -> String {
    text.replace('"', "'")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Cut `s` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
