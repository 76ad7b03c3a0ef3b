use anyhow::{Context, Result};
use smartcut_core::TranscriptLine;
use std::path::Path;

/// Read a transcript: a JSON array of `{text, start_second, end_second}`.
/// An empty array is returned as-is; the planner rejects it.
pub fn load_transcript(path: &Path) -> Result<Vec<TranscriptLine>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading transcript {}", path.display()))?;
    parse_transcript(&content).with_context(|| format!("parsing transcript {}", path.display()))
}

pub fn parse_transcript(json: &str) -> Result<Vec<TranscriptLine>> {
    let lines: Vec<TranscriptLine> =
        serde_json::from_str(json).context("transcript must be a JSON array of lines")?;
    tracing::debug!(lines = lines.len(), "transcript loaded");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_with_missing_fields() {
        let lines = parse_transcript(
            r#"[{"text": "hello", "start_second": 0, "end_second": 1.2}, {"start_second": "1.2"}]"#,
        )
        .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "");
        assert_eq!(lines[1].start_second, 1.2);
    }

    #[test]
    fn rejects_non_array() {
        assert!(parse_transcript(r#"{"text": "hello"}"#).is_err());
    }

    #[test]
    fn missing_file_names_path() {
        let err = load_transcript(Path::new("/nonexistent/transcript.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/transcript.json"));
    }
}
