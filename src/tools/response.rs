//! Response body formatting shared by the HTTP tools

/// Longest raw text body returned before truncation, in characters
pub const MAX_TEXT_CHARS: usize = 5000;

/// A response body prepared for the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormattedBody {
    pub is_json: bool,
    pub text: String,
}

/// Pretty-print JSON bodies; pass anything else through [`truncate_text`]
pub(crate) fn format_body(raw: &str) -> FormattedBody {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => FormattedBody {
            is_json: true,
            text: serde_json::to_string_pretty(&value).unwrap_or_else(|_| raw.to_string()),
        },
        Err(_) => FormattedBody {
            is_json: false,
            text: truncate_text(raw, MAX_TEXT_CHARS),
        },
    }
}

/// Cut `text` to `max` characters and say how many were dropped
pub(crate) fn truncate_text(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max).collect();
    format!("{}\n... (truncated, {} more chars)", kept, total - max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_pretty_printed() {
        let body = format_body(r#"{"ok":true,"items":[1,2]}"#);
        assert!(body.is_json);
        assert!(body.text.contains("\n  \"ok\": true"));
    }

    #[test]
    fn test_text_passes_through() {
        let body = format_body("plain <b>text</b>");
        assert!(!body.is_json);
        assert_eq!(body.text, "plain <b>text</b>");
    }

    #[test]
    fn test_truncation_marker_counts_elided_chars() {
        let raw = "x".repeat(MAX_TEXT_CHARS + 1234);
        let body = format_body(&raw);
        assert!(body.text.starts_with(&"x".repeat(MAX_TEXT_CHARS)));
        assert!(body.text.ends_with("\n... (truncated, 1234 more chars)"));
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let raw = "é".repeat(12);
        assert_eq!(truncate_text(&raw, 10), format!("{}\n... (truncated, 2 more chars)", "é".repeat(10)));
        assert_eq!(truncate_text(&raw, 12), raw);
    }
}
