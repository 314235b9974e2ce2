//! Utility helpers shared across the CLI.

/// Truncate `text` to at most `max_chars` characters, appending `suffix`
/// when anything was cut. Char-boundary safe.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}{suffix}")
}

/// Render a flat parameter list the way the backend prints it:
/// `key=value, key=value`.
#[must_use]
pub fn format_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_with_ellipsis("héllo wörld", 5, "..."), "héllo...");
        assert_eq!(truncate_with_ellipsis("short", 10, "..."), "short");
        assert_eq!(truncate_with_ellipsis("🔧🔧🔧", 2, "…"), "🔧🔧…");
    }

    #[test]
    fn params_render_in_order() {
        let params = vec![
            ("query".to_string(), "rust".to_string()),
            ("limit".to_string(), "3".to_string()),
        ];
        assert_eq!(format_params(&params), "query=rust, limit=3");
        assert_eq!(format_params(&[]), "");
    }
}
