//! Shared utility functions.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Truncate a string to approximately `max_bytes` without splitting a UTF-8
/// character boundary.
///
/// Returns a sub-slice of the original string. If the string is shorter than
/// `max_bytes`, the entire string is returned unchanged.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("valid regex"));

/// Extract a JSON object from free-form model output.
///
/// Tries, in order: the whole text, the first fenced code block, and the
/// span from the first `{` to the last `}`. Returns `None` when nothing
/// parses to a JSON object.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    if let Some(caps) = FENCED_JSON.captures(text)
        && let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(caps[1].trim())
    {
        return Some(value);
    }

    if let Some(start) = text.find('{')
        && let Some(end) = text.rfind('}')
        && end > start
        && let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..=end])
    {
        return Some(value);
    }

    None
}

static PLACEHOLDER_IMAGES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)!\[[^\]]*\]\(https?://(?:via\.placeholder\.com|placeholder\.[^)\s]*|example\.com)[^)]*\)",
    )
    .expect("valid regex")
});

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Remove markdown images that point at placeholder hosts and collapse the
/// blank lines they leave behind.
pub fn strip_placeholder_images(text: &str) -> String {
    let stripped = PLACEHOLDER_IMAGES.replace_all(text, "");
    EXCESS_BLANK_LINES
        .replace_all(&stripped, "\n\n")
        .trim()
        .to_string()
}

const REFUSAL_MARKERS: &[&str] = &[
    "i can't help with",
    "i cannot help with",
    "i can't assist",
    "i cannot assist",
    "i'm sorry, but i can't",
    "i'm sorry, but i cannot",
    "i am unable to help",
    "as an ai language model, i cannot",
];

/// Heuristic refusal detection on the opening of a response.
pub fn looks_like_refusal(text: &str) -> bool {
    let head = truncate_str(text.trim_start(), 200).to_lowercase();
    let head = head.replace('\u{2019}', "'");
    REFUSAL_MARKERS.iter().any(|marker| head.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn truncate_no_op_when_short() {
        assert_eq!(truncate_str("hi", 10), "hi");
    }

    #[test]
    fn truncate_multibyte_boundary() {
        let s = "あのね";
        assert_eq!(truncate_str(s, 4), "あ");
        assert_eq!(truncate_str(s, 6), "あの");
    }

    #[test]
    fn extract_json_plain() {
        let value = extract_json_object(r#"{"type": "chat"}"#).unwrap();
        assert_eq!(value["type"], "chat");
    }

    #[test]
    fn extract_json_fenced() {
        let text = "Here you go:\n```json\n{\"type\": \"factual\"}\n```\nDone.";
        assert_eq!(extract_json_object(text).unwrap()["type"], "factual");
    }

    #[test]
    fn extract_json_embedded_in_prose() {
        let text = "Sure! {\"panel\": []} hope that helps";
        assert!(extract_json_object(text).unwrap()["panel"].is_array());
    }

    #[test]
    fn extract_json_rejects_non_objects() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("no json here").is_none());
    }

    #[test]
    fn strip_placeholder_images_removes_fake_hosts() {
        let text = "Intro\n\n![chart](https://via.placeholder.com/300)\n\n\n\nOutro ![ok](https://real.host/x.png)";
        let cleaned = strip_placeholder_images(text);
        assert!(!cleaned.contains("placeholder"));
        assert!(cleaned.contains("https://real.host/x.png"));
        assert!(!cleaned.contains("\n\n\n"));
    }

    #[test]
    fn refusal_detection() {
        assert!(looks_like_refusal("I'm sorry, but I can't help with that."));
        assert!(looks_like_refusal("  I cannot assist with this request"));
        assert!(!looks_like_refusal("Rust is a systems programming language."));
    }
}
