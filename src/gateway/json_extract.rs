//! Recover a JSON object from an LLM response.
//!
//! Models wrap JSON in prose, code fences, or both. Recovery order:
//! strict parse, then fenced-block extraction, then the first balanced
//! `{...}` span. Anything that still fails counts as a provider failure.

use serde_json::Value;

/// Extract the first JSON object from raw model output.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Strict parse first.
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    // Fenced code block (```json ... ``` or bare ``` ... ```).
    if let Some(inner) = strip_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(inner.trim()) {
            if value.is_object() {
                return Some(value);
            }
        }
        // The fence may itself contain prose around the object.
        if let Some(span) = first_balanced_object(&inner) {
            if let Ok(value) = serde_json::from_str::<Value>(span) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
    }

    // First balanced { ... } span anywhere in the text.
    let span = first_balanced_object(trimmed)?;
    serde_json::from_str::<Value>(span)
        .ok()
        .filter(|v| v.is_object())
}

/// Content of the first fenced code block, if any.
fn strip_fenced_block(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip an optional language tag on the fence line.
    let content_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let content = &after_fence[content_start..];
    let close = content.find("```")?;
    Some(content[..close].to_string())
}

/// First `{...}` span with balanced braces, respecting string literals
/// and escapes.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_parses() {
        let v = extract_json_object(r#"{"entities": {"Product": ["Amoxil"]}}"#).unwrap();
        assert_eq!(v["entities"]["Product"][0], "Amoxil");
    }

    #[test]
    fn fenced_block_parses() {
        let text = "Here is the result:\n```json\n{\"relations\": []}\n```\nDone.";
        let v = extract_json_object(text).unwrap();
        assert!(v["relations"].is_array());
    }

    #[test]
    fn bare_fence_without_language_tag() {
        let text = "```\n{\"a\": 1}\n```";
        let v = extract_json_object(text).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn balanced_span_inside_prose() {
        let text = "The extraction yields {\"a\": {\"b\": 2}} as discussed above.";
        let v = extract_json_object(text).unwrap();
        assert_eq!(v["a"]["b"], 2);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let text = r#"answer: {"note": "use {caution} here", "n": 1} trailing"#;
        let v = extract_json_object(text).unwrap();
        assert_eq!(v["note"], "use {caution} here");
        assert_eq!(v["n"], 1);
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let text = r#"{"quote": "she said \"yes\"", "ok": true}"#;
        let v = extract_json_object(text).unwrap();
        assert_eq!(v["ok"], true);
    }

    #[test]
    fn top_level_array_is_rejected() {
        assert!(extract_json_object(r#"[1, 2, 3]"#).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(extract_json_object("no json here at all").is_none());
        assert!(extract_json_object("{unclosed").is_none());
        assert!(extract_json_object("").is_none());
    }
}
