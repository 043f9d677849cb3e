//! Structured-output extraction.
//!
//! Models wrap JSON in markdown fences and append prose after the closing
//! delimiter. `extract_json` peels both away and parses what remains.

use crate::error::{LlmError, Result};

/// Extract a JSON value from raw model output.
///
/// 1. Strips a fenced code block (```json ... ``` or ``` ... ```).
/// 2. If the remaining content starts with `{` or `[`, scans balanced
///    delimiters (string- and escape-aware) and discards anything after
///    the outermost closing delimiter.
/// 3. Parses the result.
pub fn extract_json(raw: &str) -> Result<serde_json::Value> {
    let mut content = raw.trim();

    if let Some(fenced) = strip_fence(content) {
        content = fenced;
    }

    let content = match content.chars().next() {
        Some('{') | Some('[') => balanced_prefix(content)
            .ok_or_else(|| LlmError::InvalidOutput("unbalanced JSON delimiters".to_string()))?,
        _ => content,
    };

    serde_json::from_str(content)
        .map_err(|e| LlmError::InvalidOutput(format!("not valid JSON: {e}")))
}

/// Return the inside of the first fenced code block, if any.
fn strip_fence(content: &str) -> Option<&str> {
    let start = if let Some(idx) = content.find("```json") {
        idx + "```json".len()
    } else if let Some(idx) = content.find("```") {
        idx + "```".len()
    } else {
        return None;
    };

    let rest = &content[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// The prefix of `content` covering one balanced `{...}` or `[...]` value.
fn balanced_prefix(content: &str) -> Option<&str> {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in content.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[..=i]);
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
    use serde_json::json;

    #[test]
    fn plain_object_parses() {
        let value = extract_json(r#"{"verdict": "FALSE"}"#).unwrap();
        assert_eq!(value["verdict"], "FALSE");
    }

    #[test]
    fn fenced_block_round_trips() {
        let original = json!({"claims": ["a", "b"], "count": 2});
        let fenced = format!("```json\n{}\n```", original);
        assert_eq!(extract_json(&fenced).unwrap(), original);
    }

    #[test]
    fn bare_fence_round_trips() {
        let original = json!([1, 2, 3]);
        let fenced = format!("```\n{}\n```", original);
        assert_eq!(extract_json(&fenced).unwrap(), original);
    }

    #[test]
    fn trailing_prose_is_discarded() {
        let raw = r#"{"short_answer": "No."} I hope this analysis helps!"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["short_answer"], "No.");
    }

    #[test]
    fn fenced_with_trailing_prose_round_trips() {
        let original = json!({"nested": {"deep": [1, {"x": "y"}]}});
        let raw = format!("Here you go:\n```json\n{}\n```\nLet me know!", original);
        assert_eq!(extract_json(&raw).unwrap(), original);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scan() {
        let raw = r#"{"quote": "he said {hello} and \"goodbye\""} trailing"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["quote"], "he said {hello} and \"goodbye\"");
    }

    #[test]
    fn unbalanced_input_is_invalid_output() {
        let err = extract_json(r#"{"open": ["#).unwrap_err();
        assert!(matches!(err, LlmError::InvalidOutput(_)));
    }

    #[test]
    fn free_text_is_invalid_output() {
        let err = extract_json("The claim is false because...").unwrap_err();
        assert!(matches!(err, LlmError::InvalidOutput(_)));
    }

    #[test]
    fn arbitrary_values_survive_fencing() {
        for original in [
            json!(null),
            json!({"a": null, "b": [true, false], "c": {"d": 1.5}}),
            json!(["mixed", {"arr": []}, 42]),
        ] {
            let fenced = format!("```json\n{}\n``` trailing text", original);
            assert_eq!(extract_json(&fenced).unwrap(), original, "value {original}");
        }
    }
}
