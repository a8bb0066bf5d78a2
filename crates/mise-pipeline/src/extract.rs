//! Fenced code block extraction.
//!
//! Model output often wraps the payload in a markdown fence. Precedence:
//! 1. a fence labeled with the preferred language,
//! 2. otherwise the first fence in the text,
//! 3. otherwise the raw text.
//!
//! A fence that is never closed, or whose body contains the opening of
//! another labeled fence (a marker at the start of a line followed by a
//! label and a newline), is not a match and the next rule applies. The
//! result is always trimmed.

const FENCE: &str = "```";

/// Return the payload of `text`, stripped of any surrounding fence.
pub fn extract_fenced<'a>(text: &'a str, preferred_lang: Option<&str>) -> &'a str {
    let labeled = preferred_lang
        .and_then(|lang| find_labeled(text, lang))
        .and_then(|start| fenced_body(text, start));

    labeled
        .or_else(|| text.find(FENCE).and_then(|start| fenced_body(text, start)))
        .unwrap_or(text)
        .trim()
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')
}

/// Language label written right after the fence marker at `start`.
fn label_at(text: &str, start: usize) -> &str {
    let rest = &text[start + FENCE.len()..];
    let end = rest.find(|c: char| !is_label_char(c)).unwrap_or(rest.len());
    &rest[..end]
}

/// Position of the first fence whose label equals `lang` (case-insensitive).
fn find_labeled(text: &str, lang: &str) -> Option<usize> {
    text.match_indices(FENCE)
        .map(|(start, _)| start)
        .find(|&start| label_at(text, start).eq_ignore_ascii_case(lang))
}

/// Whether the marker at `pos` opens a new labeled fence.
fn opens_labeled_fence(text: &str, pos: usize) -> bool {
    let at_line_start = pos == 0 || text[..pos].ends_with('\n');
    let label = label_at(text, pos);
    let after = &text[pos + FENCE.len() + label.len()..];
    at_line_start && !label.is_empty() && (after.starts_with('\n') || after.starts_with("\r\n"))
}

/// Body of the fence opened at `start`, up to the next fence marker.
fn fenced_body(text: &str, start: usize) -> Option<&str> {
    let body_start = start + FENCE.len() + label_at(text, start).len();
    let close = body_start + text[body_start..].find(FENCE)?;

    if opens_labeled_fence(text, close) {
        return None;
    }
    Some(&text[body_start..close])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fence_returns_trimmed_text() {
        assert_eq!(extract_fenced("  {\"a\": 1}\n", Some("json")), "{\"a\": 1}");
        assert_eq!(extract_fenced("plain prose", None), "plain prose");
    }

    #[test]
    fn test_labeled_fence() {
        let text = "Here is the recipe:\n```json\n{\"steps\": []}\n```\nEnjoy!";
        assert_eq!(extract_fenced(text, Some("json")), "{\"steps\": []}");
    }

    #[test]
    fn test_unlabeled_fence() {
        let text = "```\n<html></html>\n```";
        assert_eq!(extract_fenced(text, Some("html")), "<html></html>");
    }

    #[test]
    fn test_preferred_label_beats_earlier_fence() {
        let text = "```text\nnotes first\n```\nthen\n```json\n{\"x\": 1}\n```";
        assert_eq!(extract_fenced(text, Some("json")), "{\"x\": 1}");
        // Without a preference the first fence wins
        assert_eq!(extract_fenced(text, None), "notes first");
    }

    #[test]
    fn test_label_match_is_case_insensitive() {
        let text = "```HTML\n<p>hi</p>\n```";
        assert_eq!(extract_fenced(text, Some("html")), "<p>hi</p>");
    }

    #[test]
    fn test_other_label_used_when_preferred_missing() {
        let text = "```javascript\n{\"a\": 1}\n```";
        assert_eq!(extract_fenced(text, Some("json")), "{\"a\": 1}");
    }

    #[test]
    fn test_unterminated_fence_falls_back_to_raw() {
        let text = "```json\n{\"a\": 1}\n";
        assert_eq!(extract_fenced(text, Some("json")), text.trim());
    }

    #[test]
    fn test_nested_fence_falls_back_to_raw() {
        let text = "```markdown\nouter\n```json\n{\"a\": 1}\n```\n```";
        assert_eq!(extract_fenced(text, Some("markdown")), text.trim());
    }

    #[test]
    fn test_text_after_closing_fence_is_not_a_label() {
        let text = "```json\n{\"steps\": [\"a\"]}\n```Enjoy!";
        assert_eq!(extract_fenced(text, Some("json")), "{\"steps\": [\"a\"]}");

        let text = "```json\n{\"steps\": [\"a\"]}\n```.";
        assert_eq!(extract_fenced(text, Some("json")), "{\"steps\": [\"a\"]}");

        let text = "```json\n{\"steps\": []}\n```json and that is all";
        assert_eq!(extract_fenced(text, Some("json")), "{\"steps\": []}");
    }

    #[test]
    fn test_unterminated_preferred_fence_falls_back_to_first_fence() {
        let text = "```\n{\"a\":1}\n```\nthen\n```json\n{\"b\":";
        assert_eq!(extract_fenced(text, Some("json")), "{\"a\":1}");
    }

    #[test]
    fn test_inline_fence_without_newlines() {
        assert_eq!(extract_fenced("```{\"a\":1}```", Some("json")), "{\"a\":1}");
    }

    #[test]
    fn test_empty_fence() {
        assert_eq!(extract_fenced("```json\n```", Some("json")), "");
    }
}
