//! Free-text sanitization.
//!
//! Characters are removed first and whitespace trimmed last, so a second
//! pass over sanitized output never changes it.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));

/// Remove every `<` and `>` character, then trim.
pub fn strip_angle_brackets(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Remove whole tag-like sequences (`<...>`), then trim.
pub fn strip_tags(input: &str) -> String {
    TAG_PATTERN.replace_all(input, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_brackets_removed() {
        assert_eq!(strip_angle_brackets("  <b>cat</b> "), "bcat/b");
        assert_eq!(strip_angle_brackets("a > b"), "a  b");
    }

    #[test]
    fn test_tags_removed_text_kept() {
        assert_eq!(strip_tags("<p>Hello <i>world</i></p>"), "Hello world");
        assert_eq!(strip_tags("1 < 2"), "1 < 2");
    }

    #[test]
    fn test_sanitizers_are_idempotent() {
        let samples = [
            "plain text",
            "  padded  ",
            "< leading bracket",
            "<<a>b>",
            "<a<b>c> tail >",
            "mixed <script>alert(1)</script> content",
            "",
            "   ",
        ];
        for sample in samples {
            let once = strip_angle_brackets(sample);
            assert_eq!(strip_angle_brackets(&once), once, "angle: {:?}", sample);
            let once = strip_tags(sample);
            assert_eq!(strip_tags(&once), once, "tags: {:?}", sample);
        }
    }
}
