//! Heading extraction and anchor generation for markdown documents
//!
//! Anchors follow the common heading-anchor convention: lowercased heading
//! text with spaces as hyphens and everything outside `[a-z0-9-]` removed.
//! Only H1-H3 headings are considered; deeper levels are ignored.

use regex_lite::Regex;
use std::sync::OnceLock;

/// A markdown heading with its byte offset in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Heading text without the leading `#` markers
    pub text: String,
    /// Heading level, 1-3
    pub level: u8,
    /// Pre-computed anchor slug
    pub anchor: String,
    /// Byte offset of the heading line from the start of the document
    pub offset: usize,
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(#{1,3})\s+(.+)$").unwrap())
}

/// Convert heading text to an anchor slug.
///
/// Returns an empty string when the heading contains no usable characters.
pub fn heading_to_anchor(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace(' ', "-");
    let slug: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    slug.trim_matches('-').to_string()
}

/// Extract H1-H3 headings with byte offsets.
///
/// Lines inside fenced code blocks are skipped so that `# comment` lines in
/// shell samples do not produce anchors.
pub fn extract_headings(content: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut offset = 0usize;
    let mut in_fence = false;

    for line in content.split_inclusive('\n') {
        let trimmed_end = line.trim_end_matches(['\n', '\r']);

        if trimmed_end.trim_start().starts_with("```") {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some(caps) = heading_pattern().captures(trimmed_end) {
                let level = caps.get(1).map(|m| m.as_str().len()).unwrap_or(1) as u8;
                let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
                headings.push(Heading {
                    text: text.to_string(),
                    level,
                    anchor: heading_to_anchor(text),
                    offset,
                });
            }
        }

        offset += line.len();
    }

    headings
}

/// Find the anchor of the nearest heading at or before the given offset.
///
/// Returns `None` when no heading precedes the offset or the heading slug is
/// empty. Among headings at the same offset, the highest level (H1 first)
/// wins.
pub fn nearest_anchor(offset: usize, headings: &[Heading]) -> Option<String> {
    let mut preceding: Vec<&Heading> = headings.iter().filter(|h| h.offset <= offset).collect();

    if preceding.is_empty() {
        return None;
    }

    preceding.sort_by(|a, b| b.offset.cmp(&a.offset).then(a.level.cmp(&b.level)));

    let nearest = preceding[0];
    if nearest.anchor.is_empty() {
        None
    } else {
        Some(nearest.anchor.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_slug_rules() {
        assert_eq!(heading_to_anchor("Database Schema"), "database-schema");
        assert_eq!(heading_to_anchor("API Endpoints (v2.0)"), "api-endpoints-v20");
        assert_eq!(heading_to_anchor("Introduction & Overview"), "introduction--overview");
        assert_eq!(heading_to_anchor("   Spaces   "), "spaces");
        assert_eq!(heading_to_anchor("@#$%"), "");
    }

    #[test]
    fn test_extract_headings_levels() {
        let content = "# Title\nSome text\n## Section 1\nMore text\n### Subsection\n#### Too deep\n";
        let headings = extract_headings(content);
        assert_eq!(headings.len(), 3);
        assert_eq!(headings[0].text, "Title");
        assert_eq!(headings[0].level, 1);
        assert_eq!(headings[0].anchor, "title");
        assert_eq!(headings[2].level, 3);
    }

    #[test]
    fn test_extract_headings_offsets() {
        let content = "# A\nbody\n## B\n";
        let headings = extract_headings(content);
        assert_eq!(headings[0].offset, 0);
        assert_eq!(headings[1].offset, 9);
    }

    #[test]
    fn test_fenced_code_is_ignored() {
        let content = "# Real\n```sh\n# not a heading\n```\n## Also real\n";
        let headings = extract_headings(content);
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[1].anchor, "also-real");
    }

    #[test]
    fn test_nearest_anchor() {
        let headings = extract_headings("# Title\nbody\n## Section\nmore body\n");
        assert_eq!(nearest_anchor(0, &headings), Some("title".to_string()));
        assert_eq!(nearest_anchor(10, &headings), Some("title".to_string()));
        assert_eq!(nearest_anchor(30, &headings), Some("section".to_string()));
    }

    #[test]
    fn test_nearest_anchor_before_first_heading() {
        let headings = extract_headings("intro without heading\n# Later\n");
        assert_eq!(nearest_anchor(0, &headings), None);
    }

    #[test]
    fn test_nearest_anchor_empty_slug() {
        let headings = extract_headings("# @#$%\nbody\n");
        assert_eq!(nearest_anchor(10, &headings), None);
    }
}
