//! Grounded context assembly and source attribution
//!
//! Pure helpers shared by the chat engine: formatting retrieved chunks into
//! a prompt context, mirroring them into a citation list, and deriving a
//! conversation title from the first user message.

use dochub_common::db::models::SourceCitation;
use dochub_search::SearchResultItem;

/// Concatenate retrieved chunks into the prompt context.
///
/// Chunks arrive in descending-similarity order and are kept that way; each
/// is tagged with its provenance so the model can tell sources apart.
pub fn assemble_context(results: &[SearchResultItem]) -> String {
    let mut parts = Vec::with_capacity(results.len());

    for (i, result) in results.iter().enumerate() {
        let anchor = result
            .anchor
            .as_deref()
            .map(|a| format!("#{}", a))
            .unwrap_or_default();

        parts.push(format!(
            "[Source {}: {}{}]\n{}\n",
            i + 1,
            result.metadata.file_name,
            anchor,
            result.chunk_text
        ));
    }

    parts.join("\n")
}

/// Build the ordered citation list mirroring the chunks actually used
pub fn build_citations(results: &[SearchResultItem]) -> Vec<SourceCitation> {
    results
        .iter()
        .map(|result| SourceCitation {
            document_id: result.document_id,
            file_path: result.metadata.file_path.clone(),
            file_name: result.metadata.file_name.clone(),
            anchor: result.anchor.clone(),
            similarity_score: result.similarity_score as f32,
        })
        .collect()
}

/// Derive a conversation title from the first user message: a fixed-length
/// prefix with an ellipsis when truncated.
pub fn derive_title(content: &str, max_chars: usize) -> String {
    let trimmed = content.trim();
    let mut chars = trimmed.chars();
    let prefix: String = chars.by_ref().take(max_chars).collect();

    if chars.next().is_some() {
        format!("{}…", prefix)
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dochub_search::ChunkMetadata;
    use uuid::Uuid;

    fn result(name: &str, anchor: Option<&str>, score: f64) -> SearchResultItem {
        SearchResultItem {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            chunk_text: format!("text from {}", name),
            similarity_score: score,
            anchor: anchor.map(String::from),
            metadata: ChunkMetadata {
                file_path: format!("docs/{}", name),
                file_name: name.to_string(),
                file_type: "md".to_string(),
                chunk_position: 0,
                total_chunks: 1,
            },
        }
    }

    #[test]
    fn test_assemble_context_tags_provenance() {
        let results = vec![
            result("auth.md", Some("login-flow"), 0.9),
            result("setup.md", None, 0.7),
        ];

        let context = assemble_context(&results);
        assert!(context.contains("[Source 1: auth.md#login-flow]"));
        assert!(context.contains("[Source 2: setup.md]"));
        assert!(context.contains("text from auth.md"));

        // Descending-similarity order is preserved
        let first = context.find("auth.md").unwrap();
        let second = context.find("setup.md").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_assemble_context_empty() {
        assert_eq!(assemble_context(&[]), "");
    }

    #[test]
    fn test_citations_mirror_results() {
        let results = vec![
            result("a.md", Some("intro"), 0.91),
            result("b.md", None, 0.42),
        ];

        let citations = build_citations(&results);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].file_name, "a.md");
        assert_eq!(citations[0].anchor.as_deref(), Some("intro"));
        assert!((citations[0].similarity_score - 0.91).abs() < 1e-6);
        assert_eq!(citations[1].file_path, "docs/b.md");
        assert_eq!(citations[1].anchor, None);
    }

    #[test]
    fn test_derive_title_short_content() {
        assert_eq!(derive_title("What are the goals?", 50), "What are the goals?");
    }

    #[test]
    fn test_derive_title_truncates_with_ellipsis() {
        let long = "How does the ingestion pipeline handle partial failures during embedding?";
        let title = derive_title(long, 50);
        assert_eq!(title.chars().count(), 51);
        assert!(title.ends_with('…'));
        assert!(title.starts_with("How does the ingestion"));
    }

    #[test]
    fn test_derive_title_trims_whitespace() {
        assert_eq!(derive_title("   hello   ", 50), "hello");
    }

    #[test]
    fn test_derive_title_multibyte_safe() {
        let title = derive_title("héllo wörld with ünïcode content here", 10);
        assert_eq!(title.chars().count(), 11);
        assert!(title.ends_with('…'));
    }
}
