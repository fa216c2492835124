//! Web search results and their chat digest.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::chatbot::args::SearchRequest;

/// Hits shown to the user, whatever `--count` asked the upstream for.
pub const MAX_DISPLAYED_HITS: usize = 5;

const MAX_EXTRA_SNIPPETS: usize = 2;

pub const NO_RESULTS: &str = "No results found.";
pub const SEARCH_FAILED: &str = "Error fetching search results. Try again later.";

/// A single ranked result from the search service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub extra_snippets: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A web search backend.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError>;
}

/// Render ranked hits as a numbered digest.
pub fn format_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }

    hits.iter()
        .take(MAX_DISPLAYED_HITS)
        .enumerate()
        .map(|(idx, hit)| format_hit(idx + 1, hit))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_hit(index: usize, hit: &SearchHit) -> String {
    let mut entry = format!("{}. {}\n{}\n{}", index, hit.title, hit.url, hit.description);

    if let Some(ref extras) = hit.extra_snippets
        && !extras.is_empty()
    {
        let snippets: Vec<String> = extras
            .iter()
            .take(MAX_EXTRA_SNIPPETS)
            .map(|s| format!("• {s}"))
            .collect();
        entry.push_str("\n\nExtra snippets:\n");
        entry.push_str(&snippets.join("\n"));
    }

    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(n: usize) -> SearchHit {
        SearchHit {
            title: format!("Title {n}"),
            url: format!("https://example.com/{n}"),
            description: format!("Description {n}"),
            extra_snippets: None,
        }
    }

    #[test]
    fn test_no_hits() {
        assert_eq!(format_results(&[]), "No results found.");
    }

    #[test]
    fn test_single_hit() {
        assert_eq!(
            format_results(&[hit(1)]),
            "1. Title 1\nhttps://example.com/1\nDescription 1"
        );
    }

    #[test]
    fn test_caps_at_five_hits() {
        let hits: Vec<SearchHit> = (1..=7).map(hit).collect();
        let digest = format_results(&hits);

        let entries: Vec<&str> = digest.split("\n\n").collect();
        assert_eq!(entries.len(), 5);
        for (i, entry) in entries.iter().enumerate() {
            assert!(entry.starts_with(&format!("{}. Title {}", i + 1, i + 1)));
        }
        assert!(!digest.contains("Title 6"));
    }

    #[test]
    fn test_extra_snippets_capped_at_two() {
        let mut h = hit(1);
        h.extra_snippets = Some(vec!["one".into(), "two".into(), "three".into()]);

        assert_eq!(
            format_results(&[h]),
            "1. Title 1\nhttps://example.com/1\nDescription 1\n\nExtra snippets:\n• one\n• two"
        );
    }

    #[test]
    fn test_empty_snippet_list_adds_nothing() {
        let mut h = hit(2);
        h.extra_snippets = Some(Vec::new());
        assert!(!format_results(&[h]).contains("Extra snippets"));
    }

    #[test]
    fn test_hits_separated_by_blank_line() {
        let digest = format_results(&[hit(1), hit(2)]);
        assert_eq!(
            digest,
            "1. Title 1\nhttps://example.com/1\nDescription 1\n\n2. Title 2\nhttps://example.com/2\nDescription 2"
        );
    }
}
