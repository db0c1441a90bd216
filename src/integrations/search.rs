//! DuckDuckGo instant-answer search

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

const DEFAULT_BASE_URL: &str = "https://api.duckduckgo.com/";
const SEARCH_PAGE_URL: &str = "https://duckduckgo.com/";
const TITLE_PREVIEW_CHARS: usize = 100;

/// Default and maximum number of results
pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 25;

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: String,
    pub relevance_score: f64,
}

/// DuckDuckGo client (no API key)
#[derive(Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for SearchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Search for `query`, returning at most `limit` results
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PulseError::InvalidInput("query is required".to_string()));
        }
        let limit = limit.clamp(1, MAX_LIMIT);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| PulseError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PulseError::Api(format!("Status {}", status)));
        }

        let body = response.text().await?;
        parse_instant_answer(query, &body, limit)
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct InstantAnswer {
    heading: String,
    #[serde(rename = "Abstract")]
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    related_topics: Vec<RelatedTopic>,
}

/// Topic groups (`{"Name": .., "Topics": [..]}`) carry no `Text` and are skipped
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct RelatedTopic {
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: String,
}

fn preview(text: &str) -> String {
    let mut title: String = text.chars().take(TITLE_PREVIEW_CHARS).collect();
    title.push_str("...");
    title
}

/// Turn an instant-answer body into results, falling back to a single link
/// to the search page when nothing matched.
pub fn parse_instant_answer(query: &str, body: &str, limit: usize) -> Result<Vec<SearchResult>> {
    let answer: InstantAnswer = serde_json::from_str(body)?;
    let mut results = Vec::new();

    if !answer.abstract_text.is_empty() {
        results.push(SearchResult {
            title: if answer.heading.is_empty() {
                query.to_string()
            } else {
                answer.heading.clone()
            },
            snippet: answer.abstract_text.clone(),
            url: answer.abstract_url.clone(),
            source: "DuckDuckGo Abstract".to_string(),
            relevance_score: 1.0,
        });
    }

    for topic in answer.related_topics {
        if results.len() >= limit {
            break;
        }
        let Some(text) = topic.text else { continue };
        results.push(SearchResult {
            title: preview(&text),
            snippet: text,
            url: topic.first_url,
            source: "DuckDuckGo Related".to_string(),
            relevance_score: 0.8,
        });
    }
    results.truncate(limit);

    if results.is_empty() {
        let url = reqwest::Url::parse_with_params(SEARCH_PAGE_URL, &[("q", query)])
            .map_err(|e| PulseError::Internal(e.to_string()))?;
        results.push(SearchResult {
            title: format!("Search: {}", query),
            snippet: format!("No instant answer found for '{}'.", query),
            url: url.to_string(),
            source: "DuckDuckGo".to_string(),
            relevance_score: 0.5,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "Heading": "Rust (programming language)",
        "Abstract": "Rust is a general-purpose programming language.",
        "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
        "RelatedTopics": [
            {"Text": "Cargo - the Rust package manager", "FirstURL": "https://duckduckgo.com/Cargo"},
            {"Name": "See also", "Topics": [{"Text": "nested", "FirstURL": "x"}]},
            {"Text": "Ferris - the unofficial mascot", "FirstURL": "https://duckduckgo.com/Ferris"},
            {"Text": "rustc - the compiler", "FirstURL": "https://duckduckgo.com/rustc"}
        ]
    }"#;

    #[test]
    fn test_abstract_then_related() {
        let results = parse_instant_answer("rust", BODY, 5).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].title, "Rust (programming language)");
        assert_eq!(results[0].source, "DuckDuckGo Abstract");
        assert_eq!(results[1].snippet, "Cargo - the Rust package manager");
        assert_eq!(results[1].title, "Cargo - the Rust package manager...");
        assert_eq!(results[2].url, "https://duckduckgo.com/Ferris");
    }

    #[test]
    fn test_limit_applies_to_all_results() {
        let results = parse_instant_answer("rust", BODY, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].relevance_score, 0.8);
    }

    #[test]
    fn test_fallback_link_when_nothing_matches() {
        let results = parse_instant_answer("zzqx fjord", r#"{"Abstract": ""}"#, 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://duckduckgo.com/?q=zzqx+fjord");
        assert_eq!(results[0].relevance_score, 0.5);
    }

    #[test]
    fn test_long_titles_are_cut() {
        let text = "x".repeat(250);
        let body = format!(r#"{{"RelatedTopics": [{{"Text": "{}", "FirstURL": ""}}]}}"#, text);
        let results = parse_instant_answer("q", &body, 5).unwrap();
        assert_eq!(results[0].title.chars().count(), TITLE_PREVIEW_CHARS + 3);
    }
}
