//! Command splitting and the `/websearch` flag grammar.

use thiserror::Error;

/// Result count requested from Brave when `--count` is absent.
pub const DEFAULT_COUNT: &str = "5";

pub const USAGE: &str = "Usage:\n\
/websearch <query> [options]\n\
\n\
Options:\n\
--fresh pd|pw|pm|py\n\
--country IN|US|DE\n\
--lang en|de|fr\n\
--snippets\n\
--count <1-20>\n\
--page <number>\n\
\n\
Example:\n\
/websearch ai trends --fresh pw --country IN --snippets";

/// A bot command split out of a message, e.g. `/websearch@mybot rust news`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub name: &'a str,
    pub args: Vec<&'a str>,
}

/// Split a `/command` message into its name and whitespace-separated arguments.
///
/// Returns `None` for free text. The `@botname` suffix Telegram adds in groups
/// is stripped from the name.
pub fn parse_command(text: &str) -> Option<Command<'_>> {
    let mut tokens = text.split_whitespace();
    let head = tokens.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some(Command {
        name,
        args: tokens.collect(),
    })
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchArgsError {
    #[error("no search query given")]
    EmptyQuery,
    #[error("invalid page number '{0}'")]
    InvalidPage(String),
}

/// A parsed `/websearch` request, ready to be turned into Brave query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free text built from every token that is not a flag, in order.
    pub query: String,
    pub freshness: Option<String>,
    pub country: Option<String>,
    pub search_lang: Option<String>,
    pub ui_lang: Option<String>,
    pub extra_snippets: bool,
    /// Passed upstream as typed; Brave rejects out-of-range values itself.
    pub count: String,
    /// Zero-based page cursor.
    pub offset: Option<u64>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            freshness: None,
            country: None,
            search_lang: None,
            ui_lang: None,
            extra_snippets: false,
            count: DEFAULT_COUNT.to_string(),
            offset: None,
        }
    }
}

impl SearchRequest {
    /// Parse command arguments left to right.
    ///
    /// Value flags consume the next token. A value flag with nothing after it
    /// is dropped. Unknown tokens become the query.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, SearchArgsError> {
        let mut request = Self::default();
        let mut query_parts: Vec<&str> = Vec::new();
        let mut tokens = args.iter().map(AsRef::as_ref);

        while let Some(token) = tokens.next() {
            match token {
                "--snippets" => request.extra_snippets = true,
                "--fresh" | "--country" | "--lang" | "--count" | "--page" => {
                    let Some(value) = tokens.next() else {
                        break;
                    };
                    request.apply_flag(token, value)?;
                }
                _ => query_parts.push(token),
            }
        }

        request.query = query_parts.join(" ");
        if request.query.trim().is_empty() {
            return Err(SearchArgsError::EmptyQuery);
        }
        Ok(request)
    }

    fn apply_flag(&mut self, flag: &str, value: &str) -> Result<(), SearchArgsError> {
        match flag {
            "--fresh" => self.freshness = Some(freshness_window(value)),
            "--country" => self.country = Some(value.to_string()),
            "--lang" => {
                self.search_lang = Some(value.to_string());
                self.ui_lang = Some(value.to_string());
            }
            "--count" => self.count = value.to_string(),
            "--page" => {
                let page: i64 = value
                    .parse()
                    .map_err(|_| SearchArgsError::InvalidPage(value.to_string()))?;
                self.offset = Some(page_to_offset(page));
            }
            _ => {}
        }
        Ok(())
    }

    /// Query-string pairs for the Brave web search endpoint.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.query.clone()), ("count", self.count.clone())];
        if let Some(ref freshness) = self.freshness {
            params.push(("freshness", freshness.clone()));
        }
        if let Some(ref country) = self.country {
            params.push(("country", country.clone()));
        }
        if let Some(ref lang) = self.search_lang {
            params.push(("search_lang", lang.clone()));
        }
        if let Some(ref lang) = self.ui_lang {
            params.push(("ui_lang", lang.clone()));
        }
        if self.extra_snippets {
            params.push(("extra_snippets", "true".to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        params
    }
}

/// Map a user-facing freshness value to Brave's window token.
///
/// Unrecognized values (e.g. `2024-01-01to2024-02-01`) are forwarded as-is.
fn freshness_window(value: &str) -> String {
    match value.to_ascii_lowercase().as_str() {
        "pd" | "day" => "pd".to_string(),
        "pw" | "week" => "pw".to_string(),
        "pm" | "month" => "pm".to_string(),
        "py" | "year" => "py".to_string(),
        _ => value.to_string(),
    }
}

/// 1-based page number to zero-based offset, never negative.
fn page_to_offset(page: i64) -> u64 {
    page.saturating_sub(1).max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_tokens_become_query() {
        let req = SearchRequest::parse(&["rust", "async", "runtime"]).unwrap();
        assert_eq!(req.query, "rust async runtime");
        assert_eq!(req.count, "5");
        assert_eq!(req.offset, None);
        assert!(!req.extra_snippets);
    }

    #[test]
    fn test_full_example() {
        let req = SearchRequest::parse(&[
            "ai", "trends", "--fresh", "pw", "--country", "IN", "--snippets",
        ])
        .unwrap();
        assert_eq!(req.query, "ai trends");
        assert_eq!(req.freshness.as_deref(), Some("pw"));
        assert_eq!(req.country.as_deref(), Some("IN"));
        assert!(req.extra_snippets);
        assert_eq!(req.count, "5");
    }

    #[test]
    fn test_lang_sets_both_languages() {
        let req = SearchRequest::parse(&["bonjour", "--lang", "fr"]).unwrap();
        assert_eq!(req.search_lang.as_deref(), Some("fr"));
        assert_eq!(req.ui_lang.as_deref(), Some("fr"));
    }

    #[test]
    fn test_page_to_offset() {
        for (page, offset) in [("1", 0), ("2", 1), ("10", 9), ("0", 0), ("-3", 0)] {
            let req = SearchRequest::parse(&["q", "--page", page]).unwrap();
            assert_eq!(req.offset, Some(offset), "page {page}");
        }
    }

    #[test]
    fn test_non_numeric_page_rejected() {
        let err = SearchRequest::parse(&["q", "--page", "two"]).unwrap_err();
        assert_eq!(err, SearchArgsError::InvalidPage("two".to_string()));
    }

    #[test]
    fn test_trailing_value_flag_dropped() {
        let req = SearchRequest::parse(&["rust", "--country"]).unwrap();
        assert_eq!(req.query, "rust");
        assert_eq!(req.country, None);

        let req = SearchRequest::parse(&["rust", "--page"]).unwrap();
        assert_eq!(req.offset, None);
    }

    #[test]
    fn test_flags_interleaved_with_query() {
        let req = SearchRequest::parse(&["--count", "10", "rust", "--snippets", "news"]).unwrap();
        assert_eq!(req.query, "rust news");
        assert_eq!(req.count, "10");
        assert!(req.extra_snippets);
    }

    #[test]
    fn test_count_is_not_validated() {
        let req = SearchRequest::parse(&["q", "--count", "500"]).unwrap();
        assert_eq!(req.count, "500");
    }

    #[test]
    fn test_empty_query() {
        let empty: [&str; 0] = [];
        assert_eq!(SearchRequest::parse(&empty), Err(SearchArgsError::EmptyQuery));
        assert_eq!(
            SearchRequest::parse(&["--snippets", "--fresh", "pd"]),
            Err(SearchArgsError::EmptyQuery)
        );
    }

    #[test]
    fn test_freshness_aliases() {
        assert_eq!(freshness_window("week"), "pw");
        assert_eq!(freshness_window("PD"), "pd");
        assert_eq!(freshness_window("2024-01-01to2024-02-01"), "2024-01-01to2024-02-01");
    }

    #[test]
    fn test_query_params() {
        let req = SearchRequest::parse(&["ai", "--lang", "de", "--snippets", "--page", "3"]).unwrap();
        let params = req.query_params();
        assert_eq!(
            params,
            vec![
                ("q", "ai".to_string()),
                ("count", "5".to_string()),
                ("search_lang", "de".to_string()),
                ("ui_lang", "de".to_string()),
                ("extra_snippets", "true".to_string()),
                ("offset", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_command() {
        let cmd = parse_command("/websearch@mybot rust  news").unwrap();
        assert_eq!(cmd.name, "websearch");
        assert_eq!(cmd.args, vec!["rust", "news"]);

        let cmd = parse_command("/start").unwrap();
        assert_eq!(cmd.name, "start");
        assert!(cmd.args.is_empty());

        assert_eq!(parse_command("hello /start"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command(""), None);
    }
}
