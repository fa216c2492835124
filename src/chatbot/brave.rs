//! Brave Search API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::chatbot::args::SearchRequest;
use crate::chatbot::search::{SearchError, SearchHit, WebSearch};

const BRAVE_SEARCH_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

pub struct BraveClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Deserialize, Debug, Default)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Deserialize, Debug, Default)]
struct WebResults {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl BraveClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            endpoint: BRAVE_SEARCH_API_URL.to_string(),
            client,
        })
    }
}

#[async_trait]
impl WebSearch for BraveClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        info!("🔍 Web search: {:?} (count={})", request.query, request.count);

        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&request.query_params())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!("Brave response status: {status}");

        if !status.is_success() {
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let hits = parse_response(&body)?;
        info!("🔍 {} results", hits.len());
        Ok(hits)
    }
}

/// Pull `web.results` out of a Brave response body. A missing section is an empty list.
fn parse_response(body: &str) -> Result<Vec<SearchHit>, SearchError> {
    let parsed: SearchResponse = serde_json::from_str(body)?;
    Ok(parsed.web.map(|w| w.results).unwrap_or_default())
}
