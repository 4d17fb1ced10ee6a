//! HTTP memory service client
//!
//! `POST {endpoint}` with `{"query": "...", "limit": N}`; the service answers
//! either `{"facts": [...]}` or a bare array of `{fact, age_days, relevance}`.
//! Finished answers go to `POST {record_endpoint}` as
//! `{"query", "response", "content", "category"}` when one is configured.

use async_trait::async_trait;
use council_application::ports::memory_lookup::{MemoryError, MemoryLookup};
use council_domain::MemoryFact;
use serde::{Deserialize, Serialize};

/// Candidate facts requested per search
const SEARCH_LIMIT: usize = 5;

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Serialize)]
struct RecordRequest<'a> {
    query: &'a str,
    response: &'a str,
    /// Episode text in `Q: ...\nA: ...` form
    content: String,
    category: &'static str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Wrapped { facts: Vec<MemoryFact> },
    Bare(Vec<MemoryFact>),
}

pub struct HttpMemoryLookup {
    client: reqwest::Client,
    endpoint: String,
    record_endpoint: Option<String>,
}

impl HttpMemoryLookup {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            record_endpoint: None,
        }
    }

    pub fn with_record_endpoint(mut self, endpoint: Option<&str>) -> Self {
        self.record_endpoint = endpoint.map(str::to_string);
        self
    }
}

#[async_trait]
impl MemoryLookup for HttpMemoryLookup {
    async fn search(&self, query: &str) -> Result<Vec<MemoryFact>, MemoryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SearchRequest {
                query,
                limit: SEARCH_LIMIT,
            })
            .send()
            .await
            .map_err(|e| MemoryError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MemoryError::Unreachable(format!("HTTP {}", status.as_u16())));
        }

        let facts = match response
            .json::<SearchResponse>()
            .await
            .map_err(|e| MemoryError::InvalidResponse(e.to_string()))?
        {
            SearchResponse::Wrapped { facts } | SearchResponse::Bare(facts) => facts,
        };
        Ok(facts)
    }

    async fn record(&self, query: &str, response: &str) -> Result<(), MemoryError> {
        let Some(endpoint) = &self.record_endpoint else {
            return Ok(());
        };
        let reply = self
            .client
            .post(endpoint)
            .json(&RecordRequest {
                query,
                response,
                content: format!("Q: {}\nA: {}", query, response),
                category: "fact",
            })
            .send()
            .await
            .map_err(|e| MemoryError::Unreachable(e.to_string()))?;

        let status = reply.status();
        if !status.is_success() {
            return Err(MemoryError::Unreachable(format!("HTTP {}", status.as_u16())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{closed_port, serve_once};

    const JSON: &str = "application/json";

    #[tokio::test]
    async fn parses_wrapped_facts() {
        let (url, request) = serve_once(
            "200 OK",
            JSON,
            r#"{"facts": [{"fact": "Office closes at 6pm", "age_days": 2.5, "relevance": 0.93}]}"#,
        )
        .await;

        let facts = HttpMemoryLookup::new(&url).search("office hours").await.unwrap();
        assert_eq!(facts, vec![MemoryFact::new("Office closes at 6pm", 2.5, 0.93)]);

        let sent: serde_json::Value =
            serde_json::from_str(&request.await.unwrap().body).unwrap();
        assert_eq!(sent["query"], "office hours");
        assert_eq!(sent["limit"], 5);
    }

    #[tokio::test]
    async fn parses_bare_array() {
        let (url, _) = serve_once("200 OK", JSON, r#"[{"fact": "x", "relevance": 0.5}]"#).await;
        let facts = HttpMemoryLookup::new(&url).search("x").await.unwrap();
        assert_eq!(facts[0].age_days, 0.0);
    }

    #[tokio::test]
    async fn server_error_is_unreachable() {
        let (url, _) = serve_once("503 Service Unavailable", JSON, "{}").await;
        let result = HttpMemoryLookup::new(&url).search("x").await;
        assert!(matches!(result, Err(MemoryError::Unreachable(_))));
    }

    #[tokio::test]
    async fn records_finished_answers() {
        let (url, request) = serve_once("201 Created", JSON, "{}").await;

        HttpMemoryLookup::new("http://unused")
            .with_record_endpoint(Some(&url))
            .record("office hours?", "9 to 6")
            .await
            .unwrap();

        let received = request.await.unwrap();
        assert!(received.request_line.starts_with("POST / "));
        let sent: serde_json::Value = serde_json::from_str(&received.body).unwrap();
        assert_eq!(sent["query"], "office hours?");
        assert_eq!(sent["response"], "9 to 6");
        assert_eq!(sent["content"], "Q: office hours?\nA: 9 to 6");
        assert_eq!(sent["category"], "fact");
    }

    #[tokio::test]
    async fn record_without_endpoint_is_a_no_op() {
        let lookup = HttpMemoryLookup::new(&closed_port().await);
        assert!(lookup.record("q", "a").await.is_ok());
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let result = HttpMemoryLookup::new(&closed_port().await).search("x").await;
        assert!(matches!(result, Err(MemoryError::Unreachable(_))));
    }
}
