// src/fetch/mod.rs

pub mod cache;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// A remote analytical store: takes SQL text, answers with the result set
/// rendered as CSV. Implementations surface network, auth and malformed-query
/// failures as errors.
pub trait QueryStore {
    fn execute(&self, sql: &str) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
}

/// HTTP-backed [`QueryStore`]: POSTs the query as a JSON body and expects a
/// CSV response.
pub struct HttpQueryStore {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpQueryStore {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("parsing query endpoint {endpoint:?}"))?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key,
        })
    }
}

impl QueryStore for HttpQueryStore {
    async fn execute(&self, sql: &str) -> Result<String> {
        debug!(endpoint = %self.endpoint, bytes = sql.len(), "executing query");
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "text/csv")
            .json(&QueryRequest { sql });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let body = request
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?
            .error_for_status()
            .with_context(|| format!("query rejected by {}", self.endpoint))?
            .text()
            .await
            .with_context(|| format!("reading result body from {}", self.endpoint))?;
        Ok(body)
    }
}
