use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{DetailPage, ProposalSource, SearchHit};
use crate::config::SiteConfig;

#[derive(Debug, thiserror::Error)]
pub enum HttpSourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("no hit array at '{pointer}' in search response")]
    MissingHits { pointer: String },
    #[error("search hit without a usable '{field}': {hit}")]
    MalformedHit { field: String, hit: String },
}

/// Talks to the petition site over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    search_path: String,
    size_param: String,
    hits_pointer: String,
    id_field: String,
    title_field: String,
    detail_path: String,
}

impl HttpSource {
    pub fn new(site: &SiteConfig) -> Result<Self, HttpSourceError> {
        let client = reqwest::Client::builder()
            .user_agent(site.user_agent.as_str())
            .timeout(Duration::from_secs(site.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: site.base_url.trim_end_matches('/').to_string(),
            search_path: site.search_path.clone(),
            size_param: site.size_param.clone(),
            hits_pointer: site.hits_pointer.clone(),
            id_field: site.id_field.clone(),
            title_field: site.title_field.clone(),
            detail_path: site.detail_path.clone(),
        })
    }

    pub fn search_url(&self, limit: usize) -> String {
        let sep = if self.search_path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}{}={}",
            self.base_url, self.search_path, sep, self.size_param, limit
        )
    }

    pub fn detail_url(&self, id: &str) -> String {
        format!("{}{}", self.base_url, self.detail_path.replace("{id}", id))
    }

    fn parse_hit(&self, hit: &Value) -> Result<SearchHit, HttpSourceError> {
        let id = match hit.get(&self.id_field) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => {
                return Err(HttpSourceError::MalformedHit {
                    field: self.id_field.clone(),
                    hit: hit.to_string(),
                })
            }
        };
        let title = hit
            .get(&self.title_field)
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(SearchHit { id, title })
    }
}

#[async_trait]
impl ProposalSource for HttpSource {
    type Error = HttpSourceError;

    fn name(&self) -> String {
        self.base_url.clone()
    }

    async fn search(&self, limit: usize) -> Result<Vec<SearchHit>, Self::Error> {
        let url = self.search_url(limit);
        tracing::debug!(url, "searching newest proposals");
        let response: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hits = response
            .pointer(&self.hits_pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| HttpSourceError::MissingHits {
                pointer: self.hits_pointer.clone(),
            })?;

        // the size parameter is a request, not a guarantee
        hits.iter()
            .take(limit)
            .map(|hit| self.parse_hit(hit))
            .collect()
    }

    async fn fetch(&self, hit: &SearchHit) -> Result<DetailPage, Self::Error> {
        let url = self.detail_url(&hit.id);
        tracing::debug!(url, "fetching detail page");
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(DetailPage { url, body })
    }
}
