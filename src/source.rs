use std::error::Error as StdError;

use async_trait::async_trait;

mod http;

pub use self::http::{HttpSource, HttpSourceError};

/// One entry from the site's "newest proposals" search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub title: Option<String>,
}

/// A fetched detail page. `url` is the public link to the proposal.
#[derive(Debug, Clone)]
pub struct DetailPage {
    pub url: String,
    pub body: String,
}

#[async_trait]
pub trait ProposalSource: Send + Sync {
    type Error: StdError + Send + Sync + 'static;

    fn name(&self) -> String;
    /// The `limit` newest proposals, in the order the site returns them.
    async fn search(&self, limit: usize) -> Result<Vec<SearchHit>, Self::Error>;
    async fn fetch(&self, hit: &SearchHit) -> Result<DetailPage, Self::Error>;
}
