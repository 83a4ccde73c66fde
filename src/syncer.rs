use std::{collections::HashSet, time::Duration};

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    error::SyncError,
    extract::{Extractor, Proposal},
    ledger::{self, Ledger},
    source::ProposalSource,
    store::ProposalStore,
};

mod statistics;

pub use statistics::Statistics;

pub struct Syncer {
    store: ProposalStore,
    ledger: Ledger,
    extractor: Extractor,
    limit: usize,
    delay: Duration,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Number of newest proposals to ask the search for.
    pub limit: usize,
    /// Sleep before each detail request.
    pub delay: Duration,
}

impl Syncer {
    pub fn new(
        store: ProposalStore,
        ledger: Ledger,
        extractor: Extractor,
        SyncOptions { limit, delay }: SyncOptions,
    ) -> Self {
        Self {
            store,
            ledger,
            extractor,
            limit,
            delay,
        }
    }

    /// Records every proposal among the newest `limit` that is not in the store yet.
    ///
    /// Nothing is written until all detail pages have been fetched and
    /// extracted, so a failed request leaves the store and ledger as they were.
    /// Cancelling `token` stops further requests; what was already fetched is
    /// still recorded.
    pub async fn run<S>(&self, source: &S, token: CancellationToken) -> Result<Statistics, SyncError>
    where
        S: ProposalSource + ?Sized,
    {
        let name = source.name();
        tracing::info!("running sync against '{}'", name);
        let starting_time = Instant::now();
        let mut stats = Statistics::default();

        let source_err = |err: S::Error| SyncError::Source {
            name: name.clone(),
            source: Box::new(err),
        };

        let hits = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!("syncer: cancelled before search");
                return Ok(stats);
            }
            hits = source.search(self.limit) => hits.map_err(source_err)?,
        };
        stats.num_listed = hits.len();
        tracing::info!(num_hits = hits.len(), "search returned");

        let mut seen = HashSet::new();
        let mut fetched: Vec<Proposal> = Vec::new();
        for hit in hits {
            if !seen.insert(hit.id.clone()) {
                stats.num_duplicates += 1;
                tracing::debug!(id = hit.id, "duplicate hit in search result");
                continue;
            }
            if self.store.contains(&hit.id)? {
                stats.num_known += 1;
                tracing::debug!(id = hit.id, "already recorded");
                continue;
            }

            let page = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!("syncer: cancelled, stopping fetches");
                    break;
                }
                page = async {
                    sleep(self.delay).await;
                    source.fetch(&hit).await
                } => page.map_err(source_err)?,
            };
            stats.num_fetched += 1;

            let proposal = self
                .extractor
                .extract(&hit, &page)
                .map_err(|source| SyncError::Extract {
                    id: hit.id.clone(),
                    source,
                })?;
            fetched.push(proposal);
        }

        ledger::sort_by_approval(&mut fetched);
        for proposal in &fetched {
            self.store.save(proposal)?;
            self.ledger
                .append(proposal)
                .map_err(|source| SyncError::Ledger {
                    path: self.ledger.path().to_path_buf(),
                    source,
                })?;
            stats.num_recorded += 1;
            tracing::info!(id = proposal.id, title = proposal.title, "recorded");
        }

        stats.write_to_log(starting_time.elapsed());
        Ok(stats)
    }
}
