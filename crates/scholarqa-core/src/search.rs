//! Search seam and the retrying, cache-populating client around it.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::cache::PaperCache;
use crate::paper::PaperRecord;
use crate::retry::{with_retry, RetryPolicy};
use crate::Result;

/// One attempt against an external paper search provider.
///
/// Implementations map raw provider results into [`PaperRecord`]s, in the
/// provider's relevance order, and surface any transport or parse fault as
/// an error. Retry is the caller's concern.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>>;
}

/// Retrying search client that records every retrieved paper in the cache.
pub struct SearchClient<S> {
    service: S,
    policy: RetryPolicy,
    cache: PaperCache,
}

impl<S: SearchService> SearchClient<S> {
    pub fn new(service: S, policy: RetryPolicy, cache: PaperCache) -> Self {
        Self {
            service,
            policy,
            cache,
        }
    }

    /// Search for papers, retrying faults under the shared policy.
    ///
    /// Every returned record with an identifier is inserted into the cache,
    /// overwriting prior entries for that identifier. The result sequence is
    /// returned as-is; it is not deduplicated against earlier searches.
    #[instrument(skip(self))]
    pub async fn search(&mut self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>> {
        let service = &self.service;
        let papers = with_retry(&self.policy, "search", || {
            service.search(query, max_results)
        })
        .await?;
        debug!("Found {} papers", papers.len());
        for paper in &papers {
            self.cache.insert(paper.clone());
        }
        Ok(papers)
    }

    pub fn cache(&self) -> &PaperCache {
        &self.cache
    }
}
