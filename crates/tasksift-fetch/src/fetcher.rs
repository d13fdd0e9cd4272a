//! Paginated fetching with rate-limit and transient-error retry

use crate::config::FetchConfig;
use crate::error::FetchError;
use std::collections::HashSet;
use std::sync::Arc;
use tasksift_domain::traits::ItemSource;
use tasksift_domain::{FetchQuery, Item, SearchPage, SearchRequest, SourceResponse};
use tracing::{debug, info, warn};

/// Retrieves every item matching a query from a paginated source.
///
/// Each page gets its own attempt budget. Rate-limit responses wait the
/// advertised delay, 5xx and transport failures back off exponentially, and
/// any other non-success status fails the query immediately.
pub struct PagedFetcher<S> {
    source: Arc<S>,
    config: FetchConfig,
}

impl<S> Clone for PagedFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            config: self.config.clone(),
        }
    }
}

impl<S: ItemSource> PagedFetcher<S> {
    /// Create a new fetcher over `source`
    pub fn new(source: S, config: FetchConfig) -> Self {
        Self::from_arc(Arc::new(source), config)
    }

    /// Create a fetcher sharing an existing source
    pub fn from_arc(source: Arc<S>, config: FetchConfig) -> Self {
        Self { source, config }
    }

    /// The active configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch all pages for `query`
    ///
    /// Items repeated across pages (the result set shifting under
    /// pagination) are kept once, at their first position.
    pub async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Item>, FetchError> {
        let mut request = SearchRequest {
            query: query.clone(),
            sort: self.config.sort,
            page_size: self.config.page_size,
            continuation: None,
        };

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(&request).await?;
            pages += 1;

            let page_len = page.items.len();
            let mut repeated = 0usize;
            for item in page.items {
                if item.has_identity() && !seen.insert(item.id.clone()) {
                    repeated += 1;
                    continue;
                }
                items.push(item);
            }

            info!(
                "Fetched {} page {}: {} items (total {})",
                query,
                pages,
                page_len,
                items.len()
            );
            if repeated > 0 {
                debug!("Skipped {} items already seen on earlier pages", repeated);
            }

            match page.next {
                Some(next) if request.continuation.as_ref() == Some(&next) => {
                    warn!("Source repeated continuation {:?} for {}, stopping", next, query);
                    break;
                }
                Some(next) => {
                    request.continuation = Some(next);
                    tokio::time::sleep(self.config.page_pacing()).await;
                }
                None => break,
            }
        }

        Ok(items)
    }

    /// Request one page, retrying within the attempt budget
    async fn fetch_page(&self, request: &SearchRequest) -> Result<SearchPage, FetchError> {
        let mut backoff = self.config.initial_backoff();
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let (delay, failure) = match self.source.search(request).await {
                SourceResponse::Page(page) => return Ok(page),
                SourceResponse::Rejected { status, message } => {
                    return Err(FetchError::Remote {
                        query: request.query.to_string(),
                        status,
                        message,
                    });
                }
                SourceResponse::RateLimited { retry_after } => (
                    self.config.rate_limit_delay(retry_after),
                    "rate limited (HTTP 429)".to_string(),
                ),
                SourceResponse::ServerError { status, message } => {
                    let delay = backoff;
                    backoff = (backoff * 2).min(self.config.max_backoff());
                    (delay, format!("HTTP {}: {}", status, message))
                }
                SourceResponse::Transport(message) => {
                    let delay = backoff;
                    backoff = (backoff * 2).min(self.config.max_backoff());
                    (delay, format!("transport failure: {}", message))
                }
            };

            if attempts >= self.config.max_attempts {
                return Err(FetchError::RetriesExhausted {
                    query: request.query.to_string(),
                    attempts,
                    last: failure,
                });
            }

            warn!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempts, self.config.max_attempts, request.query, failure, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
