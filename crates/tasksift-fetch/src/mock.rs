//! In-memory item source for deterministic testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tasksift_domain::traits::ItemSource;
use tasksift_domain::{Continuation, FetchQuery, Item, SearchPage, SearchRequest, SourceResponse};
use tokio::time::Instant;

type Rule = (Box<dyn Fn(&FetchQuery) -> bool + Send + Sync>, SourceResponse);

/// Mock item source backed by an in-memory catalog.
///
/// Queries are answered by filtering the catalog on due date, owner and
/// subunit flag, sorting by `(due, id)` and paging by offset. Scripted
/// responses are served first, one per request, and rules let specific
/// queries fail permanently.
///
/// # Examples
///
/// ```
/// use tasksift_fetch::MockSource;
/// use tasksift_domain::Item;
///
/// let source = MockSource::new(vec![Item::new("1", "Draft copy")]);
/// assert_eq!(source.request_count(), 0);
/// ```
#[derive(Clone)]
pub struct MockSource {
    inner: Arc<Inner>,
}

struct Inner {
    catalog: Vec<Item>,
    sorted: bool,
    uri_continuations: bool,
    script: Mutex<VecDeque<SourceResponse>>,
    always: Option<SourceResponse>,
    rules: Vec<Rule>,
    log: Mutex<Vec<(SearchRequest, Instant)>>,
}

impl MockSource {
    /// Create a source serving `catalog`
    pub fn new(catalog: Vec<Item>) -> Self {
        Self {
            inner: Arc::new(Inner {
                catalog,
                sorted: true,
                uri_continuations: false,
                script: Mutex::new(VecDeque::new()),
                always: None,
                rules: Vec::new(),
                log: Mutex::new(Vec::new()),
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut Inner {
        Arc::get_mut(&mut self.inner).expect("MockSource must be configured before it is shared")
    }

    /// Serve the catalog in insertion order instead of sorting it
    pub fn preserve_order(mut self) -> Self {
        self.inner_mut().sorted = false;
        self
    }

    /// Hand out URI continuations instead of offsets
    pub fn with_uri_continuations(mut self) -> Self {
        self.inner_mut().uri_continuations = true;
        self
    }

    /// Queue a response to serve before any catalog page
    pub fn script(self, response: SourceResponse) -> Self {
        self.inner
            .script
            .lock()
            .expect("mock script lock")
            .push_back(response);
        self
    }

    /// Answer every request with `response`
    pub fn always(mut self, response: SourceResponse) -> Self {
        self.inner_mut().always = Some(response);
        self
    }

    /// Answer matching queries with `response`
    pub fn when<F>(mut self, matches: F, response: SourceResponse) -> Self
    where
        F: Fn(&FetchQuery) -> bool + Send + Sync + 'static,
    {
        self.inner_mut().rules.push((Box::new(matches), response));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.log().into_iter().map(|(r, _)| r).collect()
    }

    /// Instants at which requests were received
    pub fn request_times(&self) -> Vec<Instant> {
        self.log().into_iter().map(|(_, t)| t).collect()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.inner.log.lock().expect("mock log lock").len()
    }

    fn log(&self) -> Vec<(SearchRequest, Instant)> {
        self.inner.log.lock().expect("mock log lock").clone()
    }

    fn matching(&self, query: &FetchQuery) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .inner
            .catalog
            .iter()
            .filter(|item| item.due == Some(query.day))
            .filter(|item| query.owner.is_none() || item.owner == query.owner)
            .filter(|item| query.is_subunit.is_none_or(|flag| item.is_subunit == flag))
            .cloned()
            .collect();
        if self.inner.sorted {
            items.sort_by(|a, b| (a.due, &a.id).cmp(&(b.due, &b.id)));
        }
        items
    }

    fn page(&self, request: &SearchRequest) -> SourceResponse {
        let offset = match &request.continuation {
            None => 0,
            Some(Continuation::Offset(o)) => o.parse().unwrap_or(0),
            Some(Continuation::Uri(uri)) => uri
                .rsplit("offset=")
                .next()
                .and_then(|o| o.parse().ok())
                .unwrap_or(0),
        };

        let matching = self.matching(&request.query);
        let end = (offset + request.page_size as usize).min(matching.len());
        let items = matching.get(offset..end).map(<[Item]>::to_vec).unwrap_or_default();

        let next = (end < matching.len()).then(|| {
            if self.inner.uri_continuations {
                Continuation::Uri(format!("mock://tasks/search?offset={}", end))
            } else {
                Continuation::Offset(end.to_string())
            }
        });

        SourceResponse::Page(SearchPage { items, next })
    }
}

#[async_trait]
impl ItemSource for MockSource {
    async fn search(&self, request: &SearchRequest) -> SourceResponse {
        self.inner
            .log
            .lock()
            .expect("mock log lock")
            .push((request.clone(), Instant::now()));

        if let Some(response) = self.inner.script.lock().expect("mock script lock").pop_front() {
            return response;
        }
        if let Some(response) = &self.inner.always {
            return response.clone();
        }
        for (matches, response) in &self.inner.rules {
            if matches(&request.query) {
                return response.clone();
            }
        }
        self.page(request)
    }
}
