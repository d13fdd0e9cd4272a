//! Asana task-search source
//!
//! Talks to `GET /workspaces/{workspace}/tasks/search` and converts each
//! task into an [`Item`]. The source only classifies responses; retry policy
//! lives in [`PagedFetcher`](crate::PagedFetcher).
//!
//! # Examples
//!
//! ```no_run
//! use tasksift_fetch::{AsanaSource, FetchConfig, PagedFetcher};
//!
//! # fn example() -> Result<(), tasksift_fetch::FetchError> {
//! let source = AsanaSource::new("1234567890", "personal-access-token", &FetchConfig::default())?;
//! let fetcher = PagedFetcher::new(source, FetchConfig::default());
//! # Ok(())
//! # }
//! ```

use crate::config::FetchConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tasksift_domain::traits::ItemSource;
use tasksift_domain::{Continuation, Item, SearchPage, SearchRequest, SourceResponse};
use tracing::debug;

/// Default Asana API base URL
pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";

/// Fields requested for every task
pub const DEFAULT_OPT_FIELDS: &[&str] = &[
    "name",
    "assignee.name",
    "assignee.gid",
    "due_on",
    "completed",
    "projects.name",
    "parent.name",
    "gid",
    "permalink_url",
    "notes",
    "is_subtask",
];

/// Asana search API source
pub struct AsanaSource {
    base_url: String,
    workspace: String,
    token: String,
    opt_fields: String,
    client: reqwest::Client,
}

/// Search response envelope
#[derive(Deserialize)]
struct SearchBody {
    #[serde(default)]
    data: Vec<Map<String, Value>>,
    #[serde(default)]
    next_page: Option<NextPage>,
}

#[derive(Deserialize)]
struct NextPage {
    #[serde(default)]
    offset: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

impl AsanaSource {
    /// Create a source for `workspace` against the public Asana API
    pub fn new(
        workspace: impl Into<String>,
        token: impl Into<String>,
        config: &FetchConfig,
    ) -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL, workspace, token, config)
    }

    /// Create a source against a custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        workspace: impl Into<String>,
        token: impl Into<String>,
        config: &FetchConfig,
    ) -> Result<Self, FetchError> {
        let workspace = workspace.into();
        if workspace.trim().is_empty() {
            return Err(FetchError::Config("workspace id is required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FetchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            workspace,
            token: token.into(),
            opt_fields: DEFAULT_OPT_FIELDS.join(","),
            client,
        })
    }

    /// Override the requested task fields
    pub fn with_opt_fields(mut self, fields: &[&str]) -> Self {
        self.opt_fields = fields.join(",");
        self
    }

    fn search_url(&self) -> String {
        format!("{}/workspaces/{}/tasks/search", self.base_url, self.workspace)
    }

    fn query_params(&self, request: &SearchRequest) -> Vec<(&'static str, String)> {
        let query = &request.query;
        let mut params = vec![
            ("due_on", query.day.to_string()),
            ("sort_by", request.sort.field().to_string()),
            ("sort_ascending", request.sort.ascending().to_string()),
            ("limit", request.page_size.to_string()),
            ("opt_fields", self.opt_fields.clone()),
        ];
        if let Some(owner) = query.owner.as_ref().filter(|o| !o.is_empty()) {
            params.push(("assignee.any", owner.clone()));
        }
        if let Some(is_subunit) = query.is_subunit {
            params.push(("is_subtask", is_subunit.to_string()));
        }
        if let Some(Continuation::Offset(offset)) = &request.continuation {
            params.push(("offset", offset.clone()));
        }
        params
    }

    async fn classify(&self, response: Response) -> SourceResponse {
        let status = response.status();

        if status.is_success() {
            return match response.json::<SearchBody>().await {
                Ok(body) => SourceResponse::Page(body.into_page()),
                Err(e) => SourceResponse::Rejected {
                    status: status.as_u16(),
                    message: format!("Failed to parse search response: {}", e),
                },
            };
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return SourceResponse::RateLimited { retry_after };
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status.is_server_error() {
            SourceResponse::ServerError {
                status: status.as_u16(),
                message,
            }
        } else {
            SourceResponse::Rejected {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl ItemSource for AsanaSource {
    async fn search(&self, request: &SearchRequest) -> SourceResponse {
        let builder = match &request.continuation {
            Some(Continuation::Uri(uri)) => self.client.get(uri),
            _ => self
                .client
                .get(self.search_url())
                .query(&self.query_params(request)),
        };

        debug!("Searching tasks for {}", request.query);

        match builder
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => self.classify(response).await,
            Err(e) => SourceResponse::Transport(format!("Request failed: {}", e)),
        }
    }
}

impl SearchBody {
    fn into_page(self) -> SearchPage {
        let items = self.data.into_iter().filter_map(item_from_task).collect();
        let next = self.next_page.and_then(|next| {
            next.uri
                .filter(|u| !u.is_empty())
                .map(Continuation::Uri)
                .or_else(|| next.offset.filter(|o| !o.is_empty()).map(Continuation::Offset))
        });
        SearchPage { items, next }
    }
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds
fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Convert one Asana task object into an Item
///
/// Tasks without a `gid` are dropped. Fields the core does not model stay in
/// `attributes`.
pub fn item_from_task(mut task: Map<String, Value>) -> Option<Item> {
    let id = match task.remove("gid")? {
        Value::String(s) if !s.is_empty() => s,
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let title = task
        .remove("name")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let owner = task
        .get("assignee")
        .and_then(|a| a.get("name").or_else(|| a.get("gid")))
        .and_then(Value::as_str)
        .map(str::to_string);

    let due = task
        .remove("due_on")
        .and_then(|v| v.as_str().and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()));

    let is_subunit = match task.remove("is_subtask") {
        Some(Value::Bool(flag)) => flag,
        _ => task.get("parent").is_some_and(|p| !p.is_null()),
    };

    Some(Item {
        id,
        title,
        owner,
        due,
        is_subunit,
        attributes: task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tasksift_domain::FetchQuery;

    fn task(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_item_from_task() {
        let item = item_from_task(task(json!({
            "gid": "1201",
            "name": "Writer: Acme lead story",
            "assignee": {"gid": "99", "name": "Julia"},
            "due_on": "2025-05-06",
            "is_subtask": true,
            "permalink_url": "https://app.asana.com/0/1/1201"
        })))
        .unwrap();

        assert_eq!(item.id, "1201");
        assert_eq!(item.title, "Writer: Acme lead story");
        assert_eq!(item.owner.as_deref(), Some("Julia"));
        assert_eq!(item.due, NaiveDate::from_ymd_opt(2025, 5, 6));
        assert!(item.is_subunit);
        assert_eq!(item.attribute_str("permalink_url"), Some("https://app.asana.com/0/1/1201"));
        assert!(item.attributes.contains_key("assignee"));
    }

    #[test]
    fn test_item_from_task_infers_subunit_from_parent() {
        let item = item_from_task(task(json!({
            "gid": "5",
            "name": "Editor: review",
            "parent": {"name": "Acme | Digest runs 5/1"}
        })))
        .unwrap();
        assert!(item.is_subunit);

        let top = item_from_task(task(json!({"gid": "6", "name": "x", "parent": null}))).unwrap();
        assert!(!top.is_subunit);
    }

    #[test]
    fn test_item_without_gid_dropped() {
        assert!(item_from_task(task(json!({"name": "orphan"}))).is_none());
        assert!(item_from_task(task(json!({"gid": "", "name": "blank"}))).is_none());
    }

    #[test]
    fn test_next_page_prefers_uri() {
        let body: SearchBody = serde_json::from_value(json!({
            "data": [],
            "next_page": {"offset": "abc", "uri": "https://app.asana.com/api/1.0/x?offset=abc"}
        }))
        .unwrap();
        assert_eq!(
            body.into_page().next,
            Some(Continuation::Uri("https://app.asana.com/api/1.0/x?offset=abc".to_string()))
        );

        let body: SearchBody =
            serde_json::from_value(json!({"data": [], "next_page": {"offset": "abc"}})).unwrap();
        assert_eq!(body.into_page().next, Some(Continuation::Offset("abc".to_string())));

        let body: SearchBody = serde_json::from_value(json!({"data": [], "next_page": null})).unwrap();
        assert_eq!(body.into_page().next, None);
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_query_params() {
        let source = AsanaSource::new("42", "token", &FetchConfig::default()).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        let request = SearchRequest {
            query: FetchQuery::for_day(day).with_owner("777", "Dalton").with_subunit(false),
            sort: Default::default(),
            page_size: 100,
            continuation: Some(Continuation::Offset("tok".to_string())),
        };

        let params = source.query_params(&request);
        let get = |k: &str| params.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());

        assert_eq!(get("due_on"), Some("2025-05-05"));
        assert_eq!(get("sort_by"), Some("due_date"));
        assert_eq!(get("sort_ascending"), Some("true"));
        assert_eq!(get("limit"), Some("100"));
        assert_eq!(get("assignee.any"), Some("777"));
        assert_eq!(get("is_subtask"), Some("false"));
        assert_eq!(get("offset"), Some("tok"));
    }

    #[test]
    fn test_empty_workspace_rejected() {
        assert!(matches!(
            AsanaSource::new("  ", "token", &FetchConfig::default()),
            Err(FetchError::Config(_))
        ));
    }
}
