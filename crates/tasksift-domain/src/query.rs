//! Fetch dimensions and the request/response shapes of the item source

use crate::Item;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One fetch dimension: a day, an owner identity and a subunit flag.
///
/// `None` for `owner` or `is_subunit` leaves that filter off the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchQuery {
    /// Due date to match
    pub day: NaiveDate,

    /// Owner identity as understood by the source (e.g. a user gid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Friendly label for the owner, used for annotation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_label: Option<String>,

    /// Restrict to subunits (`Some(true)`) or parents (`Some(false)`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_subunit: Option<bool>,
}

impl FetchQuery {
    /// Query for every item due on `day`
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            day,
            owner: None,
            owner_label: None,
            is_subunit: None,
        }
    }

    /// Restrict to one owner
    pub fn with_owner(mut self, owner: impl Into<String>, label: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self.owner_label = Some(label.into());
        self
    }

    /// Restrict by subunit flag
    pub fn with_subunit(mut self, is_subunit: bool) -> Self {
        self.is_subunit = Some(is_subunit);
        self
    }
}

impl fmt::Display for FetchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day={}", self.day)?;
        if let Some(label) = self.owner_label.as_ref().or(self.owner.as_ref()) {
            write!(f, " owner={}", label)?;
        }
        if let Some(sub) = self.is_subunit {
            write!(f, " subunit={}", sub)?;
        }
        Ok(())
    }
}

/// Deterministic ordering requested from the source so pagination is stable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Due date, ascending
    #[default]
    DueDateAscending,
    /// Due date, descending
    DueDateDescending,
}

impl SortOrder {
    /// Field the source sorts by
    pub fn field(&self) -> &'static str {
        "due_date"
    }

    /// Whether the sort is ascending
    pub fn ascending(&self) -> bool {
        matches!(self, SortOrder::DueDateAscending)
    }
}

/// Continuation token returned with a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Continuation {
    /// Opaque URI to request verbatim
    Uri(String),
    /// Offset token to add to the original request
    Offset(String),
}

/// A single page request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Filter
    pub query: FetchQuery,
    /// Sort order
    pub sort: SortOrder,
    /// Page size cap
    pub page_size: u32,
    /// Where to resume, `None` for the first page
    pub continuation: Option<Continuation>,
}

/// A successful page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    /// Items on this page
    pub items: Vec<Item>,
    /// Continuation for the next page, if any
    pub next: Option<Continuation>,
}

/// Outcome of one page request, as classified by the source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResponse {
    /// 2xx with a parsed page
    Page(SearchPage),

    /// 429, with the server-advertised delay if one was sent
    RateLimited {
        /// Advisory delay
        retry_after: Option<Duration>,
    },

    /// 5xx
    ServerError {
        /// HTTP status
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Any other non-success status (permanent)
    Rejected {
        /// HTTP status
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The request never produced a response (connect/read failure)
    Transport(String),
}
