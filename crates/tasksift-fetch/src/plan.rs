//! Fetch plans: which (day × owner × subunit) dimensions to query

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tasksift_domain::FetchQuery;

/// An owner the plan fans out over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Friendly label used in reports
    pub label: String,
    /// Identity as understood by the source
    pub id: String,
}

impl Owner {
    /// Create an owner
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// Monday..Sunday of the week `offset_weeks` away from the week containing `today`.
///
/// `0` is this week, `1` next week, `-1` last week.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tasksift_fetch::week_bounds;
///
/// let wednesday = NaiveDate::from_ymd_opt(2025, 5, 7).unwrap();
/// let (monday, sunday) = week_bounds(wednesday, 0);
/// assert_eq!(monday, NaiveDate::from_ymd_opt(2025, 5, 5).unwrap());
/// assert_eq!(sunday, NaiveDate::from_ymd_opt(2025, 5, 11).unwrap());
/// ```
pub fn week_bounds(today: NaiveDate, offset_weeks: i64) -> (NaiveDate, NaiveDate) {
    let days_from_monday = i64::from(today.weekday().num_days_from_monday());
    let monday = today - Duration::days(days_from_monday) + Duration::weeks(offset_weeks);
    (monday, monday + Duration::days(6))
}

/// Every day from `start` to `end`, inclusive
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// The set of fetch dimensions for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchPlan {
    /// Owners to query; empty means one unfiltered query per day
    #[serde(default)]
    pub owners: Vec<Owner>,

    /// Subunit flags to query per (day, owner), in merge order
    #[serde(default = "default_subunit_flags")]
    pub subunit_flags: Vec<Option<bool>>,
}

fn default_subunit_flags() -> Vec<Option<bool>> {
    vec![Some(false), Some(true)]
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self {
            owners: Vec::new(),
            subunit_flags: default_subunit_flags(),
        }
    }
}

impl FetchPlan {
    /// Plan over the given owners with parent and subunit queries
    pub fn new(owners: Vec<Owner>) -> Self {
        Self {
            owners,
            ..Default::default()
        }
    }

    /// Queries for every day in `start..=end`.
    ///
    /// Ordered day, then owner, then subunit flag, so that a last-write-wins
    /// merge lets the subunit view of an item replace its parent view.
    pub fn queries(&self, start: NaiveDate, end: NaiveDate) -> Vec<FetchQuery> {
        let flags: &[Option<bool>] = if self.subunit_flags.is_empty() {
            &[None]
        } else {
            &self.subunit_flags
        };

        let mut queries = Vec::new();
        for day in days_inclusive(start, end) {
            let base = FetchQuery::for_day(day);
            let owner_queries: Vec<FetchQuery> = if self.owners.is_empty() {
                vec![base]
            } else {
                self.owners
                    .iter()
                    .map(|o| base.clone().with_owner(o.id.clone(), o.label.clone()))
                    .collect()
            };

            for query in owner_queries {
                for flag in flags {
                    let mut q = query.clone();
                    q.is_subunit = *flag;
                    queries.push(q);
                }
            }
        }
        queries
    }

    /// Queries for the week `offset_weeks` from the week containing `today`
    pub fn week_queries(&self, today: NaiveDate, offset_weeks: i64) -> Vec<FetchQuery> {
        let (monday, sunday) = week_bounds(today, offset_weeks);
        self.queries(monday, sunday)
    }
}
