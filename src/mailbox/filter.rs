//! Date range to OData `$filter` translation

use super::api::MessageQuery;
use crate::source::{DateRange, Paging};
use chrono::{DateTime, Utc};

/// Field filtered on when listing messages.
pub const RECEIVED_FIELD: &str = "receivedDateTime";

const FILTER_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Filter clauses for `range` on `field`, one per present bound.
///
/// Both comparisons are strict: `gt` for the lower bound and `lt` for
/// the upper bound.
#[must_use]
pub fn build_date_filter(range: &DateRange, field: &str) -> Vec<String> {
    let mut clauses = Vec::with_capacity(2);
    if let Some(from) = range.from {
        clauses.push(format!("{field} gt {}", format_time(from)));
    }
    if let Some(to) = range.to {
        clauses.push(format!("{field} lt {}", format_time(to)));
    }
    clauses
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format(FILTER_TIME_FORMAT).to_string()
}

impl MessageQuery {
    /// Query for one page of messages received inside `range`.
    ///
    /// No filter is attached when the range has no bounds.
    #[must_use]
    pub fn received(range: Option<&DateRange>, paging: Option<Paging>) -> Self {
        let clauses = range
            .map(|range| build_date_filter(range, RECEIVED_FIELD))
            .unwrap_or_default();

        Self {
            filter: (!clauses.is_empty()).then(|| clauses.join(" and ")),
            skip: paging.map(|p| p.skip()),
            top: paging.map(|p| p.take()),
        }
    }

    /// Smallest listing that still exercises the credentials.
    #[must_use]
    pub const fn probe() -> Self {
        Self {
            filter: None,
            skip: None,
            top: Some(1),
        }
    }
}
