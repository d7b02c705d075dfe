//! Wall-clock helpers.

use chrono::{DateTime, Utc};

/// Current UTC time, as stamped on execution records.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
