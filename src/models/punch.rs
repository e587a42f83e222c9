//! Raw clock-in/clock-out records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One clock-in/out pair for a user on a calendar day.
///
/// A missing timestamp means the user did not punch on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchRecord {
    pub user_id: String,
    pub username: String,
    pub firstname: String,
    /// Local calendar day the punches belong to.
    pub day: NaiveDate,
    pub on_work: Option<DateTime<Utc>>,
    pub off_work: Option<DateTime<Utc>>,
}

impl PunchRecord {
    /// Name shown on reports: username, falling back to first name.
    pub fn display_name(&self) -> &str {
        let username = self.username.trim();
        if username.is_empty() {
            self.firstname.trim()
        } else {
            username
        }
    }

    /// At least one of the two punches is absent.
    pub fn has_missing_punch(&self) -> bool {
        self.on_work.is_none() || self.off_work.is_none()
    }
}

/// Treat zero-valued timestamps from storage as "no punch".
pub fn normalize_punch(ts: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    ts.filter(|t| t.timestamp() > 0)
}
