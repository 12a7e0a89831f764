//! The `MMYYYY` key under which bills are stored.

use crate::model::Month;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifies the bill for one month: the two-digit month number followed by the year, with no
/// separator. For example July 2024 is `072024`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    /// Builds a key from a month and a year. The year is used as given; it is not checked to be
    /// four digits.
    pub fn new(month: Month, year: &str) -> Self {
        Self(format!("{:02}{}", month.number(), year))
    }

    /// The key for the month that `date` falls in.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%m%Y").to_string())
    }

    /// Extracts the year portion (characters 2..6) of a stored key. Returns `None` when the key is
    /// too short to contain one.
    pub fn year_of(key: &str) -> Option<&str> {
        key.get(2..6)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(value: NaiveDate) -> Self {
        DateKey::from_date(value)
    }
}

impl AsRef<str> for DateKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formats the date string shown on a bill, e.g. `05 July 2024`.
pub(crate) fn bill_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}
