//! Types that represent the core data model, such as `BillingRecord` and `Month`.
mod bill;
mod date_key;
mod month;

pub use bill::{BillingRecord, Reading, DEFAULT_PER_UNIT_RATE};
pub use date_key::DateKey;
pub use month::Month;

use std::collections::BTreeMap;

/// All stored bills, keyed by the `MMYYYY` date key. This is the shape of `database.json`.
pub type Bills = BTreeMap<String, BillingRecord>;
