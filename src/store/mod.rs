//! Durable storage for the last meter reading and the bills.
//!
//! The service only talks to the [`Store`] trait. [`FileStore`] implements it on top of the two
//! flat files used by earlier versions of this program, so existing data can be used in place.

mod file;
#[cfg(test)]
mod memory;

pub use file::{FileStore, StorePaths};
#[cfg(test)]
pub(crate) use memory::MemoryStore;

use crate::model::{Bills, BillingRecord, DateKey};
use crate::Result;

/// Storage used by the billing service.
///
/// Implementations do not need to serialize access themselves; the service holds a lock around
/// each read-modify-write.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// The most recent meter reading.
    async fn last_reading(&self) -> Result<f64>;

    /// All stored bills.
    async fn bills(&self) -> Result<Bills>;

    /// Persists a submission: `record.current_reading` becomes the last reading and `record` is
    /// stored under `key`, replacing any bill already there.
    ///
    /// The two updates are not atomic together. An error can be returned after the bill was
    /// stored but before the last reading was updated; the error message says so.
    async fn commit(&self, key: &DateKey, record: &BillingRecord) -> Result<()>;
}
