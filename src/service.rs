//! The billing record service: submitting readings and looking up past bills.

use crate::error::{ErrorType, IntoResult};
use crate::model::{BillingRecord, DateKey, Month, Reading};
use crate::store::Store;
use crate::Result;
use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The outcome of looking up a bill. A missing bill is an ordinary result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(BillingRecord),
    NotFound,
}

/// Computes and records bills against a [`Store`].
///
/// Submissions are serialized by an internal lock, so two concurrent submissions cannot both
/// read the same last reading. Lookups do not take the lock.
#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn Store>,
    per_unit_rate: f64,
    write_lock: Arc<Mutex<()>>,
}

impl BillingService {
    pub fn new(store: Arc<dyn Store>, per_unit_rate: f64) -> Self {
        Self {
            store,
            per_unit_rate,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn per_unit_rate(&self) -> f64 {
        self.per_unit_rate
    }

    /// Records `reading` as this month's bill and makes it the new last reading. The bill is
    /// always filed under the current local month; an existing bill for this month is replaced.
    pub async fn submit_reading(&self, reading: Reading) -> Result<BillingRecord> {
        self.submit_reading_on(reading, Local::now().date_naive())
            .await
    }

    pub(crate) async fn submit_reading_on(
        &self,
        reading: Reading,
        today: NaiveDate,
    ) -> Result<BillingRecord> {
        let _guard = self.write_lock.lock().await;

        let previous = self.store.last_reading().await?;
        let record = BillingRecord::compute(reading, previous, self.per_unit_rate, today);
        if !record.is_finite() {
            return Err(anyhow!(
                "The reading {} is too large, the bill amounts overflow",
                reading.current
            ))
            .pub_result(ErrorType::Validation);
        }
        if record.unit_consumed < 0.0 {
            warn!(
                "The reading {} is lower than the last reading {}, consumption is negative",
                record.current_reading, record.previous_reading
            );
        }

        let key = DateKey::from_date(today);
        if self.store.bills().await?.contains_key(key.as_str()) {
            info!("Replacing the existing bill for {key}");
        }
        self.store.commit(&key, &record).await?;
        debug!("Stored bill {key}: {record:?}");
        Ok(record)
    }

    /// The distinct years that have at least one bill, in ascending order.
    pub async fn list_years(&self) -> Result<BTreeSet<String>> {
        let bills = self.store.bills().await?;
        Ok(bills
            .keys()
            .filter_map(|key| DateKey::year_of(key))
            .map(str::to_string)
            .collect())
    }

    /// Finds the bill for `month_name` (a full month name such as `"July"`) in `year`. The year is
    /// used as given. An unrecognized month name is a `Validation` error.
    pub async fn lookup(&self, month_name: &str, year: &str) -> Result<Lookup> {
        let month = Month::from_name(month_name).pub_result(ErrorType::Validation)?;
        let key = DateKey::new(month, year);
        let bills = self.store.bills().await?;
        Ok(match bills.get(key.as_str()) {
            Some(record) => Lookup::Found(record.clone()),
            None => {
                debug!("No bill found for {key}");
                Lookup::NotFound
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service(last_reading: f64) -> (Arc<MemoryStore>, BillingService) {
        let store = Arc::new(MemoryStore::new(last_reading));
        let service = BillingService::new(store.clone(), 8.0);
        (store, service)
    }

    fn july(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    #[tokio::test]
    async fn test_submit_example_scenario() {
        let (store, service) = service(120.0);
        let bill = service
            .submit_reading_on(Reading::new(150.0, 50.0, 30.0), july(10))
            .await
            .unwrap();
        assert_eq!(bill.unit_consumed, 30.0);
        assert_eq!(bill.energy_cost, 240.0);
        assert_eq!(bill.total_cost, 270.0);
        assert_eq!(bill.grand_total, 220.0);

        assert_eq!(store.last_reading().await.unwrap(), 150.0);
        let bills = store.bills().await.unwrap();
        let stored = bills.get("072024").unwrap();
        assert_eq!(stored.previous_reading, 120.0);
        assert_eq!(stored.current_reading, 150.0);
    }

    #[tokio::test]
    async fn test_submit_then_lookup_round_trip() {
        let (_, service) = service(120.0);
        let bill = service
            .submit_reading_on(Reading::new(150.0, 50.0, 30.0), july(10))
            .await
            .unwrap();
        let found = service.lookup("July", "2024").await.unwrap();
        assert_eq!(found, Lookup::Found(bill));
        let again = service.lookup("July", "2024").await.unwrap();
        assert_eq!(found, again);
        assert_eq!(
            service.lookup("August", "2024").await.unwrap(),
            Lookup::NotFound
        );
    }

    #[tokio::test]
    async fn test_second_submission_in_month_overwrites() {
        let (store, service) = service(100.0);
        let first = service
            .submit_reading_on(Reading::new(110.0, 0.0, 0.0), july(1))
            .await
            .unwrap();
        let second = service
            .submit_reading_on(Reading::new(110.0, 0.0, 0.0), july(20))
            .await
            .unwrap();
        assert_eq!(second.previous_reading, first.current_reading);
        assert_eq!(second.unit_consumed, 0.0);

        let bills = store.bills().await.unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills.get("072024").unwrap(), &second);
    }

    #[tokio::test]
    async fn test_list_years() {
        let (_, service) = service(0.0);
        assert!(service.list_years().await.unwrap().is_empty());

        for (i, date) in [
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
        ]
        .into_iter()
        .enumerate()
        {
            service
                .submit_reading_on(Reading::new(i as f64, 0.0, 0.0), date)
                .await
                .unwrap();
        }
        let years: Vec<String> = service.list_years().await.unwrap().into_iter().collect();
        assert_eq!(years, vec!["2023".to_string(), "2024".to_string()]);
    }

    #[tokio::test]
    async fn test_lookup_unknown_month_is_validation_error() {
        let (store, service) = service(0.0);
        // The month is validated before the store is consulted.
        store.set_uninitialized(true);
        let err = service.lookup("Juli", "2024").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_uninitialized_store() {
        let (store, service) = service(0.0);
        store.set_uninitialized(true);
        let err = service
            .submit_reading(Reading::new(1.0, 0.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Uninitialized);
        let err = service.list_years().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Uninitialized);
    }

    #[tokio::test]
    async fn test_overflowing_bill_is_rejected() {
        let (store, service) = service(120.0);
        let err = service
            .submit_reading_on(Reading::new(1e308, 0.0, 0.0), july(3))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert!(err.to_string().contains("too large"));
        assert_eq!(store.last_reading().await.unwrap(), 120.0);
        assert!(store.bills().await.unwrap().is_empty());

        // The store is still usable.
        let bill = service
            .submit_reading_on(Reading::new(150.0, 0.0, 0.0), july(4))
            .await
            .unwrap();
        assert_eq!(bill.unit_consumed, 30.0);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_store_unchanged() {
        let (store, service) = service(5.0);
        store.set_fail_commit(true);
        let err = service
            .submit_reading_on(Reading::new(9.0, 0.0, 0.0), july(3))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Storage);
        assert_eq!(store.last_reading().await.unwrap(), 5.0);
        assert!(store.bills().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_serialized() {
        let (store, service) = service(0.0);
        let mut handles = Vec::new();
        for i in 1..=10 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .submit_reading_on(Reading::new(i as f64 * 10.0, 0.0, 0.0), july(1))
                    .await
                    .unwrap()
            }));
        }
        let mut total = 0.0;
        for handle in handles {
            total += handle.await.unwrap().unit_consumed;
        }
        // Every submission consumed from the previous one's reading, so consumption telescopes
        // to the final reading.
        let last = store.last_reading().await.unwrap();
        assert_eq!(total, last);
    }
}
