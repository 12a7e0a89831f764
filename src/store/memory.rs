//! An in-memory `Store` for tests, with switches to simulate a missing or failing store.

use crate::error::{ErrorType, IntoResult};
use crate::model::{BillingRecord, Bills, DateKey};
use crate::store::Store;
use crate::Result;
use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    state: Mutex<(f64, Bills)>,
    uninitialized: AtomicBool,
    fail_commit: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new(last_reading: f64) -> Self {
        Self {
            state: Mutex::new((last_reading, Bills::new())),
            ..Default::default()
        }
    }

    pub(crate) fn set_uninitialized(&self, value: bool) {
        self.uninitialized.store(value, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_commit(&self, value: bool) {
        self.fail_commit.store(value, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.uninitialized.load(Ordering::SeqCst) {
            return Err(anyhow!("The memory store is not initialized"))
                .pub_result(ErrorType::Uninitialized);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn last_reading(&self) -> Result<f64> {
        self.check()?;
        Ok(self.state.lock().unwrap().0)
    }

    async fn bills(&self) -> Result<Bills> {
        self.check()?;
        Ok(self.state.lock().unwrap().1.clone())
    }

    async fn commit(&self, key: &DateKey, record: &BillingRecord) -> Result<()> {
        self.check()?;
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated write failure")).pub_result(ErrorType::Storage);
        }
        let mut state = self.state.lock().unwrap();
        state.0 = record.current_reading;
        state.1.insert(key.to_string(), record.clone());
        Ok(())
    }
}
