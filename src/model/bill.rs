//! The billing arithmetic and the record that is persisted for each month.

use crate::model::date_key::bill_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The per-unit rate used when none is configured.
pub const DEFAULT_PER_UNIT_RATE: f64 = 8.0;

/// A new meter reading along with the two monetary adjustments submitted with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// The value currently shown on the meter dial.
    pub current: f64,
    /// Money already paid in advance for this period.
    pub advance: f64,
    /// The flat water charge for this period.
    pub water: f64,
}

impl Reading {
    pub fn new(current: f64, advance: f64, water: f64) -> Self {
        Self {
            current,
            advance,
            water,
        }
    }
}

/// One month's bill.
///
/// The serialized field names are the ones used by the existing `database.json` files and by
/// the web client, so they must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    /// The day the bill was created, e.g. `05 July 2024`.
    pub date: String,
    /// The reading submitted for this bill.
    #[serde(rename = "thismr")]
    pub current_reading: f64,
    /// The last reading on file when this bill was created.
    #[serde(rename = "lastmr")]
    pub previous_reading: f64,
    pub unit_consumed: f64,
    /// `unit_consumed * per_unit_rate`
    #[serde(rename = "money")]
    pub energy_cost: f64,
    #[serde(rename = "watercost")]
    pub water_cost: f64,
    /// `energy_cost + water_cost`
    #[serde(rename = "tmoney")]
    pub total_cost: f64,
    pub advance: f64,
    /// `total_cost - advance`
    #[serde(rename = "gt_money")]
    pub grand_total: f64,
}

impl BillingRecord {
    /// Computes a bill. No rounding is applied, and a reading lower than `previous` is not an
    /// error: it produces negative consumption and cost.
    pub fn compute(reading: Reading, previous: f64, per_unit_rate: f64, date: NaiveDate) -> Self {
        let unit_consumed = reading.current - previous;
        let energy_cost = unit_consumed * per_unit_rate;
        let total_cost = energy_cost + reading.water;
        let grand_total = total_cost - reading.advance;
        Self {
            date: bill_date(date),
            current_reading: reading.current,
            previous_reading: previous,
            unit_consumed,
            energy_cost,
            water_cost: reading.water,
            total_cost,
            advance: reading.advance,
            grand_total,
        }
    }

    /// True when every amount is a finite number. JSON has no representation for infinity or
    /// NaN, so a bill failing this must not be stored.
    pub fn is_finite(&self) -> bool {
        [
            self.current_reading,
            self.previous_reading,
            self.unit_consumed,
            self.energy_cost,
            self.water_cost,
            self.total_cost,
            self.advance,
            self.grand_total,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
