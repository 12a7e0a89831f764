//! Request and response bodies for the HTTP API.
//!
//! The field names are those used by the web client and cannot change.

use crate::model::{BillingRecord, Reading};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub(super) const SUCCESS: &str = "success";
pub(super) const NOT_FOUND: &str = "nf";
pub(super) const ERROR: &str = "error";

/// The body of `POST /mr`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(super) struct SubmitRequest {
    #[serde(deserialize_with = "number")]
    pub(super) cm_reading: f64,
    #[serde(deserialize_with = "number")]
    pub(super) advance: f64,
    #[serde(deserialize_with = "number")]
    pub(super) water_m: f64,
}

impl From<SubmitRequest> for Reading {
    fn from(value: SubmitRequest) -> Self {
        Reading::new(value.cm_reading, value.advance, value.water_m)
    }
}

/// The body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(super) struct SearchRequest {
    #[serde(deserialize_with = "text")]
    pub(super) year: String,
    pub(super) month: String,
}

/// A bill along with `"status": "success"`.
#[derive(Debug, Serialize)]
pub(super) struct BillResponse<'a> {
    pub(super) status: &'static str,
    #[serde(flatten)]
    pub(super) record: &'a BillingRecord,
}

#[derive(Debug, Serialize)]
pub(super) struct YearsResponse {
    pub(super) status: &'static str,
    pub(super) years: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusResponse {
    pub(super) status: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct ErrorResponse {
    pub(super) status: &'static str,
    pub(super) message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

/// The web client posts the contents of its input boxes, so numbers may arrive as strings.
fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("'{s}' is not a number")))?,
    };
    if !value.is_finite() {
        return Err(D::Error::custom(format!("{value} is not a finite number")));
    }
    Ok(value)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Integer(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_submit_request_accepts_numbers_and_strings() {
        let a: SubmitRequest =
            serde_json::from_str(r#"{"cm_reading": 150, "advance": 50.5, "water_m": 30}"#)
                .unwrap();
        let b: SubmitRequest = serde_json::from_str(
            r#"{"cm_reading": "150", "advance": " 50.5 ", "water_m": "30"}"#,
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(Reading::from(a), Reading::new(150.0, 50.5, 30.0));
    }

    #[test]
    fn test_submit_request_rejects_bad_numbers() {
        let err = serde_json::from_str::<SubmitRequest>(
            r#"{"cm_reading": "abc", "advance": 0, "water_m": 0}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'abc' is not a number"));

        let err = serde_json::from_str::<SubmitRequest>(
            r#"{"cm_reading": "NaN", "advance": 0, "water_m": 0}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a finite number"));

        let err =
            serde_json::from_str::<SubmitRequest>(r#"{"cm_reading": 1, "advance": 0}"#).unwrap_err();
        assert!(err.to_string().contains("water_m"));
    }

    #[test]
    fn test_search_request_year_as_number() {
        let a: SearchRequest = serde_json::from_str(r#"{"year": 2024, "month": "July"}"#).unwrap();
        let b: SearchRequest =
            serde_json::from_str(r#"{"year": "2024", "month": "July"}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bill_response_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let record = BillingRecord::compute(Reading::new(150.0, 50.0, 30.0), 120.0, 8.0, date);
        let value = serde_json::to_value(BillResponse {
            status: SUCCESS,
            record: &record,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({
                "status": "success",
                "date": "15 July 2024",
                "thismr": 150.0,
                "lastmr": 120.0,
                "unit_consumed": 30.0,
                "money": 240.0,
                "watercost": 30.0,
                "tmoney": 270.0,
                "advance": 50.0,
                "gt_money": 220.0
            })
        );
    }
}
