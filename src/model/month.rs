//! The `Month` type used to look up bills by month name.

use crate::error::Res;
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A calendar month. Month names map to numbers totally: every variant has exactly one number in
/// `1..=12` and one full English name.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

const ALL: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

impl Month {
    /// Parses a full month name, e.g. `"July"`. Case is ignored and surrounding whitespace is
    /// trimmed. Abbreviations such as `"Jul"` are rejected.
    pub fn from_name(name: &str) -> Res<Self> {
        let trimmed = name.trim();
        match ALL
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(trimmed))
        {
            Some(m) => Ok(*m),
            None => bail!("'{name}' is not a recognized month name"),
        }
    }

    /// Returns the month for `number` in `1..=12`.
    pub fn from_number(number: u32) -> Option<Self> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        ALL.get(index).copied()
    }

    /// The month number, `1..=12`.
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn name(&self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Month::from_name("July").unwrap(), Month::July);
        assert_eq!(Month::from_name("january").unwrap(), Month::January);
        assert_eq!(Month::from_name(" DECEMBER ").unwrap(), Month::December);
    }

    #[test]
    fn test_from_name_rejects_unknown() {
        assert!(Month::from_name("Jul").is_err());
        assert!(Month::from_name("").is_err());
        assert!(Month::from_name("Smarch").is_err());
        let message = Month::from_name("Smarch").unwrap_err().to_string();
        assert!(message.contains("Smarch"));
    }

    #[test]
    fn test_numbers_are_total() {
        for n in 1..=12 {
            let month = Month::from_number(n).unwrap();
            assert_eq!(month.number(), n);
            assert_eq!(Month::from_name(month.name()).unwrap(), month);
        }
        assert!(Month::from_number(0).is_none());
        assert!(Month::from_number(13).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Month::September.to_string(), "September");
    }
}
