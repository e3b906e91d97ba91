//! OData-style filter for the Action Network events endpoint.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};

const FILTER_FIELD: &str = "created_date";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Gt,
    Eq,
}

impl Comparison {
    fn as_str(self) -> &'static str {
        match self {
            Comparison::Lt => "lt",
            Comparison::Gt => "gt",
            Comparison::Eq => "eq",
        }
    }
}

/// `created_date <op> 'YYYY-MM-DD'`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFilter {
    pub comparison: Comparison,
    pub date: NaiveDate,
}

impl Default for SourceFilter {
    /// Everything ever created.
    fn default() -> Self {
        SourceFilter {
            comparison: Comparison::Gt,
            date: DateTime::UNIX_EPOCH.date_naive(),
        }
    }
}

impl SourceFilter {
    /// Parse `s`, falling back to the default filter if it is not a valid
    /// `(lt|gt|eq) created_date YYYY-MM-DD` expression.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for SourceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [first, second, third] = parts.as_slice() else {
            return Err(format!("Expected '<lt|gt|eq> {FILTER_FIELD} YYYY-MM-DD', got '{s}'"));
        };

        let (field, op) = if *first == FILTER_FIELD {
            (*first, *second)
        } else {
            (*second, *first)
        };
        if field != FILTER_FIELD {
            return Err(format!("Only {FILTER_FIELD} can be filtered on, got '{s}'"));
        }

        let comparison = match op {
            "lt" => Comparison::Lt,
            "gt" => Comparison::Gt,
            "eq" => Comparison::Eq,
            other => return Err(format!("Unknown comparison '{other}'")),
        };

        let date = third.trim_matches(|c| c == '\'' || c == '"');
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| format!("Invalid date '{date}': {e}"))?;

        Ok(SourceFilter { comparison, date })
    }
}

impl fmt::Display for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}'",
            FILTER_FIELD,
            self.comparison.as_str(),
            self.date.format("%Y-%m-%d")
        )
    }
}
