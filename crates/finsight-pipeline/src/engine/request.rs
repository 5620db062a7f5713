//! Analysis request validation

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a request was rejected before any stage ran
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("invalid {field} '{value}': expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("start_date {start} is after end_date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// A validated request for one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    ticker: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl AnalysisRequest {
    /// Validate a request; a missing `end_date` means today (UTC)
    pub fn new(
        ticker: &str,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, RequestError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(RequestError::EmptyTicker);
        }
        let end_date = end_date.unwrap_or_else(|| Utc::now().date_naive());
        if start_date > end_date {
            return Err(RequestError::InvertedRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            ticker: ticker.to_string(),
            start_date,
            end_date,
        })
    }

    /// Validate a request from ISO date strings
    pub fn parse(
        ticker: &str,
        start_date: &str,
        end_date: Option<&str>,
    ) -> Result<Self, RequestError> {
        let start = parse_date("start_date", start_date)?;
        let end = end_date
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_date("end_date", raw))
            .transpose()?;
        Self::new(ticker, start, end)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, RequestError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| RequestError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_request() {
        let request = AnalysisRequest::parse(" AAPL ", "2023-01-01", Some("2023-12-31")).unwrap();
        assert_eq!(request.ticker(), "AAPL");
        assert_eq!(request.start_date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(request.end_date(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_end_date_defaults_to_today() {
        let request = AnalysisRequest::parse("MSFT", "2020-01-01", None).unwrap();
        assert_eq!(request.end_date(), Utc::now().date_naive());

        let blank = AnalysisRequest::parse("MSFT", "2020-01-01", Some("")).unwrap();
        assert_eq!(blank.end_date(), Utc::now().date_naive());
    }

    #[test]
    fn test_single_day_range_is_valid() {
        let request = AnalysisRequest::parse("AAPL", "2023-06-01", Some("2023-06-01")).unwrap();
        assert_eq!(request.start_date(), request.end_date());
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            AnalysisRequest::parse("  ", "2023-01-01", None),
            Err(RequestError::EmptyTicker)
        );
        assert!(matches!(
            AnalysisRequest::parse("AAPL", "01/02/2023", None),
            Err(RequestError::InvalidDate { field: "start_date", .. })
        ));
        assert!(matches!(
            AnalysisRequest::parse("AAPL", "2023-02-01", Some("2023-01-01")),
            Err(RequestError::InvertedRange { .. })
        ));
    }
}
