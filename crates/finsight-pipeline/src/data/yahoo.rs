//! Yahoo Finance price source

use super::{PriceBar, PriceSeries, PriceSource};
use crate::error::DataError;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

/// Daily bars from Yahoo Finance
#[derive(Debug, Clone, Default)]
pub struct YahooPriceSource {}

impl YahooPriceSource {
    /// Create a new Yahoo Finance source
    pub fn new() -> Self {
        Self {}
    }
}

fn to_offset(date: NaiveDate) -> Result<OffsetDateTime, DataError> {
    let timestamp = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::Provider(format!("Invalid timestamp for {date}: {e}")))
}

/// Yahoo signals an empty range or unknown symbol with an error rather than
/// an empty quote list; both mean no data.
fn classify_error(
    err: yahoo::YahooError,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> DataError {
    match err {
        yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => DataError::NoData {
            symbol: symbol.to_string(),
            start,
            end,
        },
        other => DataError::Provider(other.to_string()),
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    #[instrument(skip(self))]
    async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let symbol = ticker.trim().to_uppercase();
        let provider =
            yahoo::YahooConnector::new().map_err(|e| DataError::Provider(e.to_string()))?;

        // Yahoo treats the end as exclusive; ask for the following midnight.
        let end_exclusive = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| DataError::Provider(format!("End date out of range: {end}")))?;

        let response = provider
            .get_quote_history(&symbol, to_offset(start)?, to_offset(end_exclusive)?)
            .await
            .map_err(|e| classify_error(e, &symbol, start, end))?;

        let quotes = response
            .quotes()
            .map_err(|e| classify_error(e, &symbol, start, end))?;

        let bars: Vec<PriceBar> = quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
                Some(PriceBar {
                    date,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .filter(|bar| bar.date >= start && bar.date <= end)
            .collect();

        debug!(symbol = %symbol, received = quotes.len(), kept = bars.len(), "quote history");

        let series = PriceSeries::from_unsorted(&symbol, bars);
        if series.is_empty() {
            return Err(DataError::NoData { symbol, start, end });
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_offset_is_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let odt = to_offset(date).unwrap();
        assert_eq!(odt.unix_timestamp(), 1_672_617_600);
    }

    #[test]
    fn test_empty_responses_are_no_data() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 7).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 8).unwrap();

        for err in [yahoo::YahooError::NoQuotes, yahoo::YahooError::NoResult] {
            match classify_error(err, "AAPL", start, end) {
                DataError::NoData {
                    symbol,
                    start: s,
                    end: e,
                } => {
                    assert_eq!(symbol, "AAPL");
                    assert_eq!((s, e), (start, end));
                }
                other => panic!("expected NoData, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_other_failures_stay_provider_errors() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 3).unwrap();
        let err = classify_error(
            yahoo::YahooError::FetchFailed("503 Service Unavailable".to_string()),
            "AAPL",
            day,
            day,
        );
        assert!(matches!(err, DataError::Provider(ref msg) if msg.contains("503")));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_history() {
        let source = YahooPriceSource::new();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        let series = source.fetch("aapl", start, end).await.unwrap();

        assert_eq!(series.symbol(), "AAPL");
        assert!(series.len() > 50);
        assert!(series.first_date().unwrap() >= start);
        assert!(series.last_date().unwrap() <= end);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_unknown_symbol() {
        let source = YahooPriceSource::new();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        assert!(source.fetch("NOT-A-REAL-TICKER-XYZ", start, end).await.is_err());
    }
}
