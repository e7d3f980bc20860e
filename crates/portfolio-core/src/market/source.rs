use chrono::NaiveDate;

use crate::market::prices::PriceTable;
use crate::PortfolioResult;

/// A provider of historical adjusted-close prices.
///
/// Implementations fetch however they like (HTTP, flat files, an
/// in-memory fixture); the engine only sees the resulting [`PriceTable`].
/// An empty or partially-missing result is returned as-is; whether that
/// is fatal is decided downstream via [`PriceTable::validate`] and
/// [`PriceTable::drop_empty_columns`].
pub trait MarketDataSource {
    /// Fetch prices for `symbols` between `start` and `end` inclusive.
    fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> PortfolioResult<PriceTable>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixture source backed by a pre-built table. Serves the requested
    /// symbols in request order; unknown symbols come back as all-missing
    /// columns, mirroring how a failed ticker shows up in a real feed.
    struct StaticSource {
        table: PriceTable,
    }

    impl MarketDataSource for StaticSource {
        fn fetch(
            &self,
            symbols: &[String],
            start: NaiveDate,
            end: NaiveDate,
        ) -> PortfolioResult<PriceTable> {
            let row_idx: Vec<usize> = self
                .table
                .dates
                .iter()
                .enumerate()
                .filter(|(_, d)| **d >= start && **d <= end)
                .map(|(i, _)| i)
                .collect();
            let col_of = |sym: &str| self.table.symbols.iter().position(|s| s == sym);

            let dates = row_idx.iter().map(|&i| self.table.dates[i]).collect();
            let prices = row_idx
                .iter()
                .map(|&i| {
                    symbols
                        .iter()
                        .map(|sym| col_of(sym).and_then(|c| self.table.prices[i][c]))
                        .collect()
                })
                .collect();

            Ok(PriceTable {
                dates,
                symbols: symbols.to_vec(),
                prices,
            })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> StaticSource {
        StaticSource {
            table: PriceTable {
                dates: vec![
                    date(2024, 1, 2),
                    date(2024, 1, 3),
                    date(2024, 1, 4),
                    date(2024, 1, 5),
                ],
                symbols: vec!["AAA".into(), "BBB".into()],
                prices: vec![
                    vec![Some(100.0), Some(50.0)],
                    vec![Some(102.0), Some(49.0)],
                    vec![Some(101.0), Some(51.0)],
                    vec![Some(105.0), Some(52.0)],
                ],
            },
        }
    }

    #[test]
    fn test_fetch_respects_date_range() {
        let source = fixture();
        let table = source
            .fetch(
                &["AAA".into(), "BBB".into()],
                date(2024, 1, 3),
                date(2024, 1, 4),
            )
            .unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.dates[0], date(2024, 1, 3));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_fetch_unknown_symbol_yields_empty_column() {
        let source = fixture();
        let table = source
            .fetch(
                &["AAA".into(), "GONE".into()],
                date(2024, 1, 2),
                date(2024, 1, 5),
            )
            .unwrap();
        let (cleaned, dropped) = table.drop_empty_columns();
        assert_eq!(dropped, vec!["GONE".to_string()]);
        assert_eq!(cleaned.symbols, vec!["AAA".to_string()]);
    }

    #[test]
    fn test_fetch_preserves_request_order() {
        let source = fixture();
        let table = source
            .fetch(
                &["BBB".into(), "AAA".into()],
                date(2024, 1, 2),
                date(2024, 1, 5),
            )
            .unwrap();
        assert_eq!(table.symbols, vec!["BBB".to_string(), "AAA".to_string()]);
        assert_eq!(table.prices[0], vec![Some(50.0), Some(100.0)]);
    }
}
