use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::PortfolioError;
use crate::PortfolioResult;

/// Date-indexed table of adjusted closing prices, one column per symbol.
///
/// `None` marks a missing quote (late listing, exchange holiday, failed
/// fetch). Tables commonly arrive via serde, which bypasses any
/// constructor, so structural invariants are checked by
/// [`PriceTable::validate`] and every consuming operation calls it first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTable {
    /// Trading dates, strictly increasing.
    pub dates: Vec<NaiveDate>,
    /// Asset symbols, one per column, no duplicates.
    pub symbols: Vec<String>,
    /// Row-major: `prices[row][col]` is the price of `symbols[col]` on `dates[row]`.
    pub prices: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Check the structural invariants: non-empty, strictly increasing
    /// dates, unique symbols, and a consistent row/column shape.
    pub fn validate(&self) -> PortfolioResult<()> {
        if self.symbols.is_empty() {
            return Err(PortfolioError::EmptyInput {
                context: "price table has no symbol columns".into(),
            });
        }
        if self.dates.is_empty() {
            return Err(PortfolioError::EmptyInput {
                context: "price table has no rows".into(),
            });
        }
        if self.prices.len() != self.dates.len() {
            return Err(PortfolioError::DimensionMismatch {
                context: "price table rows".into(),
                expected: self.dates.len(),
                actual: self.prices.len(),
            });
        }
        for (i, row) in self.prices.iter().enumerate() {
            if row.len() != self.symbols.len() {
                return Err(PortfolioError::DimensionMismatch {
                    context: format!("price table row {}", i),
                    expected: self.symbols.len(),
                    actual: row.len(),
                });
            }
        }
        for (i, pair) in self.dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(PortfolioError::InvalidInput {
                    field: "dates".into(),
                    reason: format!(
                        "Not strictly increasing: {} follows {} at index {}",
                        pair[1],
                        pair[0],
                        i + 1
                    ),
                });
            }
        }
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.symbols.len());
        for sym in &self.symbols {
            if !seen.insert(sym.as_str()) {
                return Err(PortfolioError::InvalidInput {
                    field: "symbols".into(),
                    reason: format!("Duplicate column '{}'", sym),
                });
            }
        }
        Ok(())
    }

    /// Drop columns with no usable price at all (every entry missing or
    /// non-finite). Returns the cleaned table and the removed symbols so
    /// callers can surface them.
    ///
    /// Partially-missing columns are kept; return computation decides
    /// row-by-row what survives.
    pub fn drop_empty_columns(self) -> (PriceTable, Vec<String>) {
        let keep: Vec<bool> = (0..self.symbols.len())
            .map(|col| {
                self.prices
                    .iter()
                    .any(|row| matches!(row[col], Some(p) if p.is_finite()))
            })
            .collect();

        if keep.iter().all(|&k| k) {
            return (self, Vec::new());
        }

        let mut dropped = Vec::new();
        let mut symbols = Vec::new();
        for (col, sym) in self.symbols.into_iter().enumerate() {
            if keep[col] {
                symbols.push(sym);
            } else {
                dropped.push(sym);
            }
        }
        let prices = self
            .prices
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .enumerate()
                    .filter(|(col, _)| keep[*col])
                    .map(|(_, p)| p)
                    .collect()
            })
            .collect();

        (
            PriceTable {
                dates: self.dates,
                symbols,
                prices,
            },
            dropped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_asset_table() -> PriceTable {
        PriceTable {
            dates: vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)],
            symbols: vec!["AAA".into(), "BBB".into()],
            prices: vec![
                vec![Some(100.0), Some(50.0)],
                vec![Some(102.0), Some(49.0)],
                vec![Some(101.0), Some(51.0)],
            ],
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_table() {
        assert!(two_asset_table().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_symbols() {
        let table = PriceTable {
            dates: vec![date(2024, 1, 2)],
            symbols: vec![],
            prices: vec![vec![]],
        };
        assert!(matches!(
            table.validate(),
            Err(PortfolioError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_no_rows() {
        let table = PriceTable {
            dates: vec![],
            symbols: vec!["AAA".into()],
            prices: vec![],
        };
        assert!(matches!(
            table.validate(),
            Err(PortfolioError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unsorted_dates() {
        let mut table = two_asset_table();
        table.dates.swap(0, 1);
        assert!(matches!(
            table.validate(),
            Err(PortfolioError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_dates() {
        let mut table = two_asset_table();
        table.dates[1] = table.dates[0];
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_symbols() {
        let mut table = two_asset_table();
        table.symbols[1] = "AAA".into();
        assert!(matches!(
            table.validate(),
            Err(PortfolioError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_ragged_rows() {
        let mut table = two_asset_table();
        table.prices[1].pop();
        assert!(matches!(
            table.validate(),
            Err(PortfolioError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_row_count_mismatch() {
        let mut table = two_asset_table();
        table.prices.pop();
        assert!(matches!(
            table.validate(),
            Err(PortfolioError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_drop_empty_columns_removes_dead_symbol() {
        let table = PriceTable {
            dates: vec![date(2024, 1, 2), date(2024, 1, 3)],
            symbols: vec!["AAA".into(), "DEAD".into(), "BBB".into()],
            prices: vec![
                vec![Some(100.0), None, Some(50.0)],
                vec![Some(102.0), None, Some(49.0)],
            ],
        };
        let (cleaned, dropped) = table.drop_empty_columns();
        assert_eq!(cleaned.symbols, vec!["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(dropped, vec!["DEAD".to_string()]);
        assert_eq!(cleaned.prices[0], vec![Some(100.0), Some(50.0)]);
        assert_eq!(cleaned.prices[1], vec![Some(102.0), Some(49.0)]);
    }

    #[test]
    fn test_drop_empty_columns_treats_nan_as_missing() {
        let table = PriceTable {
            dates: vec![date(2024, 1, 2), date(2024, 1, 3)],
            symbols: vec!["AAA".into(), "NANCOL".into()],
            prices: vec![
                vec![Some(100.0), Some(f64::NAN)],
                vec![Some(102.0), Some(f64::NAN)],
            ],
        };
        let (cleaned, dropped) = table.drop_empty_columns();
        assert_eq!(cleaned.symbols, vec!["AAA".to_string()]);
        assert_eq!(dropped, vec!["NANCOL".to_string()]);
    }

    #[test]
    fn test_drop_empty_columns_keeps_partial_columns() {
        let table = PriceTable {
            dates: vec![date(2024, 1, 2), date(2024, 1, 3)],
            symbols: vec!["AAA".into(), "PARTIAL".into()],
            prices: vec![
                vec![Some(100.0), None],
                vec![Some(102.0), Some(49.0)],
            ],
        };
        let (cleaned, dropped) = table.drop_empty_columns();
        assert_eq!(cleaned.symbols.len(), 2);
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_drop_empty_columns_noop_on_full_table() {
        let (cleaned, dropped) = two_asset_table().drop_empty_columns();
        assert_eq!(cleaned.symbols.len(), 2);
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_serde_round_trip() {
        let table = two_asset_table();
        let json = serde_json::to_string(&table).unwrap();
        let back: PriceTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dates, table.dates);
        assert_eq!(back.symbols, table.symbols);
        assert_eq!(back.prices, table.prices);
        assert!(back.validate().is_ok());
    }
}
