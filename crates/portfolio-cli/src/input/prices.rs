use chrono::NaiveDate;
use portfolio_core::market::prices::PriceTable;
use serde_json::Value;

use super::{file, stdin};

/// Load the price table for a command: `--input` file first, then piped
/// JSON, otherwise an error telling the user what to provide.
pub fn load_table_arg(input: &Option<String>) -> Result<PriceTable, Box<dyn std::error::Error>> {
    if let Some(path) = input {
        load_price_table(path)
    } else if let Some(data) = stdin::read_stdin()? {
        price_table_from_value(data)
    } else {
        Err("--input <file.csv|file.json> or piped JSON required".into())
    }
}

/// Load a price table from a CSV or JSON file.
///
/// CSV layout: a `date` header column followed by one column per symbol,
/// dates formatted `%Y-%m-%d`, empty cells meaning no price that day.
/// Any other extension is parsed as JSON in the `PriceTable` shape.
pub fn load_price_table(path: &str) -> Result<PriceTable, Box<dyn std::error::Error>> {
    let table = if path.to_lowercase().ends_with(".csv") {
        read_csv(path)?
    } else {
        file::read_json::<PriceTable>(path)?
    };
    table.validate()?;
    Ok(table)
}

/// Parse a piped JSON value as a price table.
pub fn price_table_from_value(value: Value) -> Result<PriceTable, Box<dyn std::error::Error>> {
    let table: PriceTable = serde_json::from_value(value)?;
    table.validate()?;
    Ok(table)
}

fn read_csv(path: &str) -> Result<PriceTable, Box<dyn std::error::Error>> {
    let resolved = file::resolve_path(path)?;
    let reader = csv::Reader::from_path(&resolved)
        .map_err(|e| format!("Failed to read '{}': {}", resolved.display(), e))?;
    parse_csv(reader)
}

fn parse_csv<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<PriceTable, Box<dyn std::error::Error>> {
    let headers = reader.headers()?.clone();
    if headers.get(0).map(str::trim) != Some("date") {
        return Err("CSV must start with a 'date' header column".into());
    }
    let symbols: Vec<String> = headers
        .iter()
        .skip(1)
        .map(|h| h.trim().to_string())
        .collect();

    let mut dates = Vec::new();
    let mut prices = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let date_cell = record.get(0).unwrap_or("").trim();
        let date = NaiveDate::parse_from_str(date_cell, "%Y-%m-%d")
            .map_err(|e| format!("Row {}: bad date '{}': {}", line + 2, date_cell, e))?;

        let mut row = Vec::with_capacity(symbols.len());
        for (col, cell) in record.iter().skip(1).enumerate() {
            let cell = cell.trim();
            if cell.is_empty() {
                row.push(None);
            } else {
                let price: f64 = cell.parse().map_err(|_| {
                    format!(
                        "Row {}, column '{}': bad price '{}'",
                        line + 2,
                        symbols.get(col).map(String::as_str).unwrap_or("?"),
                        cell
                    )
                })?;
                row.push(Some(price));
            }
        }
        dates.push(date);
        prices.push(row);
    }

    Ok(PriceTable {
        dates,
        symbols,
        prices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> Result<PriceTable, Box<dyn std::error::Error>> {
        parse_csv(csv::Reader::from_reader(data.as_bytes()))
    }

    #[test]
    fn test_csv_parses_dates_symbols_and_prices() {
        let table = parse("date,AAA,BBB\n2024-01-02,100.0,50.0\n2024-01-03,102.5,49.0\n").unwrap();
        assert_eq!(table.symbols, vec!["AAA", "BBB"]);
        assert_eq!(table.dates[0], NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(table.prices.len(), 2);
        assert_eq!(table.prices[1][0], Some(102.5));
    }

    #[test]
    fn test_csv_empty_cell_is_missing() {
        let table = parse("date,AAA,BBB\n2024-01-02,100.0,50.0\n2024-01-03,,49.0\n").unwrap();
        assert_eq!(table.prices[1][0], None);
        // The gap is local to its own column
        assert_eq!(table.prices[1][1], Some(49.0));
    }

    #[test]
    fn test_csv_trims_header_and_cell_whitespace() {
        let table = parse("date, AAA ,BBB\n2024-01-02, 100.0 ,50.0\n").unwrap();
        assert_eq!(table.symbols, vec!["AAA", "BBB"]);
        assert_eq!(table.prices[0][0], Some(100.0));
    }

    #[test]
    fn test_csv_rejects_missing_date_header() {
        let err = parse("day,AAA\n2024-01-02,100.0\n").unwrap_err().to_string();
        assert!(err.contains("'date' header"), "unexpected error: {}", err);
    }

    #[test]
    fn test_csv_bad_date_names_row() {
        let err = parse("date,AAA\n2024-01-02,100.0\n02/01/2024,101.0\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("Row 3"), "unexpected error: {}", err);
        assert!(err.contains("'02/01/2024'"), "unexpected error: {}", err);
    }

    #[test]
    fn test_csv_bad_price_names_row_and_symbol() {
        let err = parse("date,AAA,BBB\n2024-01-02,100.0,abc\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("Row 2"), "unexpected error: {}", err);
        assert!(err.contains("'BBB'"), "unexpected error: {}", err);
        assert!(err.contains("'abc'"), "unexpected error: {}", err);
    }
}
