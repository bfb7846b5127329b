use crate::models::{parse_symbol, InvalidSymbol, Period, PriceRecord};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CSV_HEADER: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// `AAPL_daily.csv`. Symbols that are not plain tickers are rejected so the
/// file always lands directly inside the store directory.
pub fn output_file_name(symbol: &str, period: Period) -> Result<String, InvalidSymbol> {
    Ok(format!("{}_{}.csv", parse_symbol(symbol)?, period))
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Directory of `<SYMBOL>_<period>.csv` files.
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("Could not create dir {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str, period: Period) -> Result<PathBuf, InvalidSymbol> {
        Ok(self.dir.join(output_file_name(symbol, period)?))
    }

    /// Replace the series file for `symbol`/`period` with `records`.
    pub fn write_series(
        &self,
        symbol: &str,
        period: Period,
        records: &[PriceRecord],
    ) -> Result<PathBuf> {
        let path = self.path_for(symbol, period)?;
        let n = write_records(&path, records)?;
        info!("{} {}: {} rows saved to {:?}", symbol, period, n, path);
        Ok(path)
    }
}

/// Write header + rows to a sibling temp file, then rename over `path`.
/// A failed write leaves any previous file untouched.
pub fn write_records(path: &Path, records: &[PriceRecord]) -> Result<usize> {
    let tmp = path.with_extension("csv.tmp");

    let written = write_csv(&tmp, records).and_then(|n| {
        fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
        Ok(n)
    });

    if written.is_err() {
        fs::remove_file(&tmp).ok();
    }
    written
}

fn write_csv(path: &Path, records: &[PriceRecord]) -> Result<usize> {
    debug!("Writing {} rows to {:?}", records.len(), path);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("serialize row {}", record.date))?;
    }
    writer.flush().with_context(|| format!("flush {:?}", path))?;

    Ok(records.len())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(y: i32, m: u32, d: u32, close: f64, volume: i64) -> PriceRecord {
        PriceRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            open: 150.25,
            high: 151.0,
            low: 149.5,
            close,
            volume,
        }
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("ibm", Period::Weekly).unwrap(), "IBM_weekly.csv");
        assert!(output_file_name(" ", Period::Daily).is_err());
    }

    #[test]
    fn test_symbol_cannot_escape_store_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(&dir.path().join("out")).unwrap();

        for symbol in ["../escape", "a/b", ""] {
            assert!(store.write_series(symbol, Period::Daily, &[]).is_err());
        }
        assert!(!dir.path().join("ESCAPE_daily.csv").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_exact_csv_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();

        let path = store
            .write_series(
                "AAPL",
                Period::Daily,
                &[record(2024, 1, 2, 150.75, 1_000_000), record(2024, 1, 3, 0.123456789012, 7)],
            )
            .unwrap();

        assert_eq!(path, dir.path().join("AAPL_daily.csv"));
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "date,open,high,low,close,volume\n\
             2024-01-02,150.25,151.0,149.5,150.75,1000000\n\
             2024-01-03,150.25,151.0,149.5,0.123456789012,7\n"
        );
        assert!(!dir.path().join("AAPL_daily.csv.tmp").exists());
    }

    #[test]
    fn test_empty_series_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let path = store.write_series("IBM", Period::Monthly, &[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "date,open,high,low,close,volume\n");
    }

    #[test]
    fn test_open_creates_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("series");
        let store = CsvStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn test_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        store
            .write_series("IBM", Period::Daily, &[record(2024, 1, 2, 1.0, 1), record(2024, 1, 3, 2.0, 2)])
            .unwrap();
        let path = store
            .write_series("IBM", Period::Daily, &[record(2024, 2, 1, 3.0, 3)])
            .unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("2024-02-01"));
    }
}
