//! Reads artifacts back from disk: saved raw responses and written series CSVs.

use crate::client::check_api_message;
use crate::models::{Period, PriceRecord, RawSeriesResponse};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load a `/query` response saved as JSON.
pub fn load_raw_response(path: &Path) -> Result<RawSeriesResponse> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

    let raw = match serde_json::from_str::<Value>(&text)
        .with_context(|| format!("{:?} is not valid JSON", path))?
    {
        Value::Object(map) => map,
        _ => bail!("{:?}: top-level JSON value is not an object", path),
    };

    check_api_message(&raw).with_context(|| format!("{:?} holds an API error response", path))?;
    debug!("{:?}: {} top-level keys", path, raw.len());
    Ok(raw)
}

/// Parse a series CSV written by `storage`. Any bad row fails the load.
pub fn load_csv(path: &Path) -> Result<Vec<PriceRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let mut records = Vec::new();
    for (i, result) in reader.deserialize::<PriceRecord>().enumerate() {
        let record = result.with_context(|| format!("Row {} in {:?}", i + 1, path))?;
        records.push(record);
    }

    info!("{:?}: {} rows loaded", path, records.len());
    Ok(records)
}

/// `AAPL_daily.csv` → `("AAPL", Daily)`. The period is the part after the
/// last underscore, so symbols may contain underscores themselves.
pub fn parse_output_name(path: &Path) -> Option<(String, Period)> {
    if path.extension()? != "csv" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (symbol, period) = stem.rsplit_once('_')?;
    let period = Period::from_name(period)?;

    if symbol.is_empty() {
        None
    } else {
        Some((symbol.to_string(), period))
    }
}

/// Every series file in `dir`, sorted by symbol then period.
pub fn discover_outputs(dir: &Path) -> Result<Vec<(String, Period, PathBuf)>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some((symbol, period)) = parse_output_name(&path) {
            files.push((symbol, period, path));
        }
    }

    files.sort();
    Ok(files)
}

/// A series file read back from an output directory.
#[derive(Debug)]
pub struct StoredSeries {
    pub symbol: String,
    pub period: Period,
    pub records: Vec<PriceRecord>,
}

/// Load every series file in `dir`. Files that fail to parse are logged and
/// skipped.
pub fn load_outputs(dir: &Path) -> Result<Vec<StoredSeries>> {
    let mut series = Vec::new();
    for (symbol, period, path) in discover_outputs(dir)? {
        match load_csv(&path) {
            Ok(records) => series.push(StoredSeries {
                symbol,
                period,
                records,
            }),
            Err(e) => warn!("Skipping {:?}: {:#}", path, e),
        }
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CsvStore;
    use chrono::NaiveDate;
    use std::fs;

    #[test]
    fn test_parse_output_name() {
        assert_eq!(
            parse_output_name(Path::new("out/AAPL_daily.csv")),
            Some(("AAPL".to_string(), Period::Daily))
        );
        assert_eq!(
            parse_output_name(Path::new("BRK_B_monthly.csv")),
            Some(("BRK_B".to_string(), Period::Monthly))
        );
        assert_eq!(parse_output_name(Path::new("AAPL_hourly.csv")), None);
        assert_eq!(parse_output_name(Path::new("AAPL_daily.json")), None);
        assert_eq!(parse_output_name(Path::new("_weekly.csv")), None);
    }

    #[test]
    fn test_load_csv_reads_written_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let records = vec![
            PriceRecord {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                open: 150.25,
                high: 151.0,
                low: 149.5,
                close: 150.75,
                volume: 1_000_000,
            },
            PriceRecord {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                open: 150.8,
                high: 152.3,
                low: 150.1,
                close: 152.0,
                volume: 1_250_000,
            },
        ];
        let path = store.write_series("AAPL", Period::Daily, &records).unwrap();

        assert_eq!(load_csv(&path).unwrap(), records);
    }

    #[test]
    fn test_load_csv_rejects_bad_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X_daily.csv");
        fs::write(
            &path,
            "date,open,high,low,close,volume\n2024-01-02,1,1,1,1,abc\n",
        )
        .unwrap();
        assert!(load_csv(&path).is_err());
    }

    #[test]
    fn test_discover_outputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["MSFT_weekly.csv", "AAPL_monthly.csv", "AAPL_daily.csv", "notes.txt", "raw.json"] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let found: Vec<(String, Period)> = discover_outputs(dir.path())
            .unwrap()
            .into_iter()
            .map(|(s, p, _)| (s, p))
            .collect();

        assert_eq!(
            found,
            vec![
                ("AAPL".to_string(), Period::Daily),
                ("AAPL".to_string(), Period::Monthly),
                ("MSFT".to_string(), Period::Weekly),
            ]
        );
        assert!(discover_outputs(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_load_raw_response() {
        let dir = tempfile::tempdir().unwrap();

        let ok = dir.path().join("ok.json");
        fs::write(&ok, r#"{"Weekly Time Series": {}}"#).unwrap();
        assert!(load_raw_response(&ok).unwrap().contains_key("Weekly Time Series"));

        let limited = dir.path().join("limited.json");
        fs::write(&limited, r#"{"Information": "rate limit reached"}"#).unwrap();
        assert!(load_raw_response(&limited).is_err());

        let array = dir.path().join("array.json");
        fs::write(&array, "[]").unwrap();
        assert!(load_raw_response(&array).is_err());
    }

    #[test]
    fn test_load_outputs_skips_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let record = PriceRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10,
        };
        store.write_series("IBM", Period::Monthly, &[record.clone()]).unwrap();
        fs::write(dir.path().join("AAPL_daily.csv"), "not,a,series\n1,2,3\n").unwrap();

        let series = load_outputs(dir.path()).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].symbol, "IBM");
        assert_eq!(series[0].period, Period::Monthly);
        assert_eq!(series[0].records, vec![record]);
    }
}
