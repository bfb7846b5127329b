use crate::loader::StoredSeries;
use crate::models::PriceRecord;
use crate::utils::fmt_number;
use chrono::NaiveDate;
use std::fmt::Write;
use std::path::Path;

pub const DEFAULT_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_close: f64,
    /// Lowest and highest close over the trailing window.
    pub recent_low: f64,
    pub recent_high: f64,
    pub window: usize,
}

/// `None` for an empty series. Expects ascending records, as written by `storage`.
pub fn summarize(records: &[PriceRecord], window: usize) -> Option<SeriesSummary> {
    let first = records.first()?;
    let last = records.last()?;

    let window = window.clamp(1, records.len());
    let tail = &records[records.len() - window..];
    let recent_low = tail.iter().map(|r| r.close).fold(f64::INFINITY, f64::min);
    let recent_high = tail.iter().map(|r| r.close).fold(f64::NEG_INFINITY, f64::max);

    Some(SeriesSummary {
        rows: records.len(),
        first_date: first.date,
        last_date: last.date,
        last_close: last.close,
        recent_low,
        recent_high,
        window,
    })
}

/// First `n` rows as an aligned text table.
pub fn render_preview(records: &[PriceRecord], n: usize) -> String {
    let mut out = format!(
        "{:<10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>14}\n",
        "date", "open", "high", "low", "close", "volume"
    );
    for r in records.iter().take(n) {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{:<10}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>14}",
            r.date.format("%Y-%m-%d"),
            r.open,
            r.high,
            r.low,
            r.close,
            fmt_number(r.volume)
        );
    }
    out
}

pub fn render_summary(summary: &SeriesSummary) -> String {
    format!(
        "  Rows       : {}\n  From       : {}\n  To         : {}\n  Last close : {:.2}\n  {}-row range: {:.2}-{:.2}\n",
        fmt_number(summary.rows as i64),
        summary.first_date,
        summary.last_date,
        summary.last_close,
        summary.window,
        summary.recent_low,
        summary.recent_high,
    )
}

/// One line per stored series: symbol, period, row count, date range.
pub fn render_listing(dir: &Path, series: &[StoredSeries]) -> String {
    if series.is_empty() {
        return format!("No series in {:?}. Run `alpha-markets fetch` first.\n", dir);
    }

    let mut out = format!("{} series in {:?}:\n", series.len(), dir);
    for s in series {
        let range = match (s.records.first(), s.records.last()) {
            (Some(first), Some(last)) => format!("{} to {}", first.date, last.date),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<8} {:<8} {:>8} rows  {}",
            s.symbol,
            s.period.as_str(),
            fmt_number(s.records.len() as i64),
            range
        );
    }
    out
}
