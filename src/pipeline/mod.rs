//! Pipeline orchestrator: ties price source → transform → CSV store together.
//!
//! Every (symbol, period) pair of a `FetchPlan` is one task. Tasks run one
//! after another with at most one request in flight. A failed task is logged
//! and counted, and the run moves on to the next one; nothing is retried and
//! a failed task never writes a file.

use crate::client::error::FetchError;
use crate::client::{AlphaVantageClient, PriceSource};
use crate::config::AppConfig;
use crate::models::{FetchPlan, Period};
use crate::report::{summarize, DEFAULT_WINDOW};
use crate::storage::CsvStore;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

pub struct Pipeline {
    source: Box<dyn PriceSource>,
    store: CsvStore,
}

impl Pipeline {
    pub fn new(config: &AppConfig, api_key: &str) -> Result<Self> {
        let client = AlphaVantageClient::new(&config.api, api_key)
            .context("Failed to build HTTP client")?;
        let store = CsvStore::open(&config.output.dir)?;
        Ok(Self::with_source(Box::new(client), store))
    }

    pub fn with_source(source: Box<dyn PriceSource>, store: CsvStore) -> Self {
        Self { source, store }
    }

    pub async fn run(&self, plan: &FetchPlan) -> PipelineStats {
        info!(
            "=== {} task(s): {:?} × {:?} (outputsize {}) ===",
            plan.task_count(),
            plan.symbols,
            plan.periods,
            plan.outputsize.as_str()
        );
        info!("Writing CSV files to {:?}", self.store.dir());

        let mut stats = PipelineStats::default();

        for symbol in &plan.symbols {
            for &period in &plan.periods {
                stats.tasks += 1;
                match self.run_task(symbol, period, plan).await {
                    Ok((path, n)) => {
                        stats.records_written += n;
                        stats.files_written.push(path);
                    }
                    Err(e) => {
                        report_failure(symbol, period, e);
                        stats.errors += 1;
                    }
                }
            }
        }

        info!(
            "=== Done: {} tasks | {} files | {} rows | {} errors ===",
            stats.tasks,
            stats.files_written.len(),
            stats.records_written,
            stats.errors
        );
        stats
    }

    async fn run_task(
        &self,
        symbol: &str,
        period: Period,
        plan: &FetchPlan,
    ) -> Result<(PathBuf, usize), TaskError> {
        let records = self
            .source
            .fetch_series(symbol, period, plan.outputsize)
            .await?;

        let path = self
            .store
            .write_series(symbol, period, &records)
            .map_err(TaskError::Write)?;

        if let Some(s) = summarize(&records, DEFAULT_WINDOW) {
            info!(
                "{} {}: {} → {} | last close {:.2} | {}-row range {:.2}-{:.2}",
                symbol, period, s.first_date, s.last_date, s.last_close, s.window, s.recent_low,
                s.recent_high
            );
        }

        Ok((path, records.len()))
    }
}

enum TaskError {
    Fetch(FetchError),
    Write(anyhow::Error),
}

impl From<FetchError> for TaskError {
    fn from(e: FetchError) -> Self {
        TaskError::Fetch(e)
    }
}

fn report_failure(symbol: &str, period: Period, err: TaskError) {
    match err {
        TaskError::Fetch(e @ FetchError::ApiLimit { .. }) => {
            warn!("{} {}: rejected by API (rate limit or error message): {}", symbol, period, e);
        }
        TaskError::Fetch(e) if e.is_transport() => {
            warn!("{} {}: transport failure: {:#}", symbol, period, anyhow::Error::new(e));
        }
        TaskError::Fetch(e) => {
            warn!("{} {}: malformed response: {:#}", symbol, period, anyhow::Error::new(e));
        }
        TaskError::Write(e) => {
            warn!("{} {}: could not save CSV: {:#}", symbol, period, e);
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub tasks: usize,
    pub records_written: usize,
    pub files_written: Vec<PathBuf>,
    pub errors: usize,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
