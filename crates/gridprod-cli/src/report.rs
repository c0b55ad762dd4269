//! JSON export: one numbered output file per searched order, plus a session
//! file covering the whole run. Numbering continues from whatever already
//! sits in the data directory so earlier outputs are never overwritten.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use gridprod_core::{format_hms, SearchOutcome, SearchStatus, Solution};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct OrderOutput {
    n: usize,
    total_solutions: usize,
    total_checked: u64,
    execution_time: String,
    status: String,
    solutions: Vec<Solution>,
}

#[derive(Debug, Serialize)]
struct SessionOutput {
    orders: Vec<OrderOutput>,
    total_execution_time: String,
}

/// Accumulates per-order outputs over one invocation.
#[derive(Debug)]
pub struct Session {
    data_dir: PathBuf,
    orders: Vec<OrderOutput>,
    finished: bool,
}

impl Session {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            orders: Vec::new(),
            finished: false,
        }
    }

    /// Write `<k>-output.json` for a finished order and remember it for the
    /// session file.
    pub fn record(&mut self, outcome: &SearchOutcome) -> Result<PathBuf> {
        self.push(OrderOutput {
            n: outcome.n,
            total_solutions: outcome.solutions.len(),
            total_checked: outcome.total_checked,
            execution_time: format_hms(outcome.wall_time),
            status: status_name(outcome.status).to_owned(),
            solutions: outcome.solutions.clone(),
        })
    }

    /// Record an aborted order. Solutions collected before the failure are
    /// written out, never dropped.
    pub fn record_failed(&mut self, n: usize, partial: &[Solution]) -> Result<PathBuf> {
        self.push(OrderOutput {
            n,
            total_solutions: partial.len(),
            total_checked: 0,
            execution_time: format_hms(Duration::ZERO),
            status: "failed".to_owned(),
            solutions: partial.to_vec(),
        })
    }

    fn push(&mut self, output: OrderOutput) -> Result<PathBuf> {
        let path = next_numbered(&self.data_dir, "", "-output.json")?;
        fs::write(&path, serde_json::to_string_pretty(&output)?)
            .with_context(|| format!("writing {}", path.display()))?;
        self.orders.push(output);
        Ok(path)
    }

    /// Write the session summary. Returns `None` when nothing was recorded;
    /// safe to call more than once (later calls are no-ops).
    pub fn finish(&mut self, total: Duration) -> Result<Option<PathBuf>> {
        if self.finished || self.orders.is_empty() {
            return Ok(None);
        }
        let path = next_numbered(&self.data_dir, "session_", "-output.json")?;
        let payload = SessionOutput {
            orders: std::mem::take(&mut self.orders),
            total_execution_time: format_hms(total),
        };
        fs::write(&path, serde_json::to_string_pretty(&payload)?)
            .with_context(|| format!("writing {}", path.display()))?;
        self.finished = true;
        Ok(Some(path))
    }
}

fn status_name(status: SearchStatus) -> &'static str {
    match status {
        SearchStatus::Completed => "completed",
        SearchStatus::FoundFirst => "found_first",
        SearchStatus::Cancelled => "cancelled",
    }
}

/// Next free path of the form `{prefix}{k}{suffix}` in `dir`, numbered one
/// past the highest existing `k`.
fn next_numbered(dir: &Path, prefix: &str, suffix: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let mut highest = 0u64;
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(stem) = name
            .strip_prefix(prefix)
            .and_then(|s| s.strip_suffix(suffix))
        else {
            continue;
        };
        if let Ok(k) = stem.parse::<u64>() {
            highest = highest.max(k);
        }
    }
    Ok(dir.join(format!("{prefix}{}{suffix}", highest + 1)))
}
