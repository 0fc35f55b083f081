//! Loss metrics: running-mean accumulators, PSNR, and per-epoch history.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Running mean of a scalar metric.
///
/// `result()` of an empty accumulator is 0.0. Reset at every epoch boundary.
#[derive(Debug, Clone, Default)]
pub struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one scalar observation.
    pub fn update(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// The arithmetic mean of all observations since the last reset.
    pub fn result(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Number of observations since the last reset.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Clear all observations.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Peak signal-to-noise ratio in dB for unit-range images.
pub fn psnr_db(mse: f64) -> f64 {
    if mse <= 0.0 {
        return f64::INFINITY;
    }
    10.0 * (1.0 / mse).log10()
}

/// One epoch's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochSummary {
    /// 1-based epoch index.
    pub epoch: usize,
    /// Mean training loss over the epoch.
    pub train_loss: f64,
    /// Mean test loss over the epoch.
    pub test_loss: f64,
    /// Learning rate at the end of the epoch.
    pub lr: f64,
    /// Wall-clock seconds spent in the epoch.
    pub wall_secs: f64,
}

/// Per-epoch history of training results.
#[derive(Debug, Clone, Default)]
pub struct MetricsHistory {
    entries: Vec<EpochSummary>,
}

impl MetricsHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one epoch's summary.
    pub fn push(&mut self, summary: EpochSummary) {
        self.entries.push(summary);
    }

    /// All recorded epochs, in order.
    pub fn entries(&self) -> &[EpochSummary] {
        &self.entries
    }

    /// The epoch with the lowest test loss, if any.
    pub fn best(&self) -> Option<&EpochSummary> {
        self.entries
            .iter()
            .min_by(|a, b| a.test_loss.total_cmp(&b.test_loss))
    }

    /// Write the history as pretty JSON.
    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.entries)?;
        Ok(())
    }
}
