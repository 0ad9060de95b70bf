//! Bootstraps the sampling distribution of the optimal threshold. Races, not bets, are
//! the unit of resampling: each resample redraws whole races with replacement from the
//! assessed table, rederives the optimal threshold and records it alongside its Sharpe
//! ratio. Percentile confidence intervals are read off the sorted distributions.

use std::fmt::{Display, Formatter};

use anyhow::bail;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tinyrand::{Rand, Seeded, StdRand};
use tracing::debug;

use crate::edge::RaceAssessment;
use crate::opt::{optimise, Optimisation, SweepConfig};
use crate::sim::SimConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub resamples: usize,
    pub seed: u64,
    pub confidence: f64,
}
impl BootstrapConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.resamples == 0 {
            bail!("at least one resample must be requested");
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            bail!("confidence level must lie strictly between 0 and 1");
        }
        Ok(())
    }
}
impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: 1000,
            seed: 42,
            confidence: 0.95,
        }
    }
}

/// Redraws a table of the same length by sampling whole races with replacement.
pub fn resample(races: &[RaceAssessment], rand: &mut impl Rand) -> Vec<RaceAssessment> {
    debug_assert!(!races.is_empty(), "nothing to resample");
    (0..races.len())
        .map(|_| races[(rand.next_u64() % races.len() as u64) as usize].clone())
        .collect()
}

// splitmix64 finaliser; seeds of adjacent resamples must not correlate
fn resample_seed(seed: u64, index: u64) -> u64 {
    let mut mixed = seed.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9e3779b97f4a7c15));
    mixed = (mixed ^ (mixed >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    mixed = (mixed ^ (mixed >> 27)).wrapping_mul(0x94d049bb133111eb);
    mixed ^ (mixed >> 31)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}
impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub requested: usize,
    pub completed: usize,
    /// Resamples whose sweep produced no viable threshold.
    pub non_viable: usize,
    /// Set when at least one resample was non-viable; the intervals then rest on fewer
    /// resamples than requested.
    pub partial: bool,
    /// Optimal thresholds of the completed resamples, sorted ascending.
    pub thresholds: Vec<f64>,
    /// Sharpe ratios of the completed resamples, sorted ascending.
    pub sharpes: Vec<f64>,
    pub threshold_ci: Interval,
    pub sharpe_ci: Interval,
}

/// Runs the bootstrap. Resamples are evaluated in parallel; the random stream of each is
/// seeded from the configured seed and the resample's index, so the outcome is
/// reproducible regardless of scheduling.
pub fn bootstrap(
    config: &BootstrapConfig,
    races: &[RaceAssessment],
    sweep_config: &SweepConfig,
    sim_config: &SimConfig,
) -> Result<Report, anyhow::Error> {
    config.validate()?;
    sweep_config.validate()?;
    sim_config.validate()?;
    if races.is_empty() {
        bail!("at least one race is needed to resample");
    }

    let optima = (0..config.resamples)
        .into_par_iter()
        .map(|index| {
            let mut rand = StdRand::seed(resample_seed(config.seed, index as u64));
            let resampled = resample(races, &mut rand);
            let optimisation = optimise(sweep_config, &resampled, sim_config)?;
            Ok(match optimisation {
                Optimisation::Optimal(optimum) => optimum
                    .performance
                    .sharpe
                    .value()
                    .map(|sharpe| (optimum.performance.threshold, sharpe)),
                Optimisation::NoViableThreshold { .. } => None,
            })
        })
        .collect::<Result<Vec<_>, anyhow::Error>>()?;

    let mut thresholds = Vec::with_capacity(optima.len());
    let mut sharpes = Vec::with_capacity(optima.len());
    for (threshold, sharpe) in optima.into_iter().flatten() {
        thresholds.push(threshold);
        sharpes.push(sharpe);
    }
    let completed = thresholds.len();
    let non_viable = config.resamples - completed;
    if completed == 0 {
        bail!(
            "none of the {} resamples produced a viable threshold",
            config.resamples
        );
    }
    debug!(
        "bootstrapped {completed} of {} resamples ({non_viable} non-viable)",
        config.resamples
    );

    thresholds.sort_by(|a, b| a.total_cmp(b));
    sharpes.sort_by(|a, b| a.total_cmp(b));
    let threshold_ci = percentile_interval(&thresholds, config.confidence);
    let sharpe_ci = percentile_interval(&sharpes, config.confidence);
    Ok(Report {
        requested: config.resamples,
        completed,
        non_viable,
        partial: non_viable > 0,
        thresholds,
        sharpes,
        threshold_ci,
        sharpe_ci,
    })
}

/// Percentile interval over a sorted sample: elements at ranks `floor(α/2 · n)` and
/// `ceil((1 - α/2) · n)`, clamped to the sample.
fn percentile_interval(sorted: &[f64], confidence: f64) -> Interval {
    let samples = sorted.len();
    let alpha = 1.0 - confidence;
    let lower_index = ((alpha / 2.0 * samples as f64).floor() as usize).min(samples - 1);
    let upper_index = (((1.0 - alpha / 2.0) * samples as f64).ceil() as usize)
        .min(samples - 1)
        .max(lower_index);
    Interval {
        lower: sorted[lower_index],
        upper: sorted[upper_index],
    }
}
