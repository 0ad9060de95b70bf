//! Sweeps the edge threshold over a grid of candidates and selects the one that
//! maximises the Sharpe ratio of the simulated returns.

use std::time::{Duration, Instant};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edge::RaceAssessment;
use crate::sim::{simulate, Performance, SimConfig};

// absorbs accumulated rounding when the span is a whole multiple of the step
const GRID_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}
impl SweepConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.min.is_finite() || !self.max.is_finite() {
            bail!("threshold bounds must be finite");
        }
        if self.min > self.max {
            bail!("threshold lower bound cannot exceed the upper bound");
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            bail!("threshold step must be positive");
        }
        Ok(())
    }

    /// Number of candidate thresholds on the grid, bounds inclusive.
    pub fn steps(&self) -> u64 {
        ((self.max - self.min) / self.step + GRID_EPSILON) as u64 + 1
    }

    fn threshold(&self, ordinal: u64) -> f64 {
        self.min + ordinal as f64 * self.step
    }
}
impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.2,
            step: 0.005,
        }
    }
}

/// Simulates every threshold on the grid, returning one [Performance] per candidate in
/// grid order.
pub fn sweep(
    config: &SweepConfig,
    races: &[RaceAssessment],
    sim_config: &SimConfig,
) -> Result<Vec<Performance>, anyhow::Error> {
    config.validate()?;
    sim_config.validate()?;
    let steps = config.steps();
    let mut performances = Vec::with_capacity(steps as usize);
    for ordinal in 0..steps {
        performances.push(simulate(races, config.threshold(ordinal), sim_config));
    }
    Ok(performances)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Optimisation {
    Optimal(Optimum),
    /// No candidate threshold produced a defined Sharpe ratio.
    NoViableThreshold { steps: u64 },
}
impl Optimisation {
    pub fn optimum(&self) -> Option<&Optimum> {
        match self {
            Optimisation::Optimal(optimum) => Some(optimum),
            Optimisation::NoViableThreshold { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Optimum {
    pub performance: Performance,
    pub steps: u64,
    pub elapsed: Duration,
}

/// Selects the threshold on the grid with the highest Sharpe ratio. Candidates with an
/// undefined Sharpe ratio are not considered. A tie on the ratio goes to the candidate
/// with more bets; a tie on both keeps the lowest threshold.
pub fn optimise(
    config: &SweepConfig,
    races: &[RaceAssessment],
    sim_config: &SimConfig,
) -> Result<Optimisation, anyhow::Error> {
    config.validate()?;
    sim_config.validate()?;
    let start_time = Instant::now();
    let steps = config.steps();
    let mut best: Option<(f64, Performance)> = None;
    for ordinal in 0..steps {
        let candidate = simulate(races, config.threshold(ordinal), sim_config);
        let Some(sharpe) = candidate.sharpe.value() else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((best_sharpe, best_performance)) => {
                sharpe > *best_sharpe
                    || sharpe == *best_sharpe && candidate.bets > best_performance.bets
            }
        };
        if better {
            best = Some((sharpe, candidate));
        }
    }
    let elapsed = start_time.elapsed();
    debug!(
        "swept {steps} thresholds in {:.3}s",
        elapsed.as_millis() as f64 / 1_000.0
    );
    Ok(match best {
        Some((_, performance)) => Optimisation::Optimal(Optimum {
            performance,
            steps,
            elapsed,
        }),
        None => Optimisation::NoViableThreshold { steps },
    })
}
