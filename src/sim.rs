//! Simulates the settlement of a betting strategy over an assessed table. Every runner
//! whose edge clears the threshold is backed, stakes are sized by the staking method
//! and returns are settled against the recorded results.

use std::fmt::{Display, Formatter};

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::edge::{RaceAssessment, RunnerAssessment};
use crate::error::InvalidStaking;
use crate::probs::SliceExt;

/// Factor applied to the per-bet Sharpe ratio. Unity reports the ratio as-is; callers
/// wanting an annualised figure supply their own factor through [SimConfig].
pub const DEFAULT_SHARPE_SCALE: f64 = 1.0;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StakingMethod {
    /// The same stake on every bet.
    Flat,
    /// Stake proportional to the edge.
    Edge,
    /// Stake proportional to the Kelly fraction.
    Kelly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staking {
    pub method: StakingMethod,
    pub scale: f64,
}
impl Staking {
    pub fn flat(scale: f64) -> Self {
        Self {
            method: StakingMethod::Flat,
            scale,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidStaking> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(InvalidStaking {
                method: self.method,
                scale: self.scale,
            });
        }
        Ok(())
    }

    /// Stake to place on the given runner. May be non-positive under the `edge` and
    /// `kelly` methods, in which case the runner is passed over rather than backed.
    pub fn stake(&self, runner: &RunnerAssessment) -> f64 {
        match self.method {
            StakingMethod::Flat => self.scale,
            StakingMethod::Edge => self.scale * runner.edge,
            StakingMethod::Kelly => self.scale * kelly_fraction(runner.win_prob, runner.price),
        }
    }
}

/// Kelly criterion for a win bet at the given decimal price: the bankroll fraction
/// maximising logarithmic growth. Negative when the bet is EV-negative.
pub fn kelly_fraction(win_prob: f64, price: f64) -> f64 {
    (win_prob * price - 1.0) / (price - 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub staking: Staking,
    pub sharpe_scale: f64,
}
impl SimConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.staking.validate()?;
        if !self.sharpe_scale.is_finite() || self.sharpe_scale <= 0.0 {
            bail!("sharpe scale must be positive");
        }
        Ok(())
    }
}
impl Default for SimConfig {
    fn default() -> Self {
        Self {
            staking: Staking::flat(1.0),
            sharpe_scale: DEFAULT_SHARPE_SCALE,
        }
    }
}

/// A statistic aggregated over the simulated bets. Aggregates over an empty or
/// degenerate set of bets are reported as [Stat::Undefined] rather than as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Stat {
    Value(f64),
    Undefined(UndefinedStat),
}
impl Stat {
    pub fn value(&self) -> Option<f64> {
        match self {
            Stat::Value(value) => Some(*value),
            Stat::Undefined(_) => None,
        }
    }
}
impl Display for Stat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stat::Value(value) => write!(f, "{value}"),
            Stat::Undefined(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UndefinedStat {
    NoBets,
    ZeroVariance,
}
impl Display for UndefinedStat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UndefinedStat::NoBets => write!(f, "undefined: no bets"),
            UndefinedStat::ZeroVariance => write!(f, "undefined: zero variance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub threshold: f64,
    pub bets: usize,
    pub total_staked: f64,
    pub total_return: f64,
    pub roi: Stat,
    pub mean: Stat,
    pub stdev: Stat,
    pub sharpe: Stat,
}

/// Settles the strategy over a table of assessed races: every runner with an edge of at
/// least `threshold` and a positive stake is backed, winners collecting
/// `stake * (price - 1)` and losers forfeiting the stake. Races must be settled; the
/// caller screens unsettled tables out beforehand.
pub fn simulate(races: &[RaceAssessment], threshold: f64, config: &SimConfig) -> Performance {
    debug_assert!(config.validate().is_ok(), "invalid config {config:?}");
    let mut returns = vec![];
    let mut total_staked = 0.0;
    for race in races {
        for runner in &race.runners {
            if runner.edge < threshold {
                continue;
            }
            let stake = config.staking.stake(runner);
            if stake <= 0.0 {
                continue;
            }
            debug_assert!(
                runner.winner.is_some(),
                "unsettled runner {} in race {}",
                runner.name,
                race.id
            );
            let bet_return = match runner.winner {
                Some(true) => stake * (runner.price - 1.0),
                _ => -stake,
            };
            total_staked += stake;
            returns.push(bet_return);
        }
    }

    let bets = returns.len();
    if bets == 0 {
        return Performance {
            threshold,
            bets,
            total_staked: 0.0,
            total_return: 0.0,
            roi: Stat::Undefined(UndefinedStat::NoBets),
            mean: Stat::Undefined(UndefinedStat::NoBets),
            stdev: Stat::Undefined(UndefinedStat::NoBets),
            sharpe: Stat::Undefined(UndefinedStat::NoBets),
        };
    }

    let total_return = returns.sum();
    let mean = returns.mean();
    let stdev = returns.stdev();
    let sharpe = if stdev > 0.0 {
        Stat::Value(mean / stdev * config.sharpe_scale)
    } else {
        Stat::Undefined(UndefinedStat::ZeroVariance)
    };
    Performance {
        threshold,
        bets,
        total_staked,
        total_return,
        roi: Stat::Value(total_return / total_staked),
        mean: Stat::Value(mean),
        stdev: Stat::Value(stdev),
        sharpe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::bet;
    use assert_float_eq::*;
    use std::str::FromStr;

    fn value(stat: Stat) -> f64 {
        stat.value().unwrap()
    }

    #[test]
    fn flat_settlement() {
        let races = vec![bet(0.05, 3.0, true), bet(0.05, 3.0, false)];
        let performance = simulate(&races, 0.0, &SimConfig::default());
        assert_eq!(2, performance.bets);
        assert_float_absolute_eq!(2.0, performance.total_staked, 0.000001);
        assert_float_absolute_eq!(1.0, performance.total_return, 0.000001);
        assert_float_absolute_eq!(0.5, value(performance.roi), 0.000001);
        assert_float_absolute_eq!(0.5, value(performance.mean), 0.000001);
        assert_float_absolute_eq!(1.5, value(performance.stdev), 0.000001);
        assert_float_absolute_eq!(1.0 / 3.0, value(performance.sharpe), 0.000001);
    }

    #[test]
    fn threshold_filters_bets() {
        let races = vec![
            bet(0.05, 2.0, true),
            bet(0.02, 2.0, true),
            bet(-0.01, 2.0, true),
        ];
        let performance = simulate(&races, 0.03, &SimConfig::default());
        assert_eq!(1, performance.bets);
        assert_float_absolute_eq!(1.0, performance.total_return, 0.000001);
    }

    #[test]
    fn threshold_unbounded_below_selects_all() {
        let races = vec![
            bet(0.05, 2.0, true),
            bet(0.02, 2.0, true),
            bet(-0.01, 2.0, true),
        ];
        let performance = simulate(&races, f64::NEG_INFINITY, &SimConfig::default());
        assert_eq!(3, performance.bets);
    }

    #[test]
    fn threshold_unbounded_above_selects_none() {
        let races = vec![bet(0.05, 2.0, true), bet(0.02, 2.0, true)];
        let performance = simulate(&races, f64::INFINITY, &SimConfig::default());
        assert_eq!(0, performance.bets);
        assert_float_absolute_eq!(0.0, performance.total_staked, 0.000001);
        assert_float_absolute_eq!(0.0, performance.total_return, 0.000001);
        assert_eq!(Stat::Undefined(UndefinedStat::NoBets), performance.roi);
        assert_eq!(Stat::Undefined(UndefinedStat::NoBets), performance.mean);
        assert_eq!(Stat::Undefined(UndefinedStat::NoBets), performance.stdev);
        assert_eq!(Stat::Undefined(UndefinedStat::NoBets), performance.sharpe);
    }

    #[test]
    fn lone_bet_has_no_sharpe() {
        let races = vec![bet(0.05, 3.0, true)];
        let performance = simulate(&races, 0.0, &SimConfig::default());
        assert_eq!(1, performance.bets);
        assert_float_absolute_eq!(2.0, value(performance.mean), 0.000001);
        assert_float_absolute_eq!(0.0, value(performance.stdev), 0.000001);
        assert_eq!(Stat::Undefined(UndefinedStat::ZeroVariance), performance.sharpe);
    }

    #[test]
    fn identical_returns_have_no_sharpe() {
        let races = vec![bet(0.05, 3.0, true), bet(0.05, 3.0, true)];
        let performance = simulate(&races, 0.0, &SimConfig::default());
        assert_eq!(2, performance.bets);
        assert_eq!(Stat::Undefined(UndefinedStat::ZeroVariance), performance.sharpe);
    }

    #[test]
    fn edge_staking_sizes_and_skips() {
        let races = vec![
            bet(0.10, 2.0, true),
            bet(0.05, 2.0, true),
            bet(0.0, 2.0, true),
        ];
        let config = SimConfig {
            staking: Staking {
                method: StakingMethod::Edge,
                scale: 10.0,
            },
            sharpe_scale: DEFAULT_SHARPE_SCALE,
        };
        let performance = simulate(&races, 0.0, &config);
        // the zero-edge runner qualifies but commands no stake
        assert_eq!(2, performance.bets);
        assert_float_absolute_eq!(1.5, performance.total_staked, 0.000001);
        assert_float_absolute_eq!(1.5, performance.total_return, 0.000001);
        assert_float_absolute_eq!(1.0, value(performance.roi), 0.000001);
    }

    #[test]
    fn kelly_staking_sizes_and_skips() {
        let favourable = RaceAssessment {
            id: "R1".into(),
            runners: vec![RunnerAssessment {
                name: "a".into(),
                price: 2.0,
                winner: Some(true),
                win_prob: 0.6,
                market_prob: 0.5,
                edge: 0.1,
                expected_value: 0.2,
            }],
        };
        let marginal = RaceAssessment {
            id: "R2".into(),
            runners: vec![RunnerAssessment {
                name: "b".into(),
                price: 2.0,
                winner: Some(false),
                win_prob: 0.5,
                market_prob: 0.45,
                edge: 0.05,
                expected_value: 0.0,
            }],
        };
        let config = SimConfig {
            staking: Staking {
                method: StakingMethod::Kelly,
                scale: 1.0,
            },
            sharpe_scale: DEFAULT_SHARPE_SCALE,
        };
        let performance = simulate(&[favourable, marginal], 0.0, &config);
        assert_eq!(1, performance.bets);
        assert_float_absolute_eq!(0.2, performance.total_staked, 0.000001);
        assert_float_absolute_eq!(0.2, performance.total_return, 0.000001);
    }

    #[test]
    fn kelly_fraction_of_price() {
        assert_float_absolute_eq!(0.2, kelly_fraction(0.6, 2.0), 0.000001);
        assert_float_absolute_eq!(0.0, kelly_fraction(0.5, 2.0), 0.000001);
        assert_float_absolute_eq!(0.0625, kelly_fraction(0.25, 5.0), 0.000001);
        assert_float_absolute_eq!(-0.2, kelly_fraction(0.2, 3.0), 0.000001);
    }

    #[test]
    fn sharpe_scale_is_applied() {
        let races = vec![bet(0.05, 3.0, true), bet(0.05, 3.0, false)];
        let config = SimConfig {
            staking: Staking::flat(1.0),
            sharpe_scale: 2.0,
        };
        let performance = simulate(&races, 0.0, &config);
        assert_float_absolute_eq!(2.0 / 3.0, value(performance.sharpe), 0.000001);
    }

    #[test]
    fn staking_method_from_str() {
        assert_eq!(StakingMethod::Flat, StakingMethod::from_str("flat").unwrap());
        assert_eq!(StakingMethod::Edge, StakingMethod::from_str("edge").unwrap());
        assert_eq!(
            StakingMethod::Kelly,
            StakingMethod::from_str("kelly").unwrap()
        );
        assert!(StakingMethod::from_str("martingale").is_err());
    }

    #[test]
    fn validate_staking() {
        Staking::flat(1.0).validate().unwrap();
        let err = Staking::flat(0.0).validate().unwrap_err();
        assert_eq!("non-positive scale 0 for flat staking", err.to_string());
    }

    #[test]
    fn validate_config() {
        SimConfig::default().validate().unwrap();
        let config = SimConfig {
            staking: Staking::flat(1.0),
            sharpe_scale: 0.0,
        };
        assert_eq!(
            "sharpe scale must be positive",
            config.validate().unwrap_err().to_string()
        );
    }

    #[test]
    fn stat_display() {
        assert_eq!("0.5", Stat::Value(0.5).to_string());
        assert_eq!(
            "undefined: no bets",
            Stat::Undefined(UndefinedStat::NoBets).to_string()
        );
        assert_eq!(
            "undefined: zero variance",
            Stat::Undefined(UndefinedStat::ZeroVariance).to_string()
        );
    }

    #[test]
    fn stat_value() {
        assert_eq!(Some(0.5), Stat::Value(0.5).value());
        assert_eq!(None, Stat::Undefined(UndefinedStat::NoBets).value());
    }
}
