//! Per-runner edge and expected value, assembled from model scores and market prices.

use crate::data::Race;
use crate::error::{InvalidInput, RaceAlignmentAssertion};
use crate::market::Market;
use crate::probs;

/// Surplus of the model's win probability over the market's overround-free one. A
/// positive edge marks a runner the model rates higher than the market does.
pub fn edge(win_prob: f64, market_prob: f64) -> f64 {
    win_prob - market_prob
}

/// Expected value of a unit stake at the given decimal price: a profit of `price - 1`
/// with probability `win_prob`, forfeiture of the stake otherwise.
pub fn expected_value(win_prob: f64, price: f64) -> f64 {
    win_prob * (price - 1.0) - (1.0 - win_prob)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerAssessment {
    pub name: String,
    pub price: f64,
    pub winner: Option<bool>,
    pub win_prob: f64,
    pub market_prob: f64,
    pub edge: f64,
    pub expected_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceAssessment {
    pub id: String,
    pub runners: Vec<RunnerAssessment>,
}

/// Assesses a single race: normalises the model scores into win probabilities, fits a
/// market to the prices and pairs the two off runner by runner.
pub fn assess(race: &Race) -> Result<RaceAssessment, InvalidInput> {
    race.validate()?;
    let scores: Vec<_> = race.runners.iter().map(|runner| runner.score).collect();
    let win_probs = probs::normalise_scores(&scores)?;
    let prices: Vec<_> = race.runners.iter().map(|runner| runner.price).collect();
    let market = Market::fit(prices)?;
    RaceAlignmentAssertion::check(&win_probs, &market.probs, &race.id)?;

    let runners = race
        .runners
        .iter()
        .enumerate()
        .map(|(index, runner)| {
            let win_prob = win_probs[index];
            let market_prob = market.probs[index];
            RunnerAssessment {
                name: runner.name.clone(),
                price: runner.price,
                winner: runner.winner,
                win_prob,
                market_prob,
                edge: edge(win_prob, market_prob),
                expected_value: expected_value(win_prob, runner.price),
            }
        })
        .collect();
    Ok(RaceAssessment {
        id: race.id.clone(),
        runners,
    })
}

pub fn assess_all(races: &[Race]) -> Result<Vec<RaceAssessment>, InvalidInput> {
    races.iter().map(assess).collect()
}
