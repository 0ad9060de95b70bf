//! Validation errors raised while assessing races. Malformed input is reported
//! through typed errors rather than skewing the assessment.

use thiserror::Error;

use crate::sim::StakingMethod;

#[derive(Debug, Error)]
pub enum InvalidInput {
    #[error("{0}")]
    InvalidRace(#[from] InvalidRace),

    #[error("{0}")]
    InvalidScores(#[from] InvalidScores),

    #[error("{0}")]
    InvalidPrices(#[from] InvalidPrices),

    #[error("{0}")]
    MisalignedRace(#[from] MisalignedRace),
}

#[derive(Debug, Error)]
pub enum InvalidScores {
    #[error("no scores given")]
    NoScores,

    #[error("negative score {score} for runner {runner}")]
    NegativeScore { runner: usize, score: f64 },

    #[error("non-finite score for runner {runner}")]
    NonFiniteScore { runner: usize },
}

#[derive(Debug, Error)]
pub enum InvalidPrices {
    #[error("no prices given")]
    NoPrices,

    #[error("price {price} for runner {runner} is not above 1")]
    PriceNotAboveOne { runner: usize, price: f64 },

    #[error("non-positive overround {overround}")]
    NonPositiveOverround { overround: f64 },
}

#[derive(Debug, Error)]
#[error("{probs}:{prices} probabilities:prices mapped for race {race}")]
pub struct MisalignedRace {
    race: String,
    probs: usize,
    prices: usize,
}

pub struct RaceAlignmentAssertion;
impl RaceAlignmentAssertion {
    pub fn check(probs: &[f64], prices: &[f64], race: &str) -> Result<(), MisalignedRace> {
        if probs.len() != prices.len() {
            Err(MisalignedRace {
                race: race.into(),
                probs: probs.len(),
                prices: prices.len(),
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Error)]
pub enum InvalidRace {
    #[error("race {race} has no runners")]
    NoRunners { race: String },

    #[error("race {race} mixes settled and unsettled runners")]
    MixedOutcomes { race: String },

    #[error("race {race} has {winners} winners")]
    WinnerCount { race: String, winners: usize },
}

#[derive(Debug, Error)]
#[error("non-positive scale {scale} for {method} staking")]
pub struct InvalidStaking {
    pub method: StakingMethod,
    pub scale: f64,
}
