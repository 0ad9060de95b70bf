//! Utilities for working with probabilities.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};

use crate::error::InvalidScores;

pub trait SliceExt {
    fn sum(&self) -> f64;
    fn mean(&self) -> f64;
    fn stdev(&self) -> f64;
    fn normalise(&mut self, target: f64) -> f64;
    fn scale(&mut self, factor: f64);
    fn invert(&self) -> impl Iterator<Item = f64> + '_;
}
impl SliceExt for [f64] {
    fn sum(&self) -> f64 {
        self.iter().sum()
    }

    fn mean(&self) -> f64 {
        self.sum() / self.len() as f64
    }

    fn stdev(&self) -> f64 {
        let mean = self.mean();
        let variance = self
            .iter()
            .map(|element| (element - mean).powi(2))
            .sum::<f64>()
            / self.len() as f64;
        variance.sqrt()
    }

    fn normalise(&mut self, target: f64) -> f64 {
        let sum = self.sum();
        self.scale(target / sum);
        sum
    }

    fn scale(&mut self, factor: f64) {
        for element in self {
            *element *= factor;
        }
    }

    fn invert(&self) -> impl Iterator<Item = f64> + '_ {
        self.iter().map(|element| 1.0 / element)
    }
}

/// Converts a slice of nonnegative model scores into win probabilities by dividing each
/// score by the slice sum. A race in which every score is zero, or with a lone runner,
/// is assigned the uniform distribution rather than normalised.
pub fn normalise_scores(scores: &[f64]) -> Result<Vec<f64>, InvalidScores> {
    if scores.is_empty() {
        return Err(InvalidScores::NoScores);
    }
    for (runner, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(InvalidScores::NonFiniteScore { runner });
        }
        if score < 0.0 {
            return Err(InvalidScores::NegativeScore { runner, score });
        }
    }
    let sum = scores.sum();
    if sum == 0.0 || scores.len() == 1 {
        let uniform = 1.0 / scores.len() as f64;
        return Ok(vec![uniform; scores.len()]);
    }
    Ok(scores.iter().map(|score| score / sum).collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fraction {
    pub numerator: u64,
    pub denominator: u64,
}
impl Fraction {
    pub fn quotient(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl Display for Fraction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Fraction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (numerator, denominator) = s
            .split_once('/')
            .ok_or(anyhow!("'{s}' is not a fraction"))?;
        let numerator = numerator
            .trim()
            .parse()
            .context(format!("cannot parse numerator of '{s}'"))?;
        let denominator: u64 = denominator
            .trim()
            .parse()
            .context(format!("cannot parse denominator of '{s}'"))?;
        if denominator == 0 {
            bail!("zero denominator in '{s}'");
        }
        Ok(Fraction {
            numerator,
            denominator,
        })
    }
}
