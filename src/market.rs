//! Fits a fair win market to the prices posted on a race, stripping out the
//! bookmaker's overround.

use crate::error::InvalidPrices;
use crate::probs::SliceExt;

#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    /// Overround-free implied win probabilities, summing to 1.
    pub probs: Vec<f64>,
    /// Decimal prices the market was fitted to.
    pub prices: Vec<f64>,
    /// The bookmaker's total margin; the sum of raw implied probabilities.
    pub overround: f64,
}
impl Market {
    /// Fits a market to the given decimal prices, assuming a multiplicative overround
    /// spread uniformly across runners. Every price must exceed 1, otherwise its raw
    /// implied probability would be a booksum of its own.
    pub fn fit(prices: Vec<f64>) -> Result<Market, InvalidPrices> {
        if prices.is_empty() {
            return Err(InvalidPrices::NoPrices);
        }
        for (runner, &price) in prices.iter().enumerate() {
            if !price.is_finite() || price <= 1.0 {
                return Err(InvalidPrices::PriceNotAboveOne { runner, price });
            }
        }
        let mut probs: Vec<_> = prices.invert().collect();
        let overround = probs.sum();
        if overround <= 0.0 {
            return Err(InvalidPrices::NonPositiveOverround { overround });
        }
        probs.scale(1.0 / overround);
        Ok(Market {
            probs,
            prices,
            overround,
        })
    }
}
