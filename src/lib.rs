//! Evaluates the wagering edge a probability model holds over a racing market.
//! Settles the implied betting strategy over historical tables, sweeps the edge
//! threshold for the best risk-adjusted return, and bootstraps confidence intervals
//! around the chosen threshold.

pub mod boot;
pub mod csv;
pub mod data;
pub mod edge;
pub mod error;
pub mod market;
pub mod opt;
pub mod probs;
pub mod sim;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
