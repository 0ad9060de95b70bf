//! Testing helpers.

use assert_float_eq::*;

use crate::edge::{RaceAssessment, RunnerAssessment};

pub fn assert_slice_f64_near(expected: &[f64], actual: &[f64], distance: u32) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_f64_near!(expected, actual, distance);
        }
    }
}

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

/// A one-runner race staged for settlement tests.
pub fn bet(edge: f64, price: f64, winner: bool) -> RaceAssessment {
    let win_prob = 0.5;
    RaceAssessment {
        id: "R".into(),
        runners: vec![RunnerAssessment {
            name: "r".into(),
            price,
            winner: Some(winner),
            win_prob,
            market_prob: win_prob - edge,
            edge,
            expected_value: win_prob * (price - 1.0) - (1.0 - win_prob),
        }],
    }
}
