//! Descriptive statistics over measurement values
//!
//! NaN entries are ignored rather than rejected, and empty inputs resolve to
//! neutral values (`0` or [`Mode::NoMode`]).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

const NO_MODE_LABEL: &str = "No mode";

/// Most frequent value of a sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Mode {
    /// Empty input, or every value occurs exactly once
    #[default]
    NoMode,
    Value(f64),
}

impl Mode {
    pub fn value(&self) -> Option<f64> {
        match self {
            Mode::NoMode => None,
            Mode::Value(v) => Some(*v),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::NoMode => f.write_str(NO_MODE_LABEL),
            Mode::Value(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Mode::NoMode => serializer.serialize_str(NO_MODE_LABEL),
            Mode::Value(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Value(f64),
            Label(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Value(v) => Ok(Mode::Value(v)),
            Repr::Label(label) if label == NO_MODE_LABEL => Ok(Mode::NoMode),
            Repr::Label(other) => {
                Err(serde::de::Error::custom(format!("invalid mode label: {other}")))
            }
        }
    }
}

fn numeric(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Arithmetic mean, 0 for empty input
pub fn mean(values: &[f64]) -> f64 {
    let (sum, count) = numeric(values).fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// Population standard deviation (divisor `n`, not `n - 1`), 0 for empty input
pub fn population_std_dev(values: &[f64]) -> f64 {
    let xs: Vec<f64> = numeric(values).collect();
    if xs.is_empty() {
        return 0.0;
    }

    let mu = mean(&xs);
    let variance = xs.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}

/// Most frequent value; ties go to the numerically smallest candidate
pub fn mode(values: &[f64]) -> Mode {
    // -0.0 and 0.0 are the same measurement
    let mut xs: Vec<f64> = numeric(values).map(|v| if v == 0.0 { 0.0 } else { v }).collect();
    if xs.is_empty() {
        return Mode::NoMode;
    }

    xs.sort_by(f64::total_cmp);

    let mut best: Option<(f64, usize)> = None;
    let mut run_start = 0;
    for i in 1..=xs.len() {
        let run_ended = i == xs.len() || xs[i].total_cmp(&xs[run_start]) != Ordering::Equal;
        if !run_ended {
            continue;
        }

        let run_len = i - run_start;
        // Ascending order: only a strictly longer run can displace the current best
        if best.map_or(true, |(_, len)| run_len > len) {
            best = Some((xs[run_start], run_len));
        }
        run_start = i;
    }

    match best {
        Some((value, len)) if len > 1 => Mode::Value(value),
        _ => Mode::NoMode,
    }
}
