//! Arithmetic over a list of numbers

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Sum,
    Avg,
    Min,
    Max,
}

impl std::str::FromStr for Operation {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Operation::Sum),
            "avg" | "average" | "mean" => Ok(Operation::Avg),
            "min" => Ok(Operation::Min),
            "max" => Ok(Operation::Max),
            other => Err(PulseError::InvalidInput(format!(
                "Unknown operation: {}",
                other
            ))),
        }
    }
}

/// Apply `op` to `numbers`. The sum of nothing is 0; the other operations
/// need at least one number.
pub fn calculate(op: Operation, numbers: &[f64]) -> Result<f64> {
    if numbers.is_empty() && op != Operation::Sum {
        return Err(PulseError::InvalidInput(format!(
            "{:?} needs at least one number",
            op
        )));
    }
    Ok(match op {
        Operation::Sum => numbers.iter().sum(),
        Operation::Avg => numbers.iter().sum::<f64>() / numbers.len() as f64,
        Operation::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        Operation::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}
