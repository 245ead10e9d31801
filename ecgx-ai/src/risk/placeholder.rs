//! Placeholder heuristic standing in for a QRISK3-style score
//!
//! `5 + 0.2 × (age - 40) + 2 × smoker + 3 × diabetic`, clamped to [0, 100].
//! This is not a clinical model and must not be reported as one.

use super::{require_finite, round2, RiskError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceholderInputs {
    pub age: f64,
    pub smoker: bool,
    pub diabetic: bool,
}

const BASE_PERCENT: f64 = 5.0;
const PER_YEAR_OVER_40: f64 = 0.2;
const SMOKER_PERCENT: f64 = 2.0;
const DIABETIC_PERCENT: f64 = 3.0;

pub fn placeholder_risk(inputs: &PlaceholderInputs) -> Result<f64, RiskError> {
    let age = require_finite("age", inputs.age)?;
    let mut risk = BASE_PERCENT + PER_YEAR_OVER_40 * (age - 40.0);
    if inputs.smoker {
        risk += SMOKER_PERCENT;
    }
    if inputs.diabetic {
        risk += DIABETIC_PERCENT;
    }
    Ok(round2(risk.clamp(0.0, 100.0)))
}
