//! Pooled cohort equations (10-year ASCVD risk)
//!
//! Coefficient sets are keyed by sex and race group. Terms a set does not use
//! are zero. Age is clamped to [40, 79] after validation.

use super::framingham::flag;
use super::{require_finite, require_positive, to_percent, RaceGroup, RiskError, Sex};

pub const MIN_AGE: f64 = 40.0;
pub const MAX_AGE: f64 = 79.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PooledCohortInputs {
    pub age: f64,
    pub sex: Sex,
    pub race: RaceGroup,
    pub total_cholesterol: f64,
    pub hdl_cholesterol: f64,
    pub systolic_bp: f64,
    pub bp_treated: bool,
    pub smoker: bool,
    pub diabetic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PooledCohortCoefficients {
    pub ln_age: f64,
    pub ln_age_squared: f64,
    pub ln_total: f64,
    pub ln_age_total: f64,
    pub ln_hdl: f64,
    pub ln_age_hdl: f64,
    pub ln_treated_sbp: f64,
    pub ln_age_treated_sbp: f64,
    pub ln_untreated_sbp: f64,
    pub ln_age_untreated_sbp: f64,
    pub smoker: f64,
    pub ln_age_smoker: f64,
    pub diabetes: f64,
    pub baseline_survival: f64,
    pub mean_score: f64,
}

const ZERO: PooledCohortCoefficients = PooledCohortCoefficients {
    ln_age: 0.0,
    ln_age_squared: 0.0,
    ln_total: 0.0,
    ln_age_total: 0.0,
    ln_hdl: 0.0,
    ln_age_hdl: 0.0,
    ln_treated_sbp: 0.0,
    ln_age_treated_sbp: 0.0,
    ln_untreated_sbp: 0.0,
    ln_age_untreated_sbp: 0.0,
    smoker: 0.0,
    ln_age_smoker: 0.0,
    diabetes: 0.0,
    baseline_survival: 1.0,
    mean_score: 0.0,
};

const FEMALE_WHITE: PooledCohortCoefficients = PooledCohortCoefficients {
    ln_age: -29.799,
    ln_age_squared: 4.884,
    ln_total: 13.540,
    ln_age_total: -3.114,
    ln_hdl: -13.578,
    ln_age_hdl: 3.149,
    ln_treated_sbp: 2.019,
    ln_untreated_sbp: 1.957,
    smoker: 7.574,
    ln_age_smoker: -1.665,
    diabetes: 0.661,
    baseline_survival: 0.9665,
    mean_score: -29.1817,
    ..ZERO
};

const FEMALE_AFRICAN_AMERICAN: PooledCohortCoefficients = PooledCohortCoefficients {
    ln_age: 17.1141,
    ln_total: 0.9396,
    ln_hdl: -18.9196,
    ln_age_hdl: 4.4748,
    ln_treated_sbp: 29.2907,
    ln_age_treated_sbp: -6.4321,
    ln_untreated_sbp: 27.8197,
    ln_age_untreated_sbp: -6.0873,
    smoker: 0.6908,
    diabetes: 0.8738,
    baseline_survival: 0.9533,
    mean_score: 86.6081,
    ..ZERO
};

const MALE_WHITE: PooledCohortCoefficients = PooledCohortCoefficients {
    ln_age: 12.344,
    ln_total: 11.853,
    ln_age_total: -2.664,
    ln_hdl: -7.990,
    ln_age_hdl: 1.769,
    ln_treated_sbp: 1.797,
    ln_untreated_sbp: 1.764,
    smoker: 7.837,
    ln_age_smoker: -1.795,
    diabetes: 0.658,
    baseline_survival: 0.9144,
    mean_score: 61.18,
    ..ZERO
};

const MALE_AFRICAN_AMERICAN: PooledCohortCoefficients = PooledCohortCoefficients {
    ln_age: 2.469,
    ln_total: 0.302,
    ln_hdl: -0.307,
    ln_treated_sbp: 1.916,
    ln_untreated_sbp: 1.809,
    smoker: 0.549,
    diabetes: 0.645,
    baseline_survival: 0.8954,
    mean_score: 19.6181,
    ..ZERO
};

impl PooledCohortCoefficients {
    pub fn lookup(sex: Sex, race: RaceGroup) -> &'static Self {
        match (sex, race) {
            (Sex::Female, RaceGroup::White) => &FEMALE_WHITE,
            (Sex::Female, RaceGroup::AfricanAmerican) => &FEMALE_AFRICAN_AMERICAN,
            (Sex::Male, RaceGroup::White) => &MALE_WHITE,
            (Sex::Male, RaceGroup::AfricanAmerican) => &MALE_AFRICAN_AMERICAN,
        }
    }
}

/// 10-year ASCVD risk percentage in [0, 100], two decimals
pub fn pooled_cohort_risk(inputs: &PooledCohortInputs) -> Result<f64, RiskError> {
    let age = require_positive("age", inputs.age)?.clamp(MIN_AGE, MAX_AGE);
    let ln_age = age.ln();
    let ln_total = require_positive("total_cholesterol", inputs.total_cholesterol)?.ln();
    let ln_hdl = require_positive("hdl_cholesterol", inputs.hdl_cholesterol)?.ln();
    let ln_sbp = require_positive("systolic_bp", inputs.systolic_bp)?.ln();

    let b = PooledCohortCoefficients::lookup(inputs.sex, inputs.race);
    let (sbp, age_sbp) = if inputs.bp_treated {
        (b.ln_treated_sbp, b.ln_age_treated_sbp)
    } else {
        (b.ln_untreated_sbp, b.ln_age_untreated_sbp)
    };
    let smoker = flag(inputs.smoker);

    let x_beta = b.ln_age * ln_age
        + b.ln_age_squared * ln_age * ln_age
        + b.ln_total * ln_total
        + b.ln_age_total * ln_age * ln_total
        + b.ln_hdl * ln_hdl
        + b.ln_age_hdl * ln_age * ln_hdl
        + sbp * ln_sbp
        + age_sbp * ln_age * ln_sbp
        + b.smoker * smoker
        + b.ln_age_smoker * ln_age * smoker
        + b.diabetes * flag(inputs.diabetic);

    let risk = 1.0 - b.baseline_survival.powf((x_beta - b.mean_score).exp());
    Ok(to_percent(require_finite("ascvd risk", risk)?))
}
