//! Framingham-style general cardiovascular risk
//!
//! `risk = 1 - S0^exp(score - mean_score)` where `score` is linear in
//! ln(age), ln(BMI), ln(SBP) (treated or untreated coefficient), smoking and
//! diabetes.

use super::{require_finite, require_positive, to_percent, RiskError, Sex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FraminghamInputs {
    pub age: f64,
    pub sex: Sex,
    pub bmi: f64,
    pub systolic_bp: f64,
    pub bp_treated: bool,
    pub smoker: bool,
    pub diabetic: bool,
}

/// Sex-specific coefficient set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FraminghamCoefficients {
    pub ln_age: f64,
    pub ln_bmi: f64,
    pub ln_sbp_untreated: f64,
    pub ln_sbp_treated: f64,
    pub smoker: f64,
    pub diabetes: f64,
    pub baseline_survival: f64,
    pub mean_score: f64,
}

const FEMALE: FraminghamCoefficients = FraminghamCoefficients {
    ln_age: 2.32888,
    ln_bmi: 0.20081,
    ln_sbp_untreated: 2.76157,
    ln_sbp_treated: 2.82263,
    smoker: 0.52873,
    diabetes: 0.69154,
    baseline_survival: 0.95012,
    mean_score: 26.1931,
};

const MALE: FraminghamCoefficients = FraminghamCoefficients {
    ln_age: 3.11296,
    ln_bmi: 0.79277,
    ln_sbp_untreated: 1.85508,
    ln_sbp_treated: 1.92672,
    smoker: 0.70953,
    diabetes: 0.53160,
    baseline_survival: 0.88936,
    mean_score: 23.9802,
};

impl FraminghamCoefficients {
    pub fn for_sex(sex: Sex) -> &'static Self {
        match sex {
            Sex::Female => &FEMALE,
            Sex::Male => &MALE,
        }
    }
}

/// Risk percentage in [0, 100], two decimals
pub fn framingham_risk(inputs: &FraminghamInputs) -> Result<f64, RiskError> {
    let ln_age = require_positive("age", inputs.age)?.ln();
    let ln_bmi = require_positive("bmi", inputs.bmi)?.ln();
    let ln_sbp = require_positive("systolic_bp", inputs.systolic_bp)?.ln();

    let c = FraminghamCoefficients::for_sex(inputs.sex);
    let sbp_coefficient = if inputs.bp_treated {
        c.ln_sbp_treated
    } else {
        c.ln_sbp_untreated
    };
    let score = c.ln_age * ln_age
        + c.ln_bmi * ln_bmi
        + sbp_coefficient * ln_sbp
        + c.smoker * flag(inputs.smoker)
        + c.diabetes * flag(inputs.diabetic);

    let risk = 1.0 - c.baseline_survival.powf((score - c.mean_score).exp());
    Ok(to_percent(require_finite("framingham risk", risk)?))
}

pub(crate) fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
