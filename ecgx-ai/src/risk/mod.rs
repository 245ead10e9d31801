//! Clinical risk scores
//!
//! Closed-form cardiovascular risk estimates, each returned as a percentage
//! clamped to [0, 100] and rounded to two decimals:
//! - Framingham-style general CVD risk (sex-specific coefficients)
//! - Pooled cohort equations (10-year ASCVD; sex × race coefficients)
//! - A fixed linear placeholder heuristic (not a clinical model)
//!
//! Inputs are validated before any clamping: non-finite values, and
//! non-positive values that would reach a logarithm, are rejected.

pub mod framingham;
pub mod placeholder;
pub mod pooled_cohort;

pub use framingham::{framingham_risk, FraminghamInputs};
pub use placeholder::{placeholder_risk, PlaceholderInputs};
pub use pooled_cohort::{pooled_cohort_risk, PooledCohortInputs};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const ASCVD_NAME: &str = "ASCVD (%)";
pub const FRAMINGHAM_NAME: &str = "Framingham (%)";
pub const PLACEHOLDER_NAME: &str = "QRISK3 placeholder (%)";

#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("Invalid {field}: {value}")]
    InvalidInput { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
}

/// Race grouping used by the pooled cohort equations
///
/// Groups other than African American use the white coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceGroup {
    #[default]
    White,
    AfricanAmerican,
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<f64, RiskError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RiskError::InvalidInput { field, value })
    }
}

/// Value must be finite and strictly positive (it reaches a logarithm)
pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<f64, RiskError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(RiskError::InvalidInput { field, value })
    }
}

/// Fraction → percent in [0, 100], two decimals
pub(crate) fn to_percent(fraction: f64) -> f64 {
    round2((fraction * 100.0).clamp(0.0, 100.0))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One named score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskEntry {
    pub name: String,
    pub percent: f64,
}

/// Insertion-ordered named scores
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RiskProfile {
    entries: Vec<RiskEntry>,
}

impl RiskProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append, or replace the value of an existing name in place
    pub fn insert(&mut self, name: impl Into<String>, percent: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.percent = percent,
            None => self.entries.push(RiskEntry { name, percent }),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.percent)
    }

    pub fn entries(&self) -> &[RiskEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the three scores need, as read from a patient record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRiskFactors {
    pub age: f64,
    pub sex: Sex,
    #[serde(default)]
    pub race: RaceGroup,
    pub bmi: f64,
    pub systolic_bp: f64,
    #[serde(default)]
    pub bp_treated: bool,
    pub total_cholesterol: f64,
    pub hdl_cholesterol: f64,
    #[serde(default)]
    pub smoker: bool,
    #[serde(default)]
    pub diabetic: bool,
}

impl ClinicalRiskFactors {
    pub fn framingham_inputs(&self) -> FraminghamInputs {
        FraminghamInputs {
            age: self.age,
            sex: self.sex,
            bmi: self.bmi,
            systolic_bp: self.systolic_bp,
            bp_treated: self.bp_treated,
            smoker: self.smoker,
            diabetic: self.diabetic,
        }
    }

    pub fn pooled_cohort_inputs(&self) -> PooledCohortInputs {
        PooledCohortInputs {
            age: self.age,
            sex: self.sex,
            race: self.race,
            total_cholesterol: self.total_cholesterol,
            hdl_cholesterol: self.hdl_cholesterol,
            systolic_bp: self.systolic_bp,
            bp_treated: self.bp_treated,
            smoker: self.smoker,
            diabetic: self.diabetic,
        }
    }

    pub fn placeholder_inputs(&self) -> PlaceholderInputs {
        PlaceholderInputs {
            age: self.age,
            smoker: self.smoker,
            diabetic: self.diabetic,
        }
    }
}

/// Runs every score in a fixed order: ASCVD, Framingham, placeholder
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn profile(&self, factors: &ClinicalRiskFactors) -> Result<RiskProfile, RiskError> {
        let mut profile = RiskProfile::new();
        profile.insert(ASCVD_NAME, pooled_cohort_risk(&factors.pooled_cohort_inputs())?);
        profile.insert(FRAMINGHAM_NAME, framingham_risk(&factors.framingham_inputs())?);
        profile.insert(PLACEHOLDER_NAME, placeholder_risk(&factors.placeholder_inputs())?);
        debug!(scores = profile.len(), "Computed risk profile");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors() -> ClinicalRiskFactors {
        ClinicalRiskFactors {
            age: 55.0,
            sex: Sex::Male,
            race: RaceGroup::White,
            bmi: 25.0,
            systolic_bp: 120.0,
            bp_treated: false,
            total_cholesterol: 213.0,
            hdl_cholesterol: 50.0,
            smoker: false,
            diabetic: false,
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(11.8832), 11.88);
        assert_eq!(round2(0.31944), 0.32);
        assert_eq!(to_percent(1.7), 100.0);
        assert_eq!(to_percent(-0.1), 0.0);
    }

    #[test]
    fn test_profile_order_and_names() {
        let profile = RiskScorer::new().profile(&factors()).unwrap();
        let names: Vec<&str> = profile.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![ASCVD_NAME, FRAMINGHAM_NAME, PLACEHOLDER_NAME]);
        assert_eq!(profile.get(ASCVD_NAME), Some(5.38));
        assert_eq!(profile.get(PLACEHOLDER_NAME), Some(8.0));
    }

    #[test]
    fn test_profile_rejects_invalid_cholesterol() {
        let mut input = factors();
        input.hdl_cholesterol = 0.0;
        assert_eq!(
            RiskScorer::new().profile(&input),
            Err(RiskError::InvalidInput {
                field: "hdl_cholesterol",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_profile_insert_replaces_in_place() {
        let mut profile = RiskProfile::new();
        profile.insert("a", 1.0);
        profile.insert("b", 2.0);
        profile.insert("a", 3.0);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile.entries()[0].percent, 3.0);
    }

    #[test]
    fn test_factors_from_json_defaults() {
        let json = r#"{"age": 60, "sex": "female", "bmi": 27.5, "systolic_bp": 135,
                       "total_cholesterol": 200, "hdl_cholesterol": 55}"#;
        let parsed: ClinicalRiskFactors = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.race, RaceGroup::White);
        assert!(!parsed.smoker && !parsed.bp_treated && !parsed.diabetic);
    }
}
