//! Features, risk scores, model description and reasoning report working
//! together on synthetic recordings

mod helpers;

use ecgx_ai::features::FeatureExtractor;
use ecgx_ai::labels::Vocabulary;
use ecgx_ai::model::{ArchitectureConfig, ModelArchitectureBuilder, TensorShape};
use ecgx_ai::report::{Prediction, ReasoningReporter, SignalQuality, ThresholdFlag};
use ecgx_ai::risk::{ClinicalRiskFactors, RiskScorer, ASCVD_NAME, FRAMINGHAM_NAME, PLACEHOLDER_NAME};
use ecgx_ai::{CodeSet, Lead, Recording};
use helpers::synthetic_ecg;
use ndarray::Array2;

fn recording_with_dominant_leads() -> Recording {
    let mut samples = synthetic_ecg(5000, 12, 500, 11);
    samples.column_mut(Lead::V2.index()).mapv_inplace(|v| v * 3.0);
    samples.column_mut(Lead::V5.index()).mapv_inplace(|v| v * 2.0);
    Recording::new(samples, 500).unwrap()
}

#[test]
fn test_flat_recording_has_no_features() {
    let recording = Recording::new(Array2::zeros((5000, 12)), 500).unwrap();
    let results = FeatureExtractor::new(500).extract_all_leads(&recording);
    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|lead| lead.features.is_err()));
}

#[test]
fn test_features_for_every_lead() {
    let recording = Recording::new(synthetic_ecg(5000, 12, 500, 5), 500).unwrap();
    let results = FeatureExtractor::new(500).extract_all_leads(&recording);

    let leads: Vec<Lead> = results.iter().map(|r| r.lead).collect();
    assert_eq!(leads, Lead::ALL.to_vec());
    for lead in &results {
        let features = lead.features.as_ref().unwrap();
        assert!(features.std > 0.0);
        assert!(features.min < features.max);
        assert!(features.to_array().iter().all(|v| v.is_finite()));
        assert!(features.wavelet_entropy >= 0.0);
        assert!(features.sample_entropy > 0.0);
    }
}

#[test]
fn test_risk_profile_from_json_attributes() {
    let factors: ClinicalRiskFactors = serde_json::from_str(
        r#"{
            "age": 55,
            "sex": "female",
            "bmi": 27.0,
            "systolic_bp": 120,
            "total_cholesterol": 213,
            "hdl_cholesterol": 50
        }"#,
    )
    .unwrap();
    let profile = RiskScorer::new().profile(&factors).unwrap();

    let names: Vec<&str> = profile.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![ASCVD_NAME, FRAMINGHAM_NAME, PLACEHOLDER_NAME]);
    assert_eq!(profile.get(ASCVD_NAME), Some(2.06));
    assert_eq!(profile.get(PLACEHOLDER_NAME), Some(8.0));
    let framingham = profile.get(FRAMINGHAM_NAME).unwrap();
    assert!((0.0..=100.0).contains(&framingham));
}

#[test]
fn test_pooled_cohort_reference_values() {
    let base = ClinicalRiskFactors {
        age: 55.0,
        sex: ecgx_ai::risk::Sex::Male,
        race: ecgx_ai::risk::RaceGroup::AfricanAmerican,
        bmi: 27.0,
        systolic_bp: 120.0,
        bp_treated: false,
        total_cholesterol: 213.0,
        hdl_cholesterol: 50.0,
        smoker: false,
        diabetic: false,
    };
    let scorer = RiskScorer::new();
    assert_eq!(scorer.profile(&base).unwrap().get(ASCVD_NAME), Some(5.63));

    let diabetic = ClinicalRiskFactors {
        diabetic: true,
        ..base.clone()
    };
    assert_eq!(scorer.profile(&diabetic).unwrap().get(ASCVD_NAME), Some(10.46));

    let hypertensive = ClinicalRiskFactors {
        systolic_bp: 160.0,
        ..base
    };
    assert_eq!(scorer.profile(&hypertensive).unwrap().get(ASCVD_NAME), Some(9.29));
}

#[test]
fn test_invalid_risk_input_is_rejected() {
    let factors = ClinicalRiskFactors {
        age: 55.0,
        sex: ecgx_ai::risk::Sex::Female,
        race: Default::default(),
        bmi: 27.0,
        systolic_bp: 120.0,
        bp_treated: false,
        total_cholesterol: 213.0,
        hdl_cholesterol: 0.0,
        smoker: false,
        diabetic: false,
    };
    assert!(RiskScorer::new().profile(&factors).is_err());
}

#[test]
fn test_model_graph_for_one_second_input() {
    let graph = ModelArchitectureBuilder::new(ArchitectureConfig::default())
        .build([1000, 12], 2, 5)
        .unwrap();

    let inputs: Vec<&str> = graph.inputs().map(|s| s.name.as_str()).collect();
    assert_eq!(inputs, vec!["ecg_input", "clinical_input"]);
    assert_eq!(graph.output().name, "diagnosis");
    assert_eq!(graph.output_shape(), &TensorShape::new([5]));

    let params = graph.params();
    assert_eq!(params.total(), 105_525);
    assert_eq!(params.non_trainable, 512);

    let summary = graph.summary();
    assert!(summary.contains("ecg_multimodal"));
    assert!(summary.contains("Adam(lr=0.001)"));

    let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
    assert_eq!(json["name"], "ecg_multimodal");
}

#[test]
fn test_reasoning_report_end_to_end() {
    let recording = recording_with_dominant_leads();
    let codes: CodeSet = ["AFIB", "NORM", "STTC"].iter().map(|c| c.to_string()).collect();
    let vocabulary = Vocabulary::fit([&codes]);
    let prediction = Prediction::new(vec![0.91, 0.2, 0.6], &vocabulary).unwrap();

    let factors: ClinicalRiskFactors = serde_json::from_str(
        r#"{"age": 55, "sex": "male", "bmi": 27, "systolic_bp": 120,
            "total_cholesterol": 213, "hdl_cholesterol": 50, "smoker": true}"#,
    )
    .unwrap();
    let risks = RiskScorer::new().profile(&factors).unwrap();

    let report = ReasoningReporter::new()
        .report(&prediction, &vocabulary, &recording, risks)
        .unwrap();

    assert_eq!(report.diagnosis(), "AFIB");
    assert!((report.confidence() - 91.0).abs() < 1e-4);
    assert_eq!(report.flag(), ThresholdFlag::Above);
    assert_eq!(report.quality(), SignalQuality::Good);

    let top: Vec<Lead> = report.top_leads().iter().map(|c| c.lead).collect();
    assert_eq!(top.len(), 3);
    assert_eq!(top[0], Lead::V2);
    assert_eq!(top[1], Lead::V5);

    let text = report.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Diagnosis: AFIB");
    assert_eq!(lines[1], "Confidence: 91.0% (Above threshold)");
    assert!(lines[2].starts_with("Top Leads: V2 ("));
    assert!(lines[3].starts_with("Risks: ASCVD (%): "));
    assert!(lines[3].contains("QRISK3 placeholder (%): 10.0%"));
    assert_eq!(lines[4], "ECG Quality: Good");
}

#[test]
fn test_report_below_threshold() {
    let recording = recording_with_dominant_leads();
    let codes: CodeSet = ["MI", "NORM"].iter().map(|c| c.to_string()).collect();
    let vocabulary = Vocabulary::fit([&codes]);
    let prediction = Prediction::new(vec![0.3, 0.1], &vocabulary).unwrap();

    let report = ReasoningReporter::new()
        .report(&prediction, &vocabulary, &recording, Default::default())
        .unwrap();
    assert_eq!(report.diagnosis(), "No major condition detected");
    assert_eq!(report.flag(), ThresholdFlag::Below);
    assert!(report.to_string().contains("Risks: \n"));
}

#[test]
fn test_flat_recording_cannot_be_explained() {
    let recording = Recording::new(Array2::zeros((500, 12)), 500).unwrap();
    let codes: CodeSet = ["NORM"].iter().map(|c| c.to_string()).collect();
    let vocabulary = Vocabulary::fit([&codes]);
    let prediction = Prediction::new(vec![0.9], &vocabulary).unwrap();
    assert!(ReasoningReporter::new()
        .report(&prediction, &vocabulary, &recording, Default::default())
        .is_err());
}
