//! Dataset ingestion against on-disk WFDB fixtures

mod helpers;

use ecgx_ai::ingest::{DatasetError, DatasetLoader, IngestErrorKind};
use ecgx_ai::signal::Normalizer;
use helpers::{capture_logs, synthetic_ecg, DatasetFixture, MetadataFixture};
use ndarray::s;

#[test]
fn test_skipped_records_are_tallied_and_logged() {
    let mut fixture = DatasetFixture::new(500).unwrap();
    fixture
        .add_record("00001", &synthetic_ecg(1000, 12, 500, 1), "{'NORM': 100.0}")
        .unwrap();
    fixture
        .add_record("00002", &synthetic_ecg(1000, 12, 500, 2), "{'AFIB': 80.0, 'SR': 0.0}")
        .unwrap();
    fixture.add_missing_record("00003");
    fixture
        .add_unlisted_record("00004", &synthetic_ecg(1000, 12, 500, 4))
        .unwrap();
    fixture
        .add_record("00005", &synthetic_ecg(1000, 3, 500, 5), "{'NORM': 100.0}")
        .unwrap();
    fixture.add_row_without_filename("00006");
    fixture.finish().unwrap();

    let loader = DatasetLoader::new(fixture.loader_settings(2));
    let (result, logs) = capture_logs(|| loader.load());
    let dataset = result.unwrap();

    let report = dataset.report();
    assert_eq!(report.total, 6);
    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped_of(IngestErrorKind::MissingFile), 2);
    assert_eq!(report.skipped_of(IngestErrorKind::UnknownRecord), 1);
    assert_eq!(report.skipped_of(IngestErrorKind::InvalidShape), 1);
    assert_eq!(report.skipped_total(), 4);

    assert_eq!(logs.count_matching("Skipping record"), 4);
    logs.assert_contains("Skipping record 00004");
    let kinds: Vec<String> = logs
        .records()
        .iter()
        .filter(|r| r.message.starts_with("Skipping record"))
        .filter_map(|r| r.fields.get("kind").cloned())
        .collect();
    assert_eq!(kinds.len(), 4);
    assert!(kinds.iter().any(|k| k == "unknown_record"));
    assert!(kinds.iter().any(|k| k == "invalid_shape"));

    assert_eq!(dataset.vocabulary().codes(), &["AFIB", "NORM", "SR"]);
    assert_eq!(dataset.waveform_shape(), Some((1000, 12)));
}

#[test]
fn test_all_records_skipped_is_an_error() {
    let mut fixture = DatasetFixture::new(500).unwrap();
    fixture.add_missing_record("00001");
    fixture.add_row_without_filename("00002");
    fixture.finish().unwrap();

    let err = DatasetLoader::new(fixture.loader_settings(10))
        .load()
        .unwrap_err();
    assert!(matches!(err, DatasetError::Empty));
    assert_eq!(err.to_string(), "no valid ECG records found");
}

#[test]
fn test_short_record_is_zero_padded() {
    let mut fixture = DatasetFixture::new(500).unwrap();
    // 4 s at 500 Hz
    let signal = synthetic_ecg(2000, 12, 500, 7);
    fixture.add_record("00001", &signal, "{'NORM': 100.0}").unwrap();
    fixture.finish().unwrap();

    let loader = DatasetLoader::new(fixture.loader_settings(10));
    let recording = loader
        .ingestor()
        .unwrap()
        .ingest_filename(&fixture.record_name("00001"))
        .unwrap();
    assert_eq!(recording.len(), 2000);
    for (decoded, original) in recording.samples().iter().zip(signal.iter()) {
        assert!((decoded - original).abs() < 1e-3);
    }

    let fitted = Normalizer::for_duration(10, 500).unwrap().fit_length(recording.samples());
    assert_eq!(fitted.dim(), (5000, 12));
    assert!(fitted.slice(s![2000.., ..]).iter().all(|&v| v == 0.0));

    let dataset = loader.load().unwrap();
    assert_eq!(dataset.waveform_shape(), Some((5000, 12)));
}

#[test]
fn test_normalized_leads_have_unit_scale() {
    let mut fixture = DatasetFixture::new(100).unwrap();
    fixture
        .add_record("00001", &synthetic_ecg(1000, 12, 100, 3), "{'NORM': 100.0}")
        .unwrap();
    fixture.finish().unwrap();

    let dataset = DatasetLoader::new(fixture.loader_settings(10)).load().unwrap();
    let samples = dataset.records()[0].recording.samples();
    for column in samples.columns() {
        let n = column.len() as f64;
        let mean = column.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = column.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-4);
        assert!((var.sqrt() - 1.0).abs() < 1e-3);
    }
}

#[test]
fn test_unparseable_codes_yield_empty_label_set() {
    let mut fixture = DatasetFixture::new(500).unwrap();
    fixture
        .add_record("00001", &synthetic_ecg(500, 12, 500, 1), "{'MI': 100.0}")
        .unwrap();
    fixture
        .add_record("00002", &synthetic_ecg(500, 12, 500, 2), "not a dict")
        .unwrap();
    fixture.finish().unwrap();

    let dataset = DatasetLoader::new(fixture.loader_settings(1)).load().unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.report().skipped_total(), 0);

    let unlabelled = dataset
        .records()
        .iter()
        .position(|r| r.id == "00002")
        .unwrap();
    assert!(dataset.records()[unlabelled].codes.is_empty());
    assert!(dataset.labels().row(unlabelled).iter().all(|&v| v == 0.0));
    assert_eq!(dataset.vocabulary().codes(), &["MI"]);
}

#[test]
fn test_patient_attributes_from_metadata() {
    let mut fixture = DatasetFixture::new(500).unwrap();
    let name = fixture.record_name("00009");
    helpers::write_record(
        &fixture.path().join(&name),
        &synthetic_ecg(500, 12, 500, 9),
        500,
    )
    .unwrap();
    fixture.push_manifest_entry(name.clone());
    fixture.push_row(MetadataFixture {
        ecg_id: "00009".to_string(),
        age: String::new(),
        sex: "0".to_string(),
        scp_codes: "{'NORM': 100.0}".to_string(),
        filename: name,
    });
    fixture
        .add_record("00010", &synthetic_ecg(500, 12, 500, 10), "{'NORM': 100.0}")
        .unwrap();
    fixture.finish().unwrap();

    let dataset = DatasetLoader::new(fixture.loader_settings(1)).load().unwrap();
    let by_id = |id: &str| {
        dataset
            .records()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.attributes.as_vector())
            .unwrap()
    };
    // Missing age reads as 0, sex code 0 is male
    assert_eq!(by_id("00009"), [0.0, 0.0]);
    assert_eq!(by_id("00010"), [56.0, 1.0]);
}

#[test]
fn test_unsupported_sampling_rate() {
    let mut fixture = DatasetFixture::new(500).unwrap();
    fixture
        .add_record("00001", &synthetic_ecg(500, 12, 500, 1), "{'NORM': 100.0}")
        .unwrap();
    fixture.finish().unwrap();

    let mut settings = fixture.loader_settings(10);
    settings.sampling_rate = 250;
    let err = DatasetLoader::new(settings).load().unwrap_err();
    assert!(matches!(err, DatasetError::UnsupportedSamplingRate(250)));
}

#[test]
fn test_zero_duration_is_rejected() {
    let mut fixture = DatasetFixture::new(500).unwrap();
    fixture
        .add_record("00001", &synthetic_ecg(500, 12, 500, 1), "{'NORM': 100.0}")
        .unwrap();
    fixture.finish().unwrap();

    let err = DatasetLoader::new(fixture.loader_settings(0))
        .load()
        .unwrap_err();
    assert!(matches!(err, DatasetError::Inconsistent(_)));
}

#[test]
fn test_missing_metadata_file_is_io_error() {
    let fixture = DatasetFixture::new(500).unwrap();
    let err = DatasetLoader::new(fixture.loader_settings(10))
        .load()
        .unwrap_err();
    assert!(matches!(err, DatasetError::Io { .. }));
}
