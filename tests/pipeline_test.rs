//! End-to-end pipeline tests
//!
//! Exercises the full load → transform → fit → predict → evaluate
//! sequence over synthetic EEG fixtures with both model families.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use ensayo::config::{
    AugmentParams, ExperimentConfig, ModelType, NeuralParams, PrecisionMode, TransformKind,
};
use ensayo::experiment::{ExperimentRunner, RunStatus};
use ensayo::{Error, Stage};

/// Write one recording: `n_channels` sine channels at `freq` Hz with a
/// deterministic per-recording phase offset.
fn write_recording(dir: &Path, name: &str, label: u32, n_channels: usize, freq: f32, phase: f32) {
    let rate = 128.0f32;
    let mut body = format!("label,{label},rate,128\n");
    for ch in 0..n_channels {
        let offset = phase + ch as f32 * 0.1;
        let line: Vec<String> = (0..512)
            .map(|i| {
                let t = i as f32 / rate;
                format!("{:.5}", (2.0 * std::f32::consts::PI * freq * t + offset).sin())
            })
            .collect();
        body.push_str(&line.join(","));
        body.push('\n');
    }
    std::fs::write(dir.join(name), body).unwrap();
}

/// Two-class fixture: class 0 is a 6 Hz rhythm, class 1 is 24 Hz.
fn two_class_fixture(dir: &Path, per_class: usize, n_channels: usize) {
    for i in 0..per_class {
        let phase = i as f32 * 0.37;
        write_recording(dir, &format!("a{i:02}.csv"), 0, n_channels, 6.0, phase);
        write_recording(dir, &format!("b{i:02}.csv"), 1, n_channels, 24.0, phase);
    }
}

fn base_config(model_type: ModelType) -> ExperimentConfig {
    let mut config = ExperimentConfig {
        model_type,
        precision_mode: PrecisionMode::Full,
        transform: TransformKind::Spectrogram,
        n_classes: 2,
        holdout: 0.25,
        seed: 7,
        neural: NeuralParams {
            hidden_size: 16,
            epochs: 10,
            batch_size: 8,
            learning_rate: 0.05,
            patience: None,
        },
        ..ExperimentConfig::default()
    };
    config.spectrogram.window = 64;
    config.spectrogram.hop = 32;
    config.boosting.n_estimators = 10;
    config.boosting.max_depth = 3;
    config.boosting.learning_rate = 0.3;
    config
}

#[test]
fn test_spectrogram_boosting_run_completes_with_accuracy() {
    let dir = tempfile::tempdir().unwrap();
    two_class_fixture(dir.path(), 16, 2);

    let mut runner = ExperimentRunner::new();
    let outcome = runner
        .run(dir.path(), &base_config(ModelType::GradientBoosting))
        .unwrap();

    assert!(!outcome.report.is_empty());
    assert!(outcome.report.get("accuracy").is_some());
    assert_eq!(outcome.run.status(), RunStatus::Success);

    // Per-epoch training loss lands in the tracking store
    let series = runner
        .store()
        .get_metrics_for_run(outcome.run.run_id(), "train_loss");
    assert!(!series.is_empty());
}

#[test]
fn test_model_switch_keeps_metric_name_set() {
    let dir = tempfile::tempdir().unwrap();
    two_class_fixture(dir.path(), 12, 2);

    let mut runner = ExperimentRunner::new();
    let boosting = runner
        .run(dir.path(), &base_config(ModelType::GradientBoosting))
        .unwrap();
    // Only the configuration changes between the two runs
    let neural = runner
        .run(dir.path(), &base_config(ModelType::NeuralNetwork))
        .unwrap();

    assert_eq!(boosting.report.names(), neural.report.names());
    assert_eq!(runner.store().run_count(), 2);
}

#[test]
fn test_stripe_dropout_run_completes() {
    let dir = tempfile::tempdir().unwrap();
    two_class_fixture(dir.path(), 12, 2);

    let augmented = ExperimentConfig {
        augment: AugmentParams {
            time_drop_rate: 0.3,
            freq_drop_rate: 0.2,
            stripes: 2,
        },
        ..base_config(ModelType::GradientBoosting)
    };

    let mut runner = ExperimentRunner::new();
    let outcome = runner.run(dir.path(), &augmented).unwrap();
    assert!(outcome.report.get("accuracy").is_some());
    assert_eq!(outcome.run.status(), RunStatus::Success);
}

#[test]
fn test_mixed_precision_request_does_not_abort_on_cpu() {
    let dir = tempfile::tempdir().unwrap();
    two_class_fixture(dir.path(), 8, 2);

    let config = ExperimentConfig {
        precision_mode: PrecisionMode::Mixed,
        ..base_config(ModelType::NeuralNetwork)
    };
    let mut runner = ExperimentRunner::new();
    let outcome = runner.run(dir.path(), &config).unwrap();
    assert!(outcome.report.get("accuracy").is_some());
}

#[test]
fn test_wrong_channel_count_fails_at_transform_stage() {
    let dir = tempfile::tempdir().unwrap();
    two_class_fixture(dir.path(), 4, 2);

    let config = ExperimentConfig {
        n_channels: Some(4),
        ..base_config(ModelType::GradientBoosting)
    };
    let mut runner = ExperimentRunner::new();
    let err = runner.run(dir.path(), &config).unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Transform));
    let run = runner.store().get_run("run-001").unwrap();
    assert_eq!(run.status(), RunStatus::Failed);
    assert_eq!(run.failed_stage(), Some("transform"));
}

#[test]
fn test_missing_input_fails_at_load_stage() {
    let mut runner = ExperimentRunner::new();
    let err = runner
        .run("/nonexistent/input", &base_config(ModelType::GradientBoosting))
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Load));
}

#[test]
fn test_corrupt_archive_fails_at_load_stage_never_zero_samples() {
    let dir = tempfile::tempdir().unwrap();
    let zip_path = dir.path().join("broken.zip");
    std::fs::write(&zip_path, b"definitely not a zip").unwrap();

    let mut runner = ExperimentRunner::new();
    let err = runner
        .run(&zip_path, &base_config(ModelType::GradientBoosting))
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Load));
}

#[test]
fn test_zip_archive_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging");
    std::fs::create_dir(&staging).unwrap();
    two_class_fixture(&staging, 10, 2);

    let zip_path = dir.path().join("eeg.zip");
    let mut writer = zip::ZipWriter::new(File::create(&zip_path).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    for entry in std::fs::read_dir(&staging).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        writer.start_file(name, options).unwrap();
        writer
            .write_all(&std::fs::read(&path).unwrap())
            .unwrap();
    }
    writer.finish().unwrap();

    let mut runner = ExperimentRunner::new();
    let outcome = runner
        .run(&zip_path, &base_config(ModelType::GradientBoosting))
        .unwrap();
    assert!(outcome.report.get("accuracy").is_some());
}

#[test]
fn test_invalid_config_is_rejected_before_any_stage() {
    let dir = tempfile::tempdir().unwrap();
    two_class_fixture(dir.path(), 4, 2);

    let config = ExperimentConfig {
        n_classes: 1,
        ..base_config(ModelType::GradientBoosting)
    };
    let mut runner = ExperimentRunner::new();
    let err = runner.run(dir.path(), &config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.stage(), None);
}
