//! Integration tests for pothole-model crate

use pothole_model::{
    shared, validate_onnx_model, AppConfig, ModelConfig, ModelError, SegmentationModel,
};
use pothole_preprocess::ChannelOrder;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_app_config_file_round_trip() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("pothole.json");

    let mut config = AppConfig::default();
    config.model.model_path = PathBuf::from("/tmp/models/best.onnx");
    config.model.intra_threads = Some(2);
    config.pipeline.min_area_pixels = 1800;
    config.preprocess.channel_order = ChannelOrder::Rgb;

    config.to_json_file(&path)?;
    let loaded = AppConfig::from_json_file(&path)?;
    assert_eq!(loaded, config);
    Ok(())
}

#[test]
fn test_partial_config_file() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("partial.json");
    std::fs::write(
        &path,
        r#"{ "pipeline": { "conf_threshold": 0.25 }, "model": { "model_path": "m.onnx" } }"#,
    )?;

    let loaded = AppConfig::from_json_file(&path)?;
    assert_eq!(loaded.pipeline.conf_threshold, 0.25);
    assert_eq!(loaded.pipeline.iou_threshold, 0.5);
    assert_eq!(loaded.model.model_path, PathBuf::from("m.onnx"));
    assert_eq!(loaded.model.input_size, (640, 640));
    assert_eq!(loaded.preprocess.channel_order, ChannelOrder::Bgr);
    Ok(())
}

#[test]
fn test_missing_and_malformed_config() {
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("nope.json");
    assert!(matches!(
        AppConfig::from_json_file(&missing),
        Err(ModelError::Io { .. })
    ));

    let broken = temp_dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert!(matches!(
        AppConfig::from_json_file(&broken),
        Err(ModelError::Config(_))
    ));
}

#[test]
fn test_loading_missing_model_fails() {
    let config = ModelConfig {
        model_path: PathBuf::from("/definitely/not/here.onnx"),
        ..Default::default()
    };
    assert!(SegmentationModel::load(&config).is_err());
}

#[test]
fn test_validate_rejects_missing_and_corrupt_models() -> anyhow::Result<()> {
    let missing = ModelConfig {
        model_path: PathBuf::from("/definitely/not/here.onnx"),
        ..Default::default()
    };
    assert!(matches!(
        validate_onnx_model(&missing),
        Err(ModelError::Ort(_))
    ));

    let temp_dir = tempdir()?;
    let corrupt = temp_dir.path().join("corrupt.onnx");
    std::fs::write(&corrupt, b"not a protobuf")?;
    let config = ModelConfig {
        model_path: corrupt,
        ..Default::default()
    };
    assert!(matches!(
        validate_onnx_model(&config),
        Err(ModelError::Ort(_))
    ));
    Ok(())
}

#[test]
fn test_shared_handle_lifecycle_without_model() {
    assert!(matches!(shared::get(), Err(ModelError::NotInitialised)));

    let config = ModelConfig {
        model_path: PathBuf::from("/definitely/not/here.onnx"),
        ..Default::default()
    };
    assert!(shared::init(&config).is_err());
    assert!(shared::init_guarded(&config).is_err());
    assert!(!shared::is_initialised());
    assert!(!shared::shutdown());
}
