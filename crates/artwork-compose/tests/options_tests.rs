use artwork_compose::*;
use std::path::PathBuf;

#[test]
fn test_defaults_are_valid() {
    let options = AssemblyOptions::default();
    assert!(options.validate().is_ok());
    assert!(options.vector_embedding);
    assert_eq!(options.raster_dpi, 300);
    assert_eq!(options.max_placements, 400);
    assert!(options.draw_labels);
}

#[test]
fn test_validation_rejects_bad_values() {
    let options = AssemblyOptions {
        raster_dpi: 0,
        ..Default::default()
    };
    match options.validate() {
        Err(ComposeError::Config(msg)) => assert!(msg.contains("DPI")),
        other => panic!("Expected Config error, got {:?}", other),
    }

    let options = AssemblyOptions {
        max_placements: 401,
        ..Default::default()
    };
    assert!(options.validate().is_err());

    let options = AssemblyOptions {
        aspect_tolerance: 1.0,
        ..Default::default()
    };
    assert!(options.validate().is_err());

    let options = AssemblyOptions {
        rsvg_convert_path: PathBuf::new(),
        ..Default::default()
    };
    assert!(options.validate().is_err());
}

#[tokio::test]
async fn test_save_and_load_options() {
    use tempfile::NamedTempFile;

    let options = AssemblyOptions {
        vector_embedding: false,
        raster_dpi: 150,
        rsvg_convert_path: PathBuf::from("/opt/bin/rsvg-convert"),
        pdfium_library_dir: Some(PathBuf::from("/opt/pdfium/lib")),
        draw_labels: false,
        ..Default::default()
    };

    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    options.save(path).await.unwrap();
    let loaded = AssemblyOptions::load(path).await.unwrap();

    assert_eq!(loaded.vector_embedding, options.vector_embedding);
    assert_eq!(loaded.raster_dpi, options.raster_dpi);
    assert_eq!(loaded.max_placements, options.max_placements);
    assert_eq!(loaded.rsvg_convert_path, options.rsvg_convert_path);
    assert_eq!(loaded.pdfium_library_dir, options.pdfium_library_dir);
    assert_eq!(loaded.draw_labels, options.draw_labels);
}

#[tokio::test]
async fn test_partial_options_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");
    tokio::fs::write(&path, r#"{"raster_dpi": 600}"#).await.unwrap();

    let loaded = AssemblyOptions::load(&path).await.unwrap();
    assert_eq!(loaded.raster_dpi, 600);
    assert!(loaded.vector_embedding);
    assert_eq!(loaded.pdfium_library_dir, None);
}

#[tokio::test]
async fn test_load_rejects_invalid_file() {
    let dir = tempfile::tempdir().unwrap();

    let garbage = dir.path().join("garbage.json");
    tokio::fs::write(&garbage, "not json").await.unwrap();
    assert!(matches!(
        AssemblyOptions::load(&garbage).await,
        Err(ComposeError::Config(_))
    ));

    let invalid = dir.path().join("invalid.json");
    tokio::fs::write(&invalid, r#"{"raster_dpi": 0}"#).await.unwrap();
    assert!(matches!(
        AssemblyOptions::load(&invalid).await,
        Err(ComposeError::Config(_))
    ));
}
