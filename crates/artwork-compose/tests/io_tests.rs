use artwork_compose::io::{save_document, save_reports, Job};
use artwork_compose::*;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

fn create_test_png() -> Vec<u8> {
    let image = RgbaImage::from_pixel(4, 4, Rgba([200, 30, 30, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

const JOB: &str = r##"{
    "project": {
        "name": "Club Hoodies",
        "quantity": 30,
        "template": "dtf-A4",
        "garment_color": "#FFFFFF"
    },
    "placements": [
        {"id": "front", "logo_ref": "crest", "x": 40, "y": 40, "width": 120, "height": 120},
        {"id": "sleeve", "logo_ref": "gone", "x": 300, "y": 40, "width": 40, "height": 40}
    ],
    "assets": [
        {"id": "crest", "path": "art/crest.png"},
        {"id": "gone", "path": "art/gone.svg"}
    ]
}"##;

#[tokio::test]
async fn test_load_job_resolves_template_and_assets() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(dir.path().join("art")).await.unwrap();
    tokio::fs::write(dir.path().join("art/crest.png"), create_test_png())
        .await
        .unwrap();
    let job_path = dir.path().join("job.json");
    tokio::fs::write(&job_path, JOB).await.unwrap();

    let job = Job::load(&job_path).await.unwrap();
    assert_eq!(job.project.template.id, "dtf-A4");
    assert_eq!(job.project.quantity, 30);
    assert_eq!(job.placements.len(), 2);

    // The missing file is skipped, not fatal
    assert_eq!(job.assets.len(), 1);
    let crest = &job.assets[0];
    assert_eq!(crest.mime_kind, MimeKind::RasterPng);
    assert_eq!(crest.original_color_space, SourceColorSpace::Rgb);
    assert_eq!(crest.filename, "crest.png");
}

#[tokio::test]
async fn test_job_through_to_saved_pdf() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(dir.path().join("art")).await.unwrap();
    tokio::fs::write(dir.path().join("art/crest.png"), create_test_png())
        .await
        .unwrap();
    let job_path = dir.path().join("job.json");
    tokio::fs::write(&job_path, JOB).await.unwrap();

    let job = Job::load(&job_path).await.unwrap();
    let tool = Arc::new(Unavailable::new("not installed"));
    let assembler = DocumentAssembler::new(
        Catalogs::builtin(),
        tool.clone(),
        tool,
        AssemblyOptions::default(),
    );
    let document = assembler
        .assemble_async(job.project, job.placements, job.assets)
        .await
        .unwrap();

    let fidelities: Vec<Fidelity> = document.reports.iter().map(|r| r.fidelity).collect();
    assert_eq!(fidelities, vec![Fidelity::HighResRaster, Fidelity::Placeholder]);

    let pdf_path = dir.path().join("out.pdf");
    save_document(&document, &pdf_path).await.unwrap();
    let saved = lopdf::Document::load(&pdf_path).unwrap();
    assert_eq!(saved.get_pages().len(), 2);

    let report_path = dir.path().join("report.json");
    save_reports(&document.reports, &report_path).await.unwrap();
    let json = tokio::fs::read_to_string(&report_path).await.unwrap();
    let reports: Vec<FidelityReport> = serde_json::from_str(&json).unwrap();
    assert_eq!(reports, document.reports);
}

#[tokio::test]
async fn test_unknown_template_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let job_path = dir.path().join("job.json");
    tokio::fs::write(
        &job_path,
        r##"{"project": {"name": "P", "template": "dtf-B9", "garment_color": "#000000"}}"##,
    )
    .await
    .unwrap();

    assert!(matches!(Job::load(&job_path).await, Err(ComposeError::Config(_))));
}

#[tokio::test]
async fn test_unsupported_asset_type_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let job_path = dir.path().join("job.json");
    tokio::fs::write(
        &job_path,
        r##"{
            "project": {"name": "P", "template": "dtf-A4", "garment_color": "#000000"},
            "assets": [{"id": "doc", "path": "notes.docx"}]
        }"##,
    )
    .await
    .unwrap();

    assert!(matches!(Job::load(&job_path).await, Err(ComposeError::Config(_))));
}
