use artwork_compose::color::*;
use artwork_compose::*;
use std::collections::BTreeMap;

#[test]
fn test_rgb_to_cmyk_reference_points() {
    assert_eq!(rgb_to_cmyk(Rgb::new(0, 0, 0)), Cmyk::new(0, 0, 0, 100));
    assert_eq!(rgb_to_cmyk(Rgb::new(255, 255, 255)), Cmyk::new(0, 0, 0, 0));
    // k = 0.498 * 0.8 in the midtone band, then under-color removal
    assert_eq!(rgb_to_cmyk(Rgb::new(128, 128, 128)), Cmyk::new(17, 17, 17, 40));
    assert_eq!(rgb_to_cmyk(Rgb::new(255, 0, 0)), Cmyk::new(0, 100, 100, 0));
}

#[test]
fn test_hex_input_forms() {
    assert_eq!(hex_to_cmyk("#000").unwrap(), Cmyk::new(0, 0, 0, 100));
    assert_eq!(hex_to_cmyk("ffffff").unwrap(), Cmyk::new(0, 0, 0, 0));
    assert!(matches!(hex_to_cmyk("#12345"), Err(ComposeError::Config(_))));
}

#[test]
fn test_ink_palette_beats_conversion() {
    let catalogs = Catalogs::builtin();
    let model = ColorModel::new(&catalogs);

    let navy = model.resolve_ink("#000080").unwrap();
    assert_eq!(navy.source_name.as_deref(), Some("Navy"));
    assert_eq!(navy.value, DeviceColor::Cmyk(Cmyk::new(100, 100, 0, 50)));

    let custom = model.resolve_ink("#808080").unwrap();
    assert_eq!(custom.display_name(), "Custom");
    assert_eq!(custom.value, DeviceColor::Cmyk(Cmyk::new(17, 17, 17, 40)));
}

#[test]
fn test_short_garment_hex_finds_palette_entry() {
    let catalogs = Catalogs::builtin();
    let model = ColorModel::new(&catalogs);
    let black = model.resolve_garment("#000").unwrap();
    assert_eq!(black.display_name(), "Black");
    assert_eq!(black.value, DeviceColor::Cmyk(Cmyk::new(0, 0, 0, 100)));
}

#[test]
fn test_garment_palette_groups() {
    let catalogs = Catalogs::builtin();
    assert!(catalogs.garment.group("Gildan").next().is_some());
    assert!(catalogs.ink.validate().is_ok());
    assert!(catalogs.garment.validate().is_ok());
}

#[test]
fn test_override_by_id_survives_reformatting() {
    let catalogs = Catalogs::builtin();
    let model = ColorModel::new(&catalogs);

    let mut asset = LogoAsset::new("a", "logo.svg", MimeKind::VectorSvg, Vec::new());
    asset.detected_colors = vec![DetectedColor::new("#FF0000"), DetectedColor::new("#00ff00")];

    let ids: Vec<String> = model
        .plan_for(&asset, &BTreeMap::new())
        .detected()
        .iter()
        .map(|entry| entry.id.to_string())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);

    // Overrides keyed by id, not by the on-disk spelling
    let mut overrides = BTreeMap::new();
    overrides.insert(ids[0].clone(), "#000080".to_string());
    let mut plan = model.plan_for(&asset, &overrides);
    assert!(plan.unmatched_overrides().is_empty());
    let (encoding, stand_in) = plan.text_replacements()[0].clone();
    assert_eq!(encoding, "#FF0000");
    assert_eq!(
        plan.resolve(SourceColor::Rgb(stand_in)),
        Some(DeviceColor::Cmyk(Cmyk::new(100, 100, 0, 50)))
    );

    // A differently spelled key is not an exact encoding match
    let mut overrides = BTreeMap::new();
    overrides.insert("#ff0000".to_string(), "#000080".to_string());
    let plan = model.plan_for(&asset, &overrides);
    assert_eq!(plan.unmatched_overrides(), &["#ff0000".to_string()]);
}

#[test]
fn test_raster_keeps_native_color() {
    let catalogs = Catalogs::builtin();
    let model = ColorModel::new(&catalogs);
    let asset = LogoAsset::new("a", "photo.png", MimeKind::RasterPng, Vec::new());
    let mut plan = model.plan_for(&asset, &BTreeMap::new());
    assert_eq!(plan.policy(), ColorPolicy::PreserveRaster);
    assert_eq!(plan.resolve(SourceColor::Rgb(Rgb::new(255, 0, 0))), None);
}
