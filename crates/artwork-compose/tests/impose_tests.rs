use artwork_compose::impose::{expand_all, plan};
use artwork_compose::*;
use std::sync::Arc;

/// 700x400mm at 2 px/mm
fn template() -> Template {
    Template {
        id: "wide".to_string(),
        name: "Wide".to_string(),
        width_mm: 700.0,
        height_mm: 400.0,
        pixel_width: 1400.0,
        pixel_height: 800.0,
        group: "dtf".to_string(),
    }
}

fn spec(rows: u32, columns: u32) -> ImpositionSpec {
    ImpositionSpec {
        rows,
        columns,
        h_spacing_mm: 10.0,
        v_spacing_mm: 10.0,
        center_on_template: false,
    }
}

/// 200x150mm at the origin
fn element() -> PlacedElement {
    PlacedElement::new("logo-1", "asset-1", 0.0, 0.0, 400.0, 300.0)
}

#[test]
fn test_two_by_three_grid() {
    let spec = spec(2, 3);
    assert_eq!(spec.total_width_mm(200.0), 620.0);
    assert_eq!(spec.total_height_mm(150.0), 320.0);

    let cells = plan(&element(), &template(), &spec).unwrap();
    assert_eq!(cells.len(), 6);

    let ids: Vec<&str> = cells.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "logo-1-r0c0",
            "logo-1-r0c1",
            "logo-1-r0c2",
            "logo-1-r1c0",
            "logo-1-r1c1",
            "logo-1-r1c2",
        ]
    );

    // Offsets of (200 + 10)mm across and (150 + 10)mm down
    let positions: Vec<(f32, f32)> = cells.iter().map(|c| (c.x, c.y)).collect();
    assert_eq!(
        positions,
        vec![
            (0.0, 0.0),
            (420.0, 0.0),
            (840.0, 0.0),
            (0.0, 320.0),
            (420.0, 320.0),
            (840.0, 320.0),
        ]
    );

    for cell in &cells {
        assert_eq!((cell.width, cell.height), (400.0, 300.0));
        assert_eq!(cell.logo_ref, "asset-1");
        assert!(cell.imposition.is_none());
    }
}

#[test]
fn test_five_by_five_overflows() {
    let err = plan(&element(), &template(), &spec(5, 5)).unwrap_err();
    match err {
        ImpositionError::Overflow {
            rows,
            columns,
            needed_width_mm,
            needed_height_mm,
            ..
        } => {
            assert_eq!((rows, columns), (5, 5));
            assert_eq!(needed_width_mm, 1040.0);
            assert_eq!(needed_height_mm, 790.0);
        }
        other => panic!("Expected overflow, got {:?}", other),
    }
}

#[test]
fn test_expand_keeps_placement_order() {
    let mut gridded = element();
    gridded.imposition = Some(spec(1, 2));
    let single = PlacedElement::new("logo-2", "asset-2", 0.0, 700.0, 10.0, 10.0);

    let expanded = expand_all(&[single.clone(), gridded], &template()).unwrap();
    let ids: Vec<&str> = expanded.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["logo-2", "logo-1-r0c0", "logo-1-r0c1"]);
    assert_eq!(expanded[0], single);
}

#[test]
fn test_assembler_rejects_overflowing_grid_without_output() {
    let tool = Arc::new(Unavailable::new("not installed"));
    let assembler = DocumentAssembler::new(
        Catalogs::builtin(),
        tool.clone(),
        tool,
        AssemblyOptions::default(),
    );
    let project = Project {
        name: "Grid".to_string(),
        quantity: 25,
        template: template(),
        garment_color: "#FFFFFF".to_string(),
        ink_color: None,
    };
    let mut gridded = element();
    gridded.imposition = Some(spec(5, 5));

    match assembler.assemble(&project, &[gridded], &[]) {
        Err(ComposeError::Config(msg)) => assert!(msg.contains("Imposition"), "{}", msg),
        other => panic!("Expected Config error, got {:?}", other.map(|d| d.reports)),
    }
}

#[test]
fn test_raw_input_clamps_low_and_rejects_high() {
    let spec = ImpositionSpec::from_raw_input(0, 99, -5.0, 8.0, true);
    assert_eq!(spec.rows, 1);
    assert_eq!(spec.columns, 99);
    assert_eq!(spec.h_spacing_mm, 0.0);
    assert!(spec.center_on_template);

    let err = plan(&element(), &template(), &spec).unwrap_err();
    assert_eq!(err, ImpositionError::ColumnsOutOfRange(99));
}
