//! Grid repetition of a placed element
//!
//! A single placement with an [`ImpositionSpec`] expands into
//! `rows * columns` placements laid out row-major from the top-left. The
//! whole grid must fit the template or nothing is produced.

use crate::constants::{FIT_EPSILON_MM, MAX_GRID_CELLS, MAX_SPACING_MM, MIN_GRID_CELLS};
use crate::types::{ComposeError, ImpositionSpec, PlacedElement, Template};
use crate::units::{element_size_mm, mm_from_px_x, mm_from_px_y, px_from_mm_x, px_from_mm_y};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImpositionError {
    #[error("rows must be between {min} and {max}, got {0}", min = MIN_GRID_CELLS, max = MAX_GRID_CELLS)]
    RowsOutOfRange(u32),
    #[error("columns must be between {min} and {max}, got {0}", min = MIN_GRID_CELLS, max = MAX_GRID_CELLS)]
    ColumnsOutOfRange(u32),
    #[error("spacing must be between 0 and {max}mm, got {h}mm x {v}mm", max = MAX_SPACING_MM)]
    SpacingOutOfRange { h: f32, v: f32 },
    #[error(
        "{rows}x{columns} grid needs {needed_width_mm:.1}x{needed_height_mm:.1}mm \
         but only {available_width_mm:.1}x{available_height_mm:.1}mm is available"
    )]
    Overflow {
        rows: u32,
        columns: u32,
        needed_width_mm: f32,
        needed_height_mm: f32,
        available_width_mm: f32,
        available_height_mm: f32,
    },
}

impl From<ImpositionError> for ComposeError {
    fn from(err: ImpositionError) -> Self {
        ComposeError::Config(format!("Imposition: {}", err))
    }
}

/// Check the grid's own ranges, independent of any element.
pub fn validate_spec(spec: &ImpositionSpec) -> Result<(), ImpositionError> {
    if !spec.rows_in_range() {
        return Err(ImpositionError::RowsOutOfRange(spec.rows));
    }
    if !spec.columns_in_range() {
        return Err(ImpositionError::ColumnsOutOfRange(spec.columns));
    }
    if !spec.spacing_in_range() {
        return Err(ImpositionError::SpacingOutOfRange {
            h: spec.h_spacing_mm,
            v: spec.v_spacing_mm,
        });
    }
    Ok(())
}

/// Expand `element` into a grid on `template`.
pub fn plan(
    element: &PlacedElement,
    template: &Template,
    spec: &ImpositionSpec,
) -> Result<Vec<PlacedElement>, ImpositionError> {
    validate_spec(spec)?;

    let (width_mm, height_mm) = element_size_mm(element, template);
    let total_width = spec.total_width_mm(width_mm);
    let total_height = spec.total_height_mm(height_mm);

    let (origin_x, origin_y) = if spec.center_on_template {
        (
            (template.width_mm - total_width) / 2.0,
            (template.height_mm - total_height) / 2.0,
        )
    } else {
        (
            mm_from_px_x(element.x, template),
            mm_from_px_y(element.y, template),
        )
    };

    // Centered grids only need to fit; anchored ones must not run off the edge
    let (available_width, available_height) = if spec.center_on_template {
        (template.width_mm, template.height_mm)
    } else {
        (template.width_mm - origin_x, template.height_mm - origin_y)
    };
    if total_width > available_width + FIT_EPSILON_MM
        || total_height > available_height + FIT_EPSILON_MM
    {
        return Err(ImpositionError::Overflow {
            rows: spec.rows,
            columns: spec.columns,
            needed_width_mm: total_width,
            needed_height_mm: total_height,
            available_width_mm: available_width,
            available_height_mm: available_height,
        });
    }

    let mut cells = Vec::with_capacity(spec.cell_count());
    for row in 0..spec.rows {
        for col in 0..spec.columns {
            let x_mm = origin_x + col as f32 * (width_mm + spec.h_spacing_mm);
            let y_mm = origin_y + row as f32 * (height_mm + spec.v_spacing_mm);

            let mut cell = element.clone();
            cell.id = format!("{}-r{}c{}", element.id, row, col);
            cell.x = px_from_mm_x(x_mm, template);
            cell.y = px_from_mm_y(y_mm, template);
            cell.imposition = None;
            cells.push(cell);
        }
    }

    log::debug!(
        "Imposed {} as {}x{} grid ({:.1}x{:.1}mm)",
        element.id,
        spec.rows,
        spec.columns,
        total_width,
        total_height
    );
    Ok(cells)
}

/// Expand every placement carrying an imposition spec, keeping order.
pub fn expand_all(
    placements: &[PlacedElement],
    template: &Template,
) -> Result<Vec<PlacedElement>, ImpositionError> {
    let mut expanded = Vec::with_capacity(placements.len());
    for element in placements {
        match &element.imposition {
            Some(spec) => expanded.extend(plan(element, template, spec)?),
            None => expanded.push(element.clone()),
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        Template {
            id: "sheet".to_string(),
            name: "Sheet".to_string(),
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
            ..ImpositionSpec::default()
        }
    }

    #[test]
    fn test_single_cell_keeps_position() {
        let element = PlacedElement::new("e", "logo", 10.0, 20.0, 100.0, 100.0);
        let cells = plan(&element, &template(), &spec(1, 1)).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].id, "e-r0c0");
        assert_eq!((cells[0].x, cells[0].y), (10.0, 20.0));
    }

    #[test]
    fn test_anchor_offset_counts_against_fit() {
        // 200mm wide element at x=100mm: 3 columns need 620mm, only 600mm left
        let element = PlacedElement::new("e", "logo", 200.0, 0.0, 400.0, 300.0);
        let err = plan(&element, &template(), &spec(1, 3)).unwrap_err();
        assert!(matches!(err, ImpositionError::Overflow { .. }));
    }

    #[test]
    fn test_centered_grid_ignores_anchor() {
        let element = PlacedElement::new("e", "logo", 1000.0, 600.0, 400.0, 300.0);
        let cells = plan(
            &element,
            &template(),
            &ImpositionSpec {
                center_on_template: true,
                ..spec(2, 3)
            },
        )
        .unwrap();
        // Grid is 620x320mm on 700x400mm: origin at (40, 40)mm = (80, 80)px
        assert_eq!((cells[0].x, cells[0].y), (80.0, 80.0));
        assert_eq!((cells[5].x, cells[5].y), (80.0 + 840.0, 80.0 + 320.0));
    }

    #[test]
    fn test_range_errors() {
        let element = PlacedElement::new("e", "logo", 0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            plan(&element, &template(), &spec(0, 1)).unwrap_err(),
            ImpositionError::RowsOutOfRange(0)
        );
        assert_eq!(
            plan(&element, &template(), &spec(1, 21)).unwrap_err(),
            ImpositionError::ColumnsOutOfRange(21)
        );
        let wide = ImpositionSpec {
            h_spacing_mm: 50.5,
            ..spec(1, 2)
        };
        assert!(matches!(
            plan(&element, &template(), &wide).unwrap_err(),
            ImpositionError::SpacingOutOfRange { .. }
        ));
    }

    #[test]
    fn test_error_converts_to_config() {
        let err: ComposeError = ImpositionError::RowsOutOfRange(0).into();
        assert!(matches!(err, ComposeError::Config(_)));
    }

    #[test]
    fn test_expand_all_preserves_order() {
        let mut gridded = PlacedElement::new("a", "logo", 0.0, 0.0, 100.0, 100.0);
        gridded.imposition = Some(spec(1, 2));
        let single = PlacedElement::new("b", "logo", 0.0, 400.0, 100.0, 100.0);

        let expanded = expand_all(&[gridded, single], &template()).unwrap();
        let ids: Vec<_> = expanded.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a-r0c0", "a-r0c1", "b"]);
        assert!(expanded.iter().all(|e| e.imposition.is_none()));
    }
}
